//! Layout specifications: where things go on the page.
//!
//! A layout is plain data. The built-in profiles cover the designs in use;
//! anything else can be supplied as a JSON file with the same shape.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::fonts::StandardFont;

/// US Letter in points.
pub const LETTER_WIDTH: f32 = 612.0;
pub const LETTER_HEIGHT: f32 = 792.0;

const DEFAULT_LEADING_FACTOR: f32 = 1.2;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to read layout file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse layout file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown layout profile '{0}' (expected 'classic' or 'flyer')")]
    UnknownProfile(String),
    #[error("invalid layout '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// Horizontal placement of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    /// Centered on the page width; the anchor's `x` is ignored.
    Center,
}

/// Square box the QR raster is scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrBox {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Baseline position and styling of one text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnchor {
    pub x: f32,
    pub y: f32,
    pub font: StandardFont,
    pub size: f32,
    /// Wrap lines wider than this many points.
    #[serde(default)]
    pub max_width: Option<f32>,
    /// Printed before the value, e.g. `"Code: "`.
    #[serde(default)]
    pub label: String,
    /// Distance between wrapped baselines; defaults to 1.2 × size.
    #[serde(default)]
    pub leading: Option<f32>,
    #[serde(default)]
    pub alignment: Alignment,
}

impl TextAnchor {
    pub fn line_height(&self) -> f32 {
        self.leading.unwrap_or(self.size * DEFAULT_LEADING_FACTOR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub name: String,
    pub page_width: f32,
    pub page_height: f32,
    pub qr: QrBox,
    pub code: TextAnchor,
    pub property_name: TextAnchor,
    /// Background document the page is drawn over.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
}

impl LayoutSpec {
    /// Labelled lines over a 200pt QR code on US Letter.
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            page_width: LETTER_WIDTH,
            page_height: LETTER_HEIGHT,
            qr: QrBox {
                x: 100.0,
                y: LETTER_HEIGHT - 350.0,
                size: 200.0,
            },
            code: TextAnchor {
                x: 100.0,
                y: LETTER_HEIGHT - 120.0,
                font: StandardFont::HelveticaBold,
                size: 16.0,
                max_width: None,
                label: "Code: ".to_string(),
                leading: None,
                alignment: Alignment::Left,
            },
            property_name: TextAnchor {
                x: 100.0,
                y: LETTER_HEIGHT - 100.0,
                font: StandardFont::HelveticaBold,
                size: 16.0,
                max_width: None,
                label: "Property: ".to_string(),
                leading: None,
                alignment: Alignment::Left,
            },
            template_path: None,
        }
    }

    /// Flyer artwork: a centered headline, wrapped code and a large QR code.
    pub fn flyer() -> Self {
        Self {
            name: "flyer".to_string(),
            page_width: LETTER_WIDTH,
            page_height: LETTER_HEIGHT,
            qr: QrBox {
                x: 156.0,
                y: 220.0,
                size: 300.0,
            },
            code: TextAnchor {
                x: 156.0,
                y: 600.0,
                font: StandardFont::Helvetica,
                size: 14.0,
                max_width: Some(300.0),
                label: String::new(),
                leading: Some(18.0),
                alignment: Alignment::Left,
            },
            property_name: TextAnchor {
                x: 0.0,
                y: 640.0,
                font: StandardFont::HelveticaBold,
                size: 28.0,
                max_width: None,
                label: String::new(),
                leading: None,
                alignment: Alignment::Center,
            },
            template_path: None,
        }
    }

    pub fn from_profile(profile: &str) -> Result<Self, LayoutError> {
        match profile.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::classic()),
            "flyer" => Ok(Self::flyer()),
            other => Err(LayoutError::UnknownProfile(other.to_string())),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, LayoutError> {
        let raw = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout: Self = serde_json::from_str(&raw).map_err(|source| LayoutError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let invalid = |reason: String| LayoutError::Invalid {
            name: self.name.clone(),
            reason,
        };

        if !(self.page_width > 0.0 && self.page_height > 0.0) {
            return Err(invalid(format!(
                "page size {}x{} must be positive",
                self.page_width, self.page_height
            )));
        }
        if !(self.qr.size > 0.0) {
            return Err(invalid(format!("QR size {} must be positive", self.qr.size)));
        }
        for (field, anchor) in [("code", &self.code), ("property_name", &self.property_name)] {
            if !(anchor.size > 0.0) {
                return Err(invalid(format!("{field} font size must be positive")));
            }
            if let Some(max_width) = anchor.max_width {
                if !(max_width > 0.0) {
                    return Err(invalid(format!("{field} max_width must be positive")));
                }
            }
            if let Some(leading) = anchor.leading {
                if !(leading > 0.0) {
                    return Err(invalid(format!("{field} leading must be positive")));
                }
            }
        }
        Ok(())
    }
}

/// Break `text` into lines no wider than `max_width`.
///
/// Words are packed greedily; a line whose width equals the limit still
/// fits. A single word wider than the limit gets a line of its own. Without
/// a limit the text comes back as one line.
pub fn wrap_text(text: &str, font: StandardFont, size: f32, max_width: Option<f32>) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let Some(max_width) = max_width else {
        return vec![words.join(" ")];
    };

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in words {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{current} {word}");
        if font.text_width(&candidate, size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
