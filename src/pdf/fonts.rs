//! Base-14 PDF fonts and their advance widths.
//!
//! Only the fonts the layouts can name are listed. Widths are the standard
//! AFM values in 1/1000 em for printable ASCII and the WinAnsi punctuation
//! block at 0x80..=0x9F; Latin-1 letters fall back to an average width.

use serde::{Deserialize, Serialize};

/// Widths for code points 32..=126 in Helvetica.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

/// Widths for code points 32..=126 in Helvetica-Bold.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a..m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n..z
    389, 280, 389, 584, // {..~
];

/// Widths for WinAnsi bytes 0x80..=0x9F in Helvetica. Unassigned slots
/// are never emitted by `encode_win_ansi`.
const HELVETICA_WIN_ANSI_HIGH: [u16; 32] = [
    556, 556, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 556, 611, 556, // 0x80..0x8F
    556, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 556, 500, 667, // 0x90..0x9F
];

/// Widths for WinAnsi bytes 0x80..=0x9F in Helvetica-Bold.
const HELVETICA_BOLD_WIN_ANSI_HIGH: [u16; 32] = [
    556, 556, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 556, 611, 556, // 0x80..0x8F
    556, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 556, 500, 667, // 0x90..0x9F
];

const COURIER_WIDTH: u16 = 600;
const LATIN1_FALLBACK_WIDTH: u16 = 556;

/// A standard Type1 font every PDF reader ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFont {
    #[serde(rename = "Helvetica")]
    Helvetica,
    #[serde(rename = "Helvetica-Bold")]
    HelveticaBold,
    #[serde(rename = "Courier")]
    Courier,
}

impl StandardFont {
    /// The `BaseFont` name written into the font dictionary.
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::Courier => "Courier",
        }
    }

    /// Resource name used inside page content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "F1",
            Self::HelveticaBold => "F2",
            Self::Courier => "F3",
        }
    }

    /// Advance width of one encoded byte, in 1/1000 em.
    pub fn glyph_width(&self, byte: u8) -> u16 {
        if let Self::Courier = self {
            return COURIER_WIDTH;
        }
        let (ascii, high) = match self {
            Self::HelveticaBold => (&HELVETICA_BOLD_WIDTHS, &HELVETICA_BOLD_WIN_ANSI_HIGH),
            _ => (&HELVETICA_WIDTHS, &HELVETICA_WIN_ANSI_HIGH),
        };
        match byte {
            32..=126 => ascii[(byte - 32) as usize],
            0x80..=0x9F => high[(byte - 0x80) as usize],
            _ => LATIN1_FALLBACK_WIDTH,
        }
    }

    /// Width of `text` set at `size` points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|byte| self.glyph_width(byte) as u32)
            .sum();
        units as f32 * size / 1000.0
    }
}

/// Encode text for a `WinAnsiEncoding` font.
///
/// Latin-1 maps straight through and the typographic punctuation WinAnsi
/// keeps at 0x80..=0x9F is remapped. Control characters become spaces;
/// anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            0..=31 | 127..=159 => b' ',
            code @ 32..=126 => code as u8,
            code @ 160..=255 => code as u8,
            _ => win_ansi_high(ch).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi_high(ch: char) -> Option<u8> {
    let byte = match ch {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}
