//! Page composition: turns a record, a QR raster and a layout into draw
//! operations. No I/O happens here.

use crate::property::model::PropertyRecord;

use super::fonts::StandardFont;
use super::layout::{wrap_text, Alignment, LayoutSpec, TextAnchor};
use super::qr::QrRaster;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Draw the page's QR raster stretched over the given box.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// One line of text with its baseline starting at (x, y).
    Text {
        x: f32,
        y: f32,
        font: StandardFont,
        size: f32,
        text: String,
    },
}

/// Everything needed to serialize one page.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
    pub qr: QrRaster,
}

impl RenderedPage {
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Image { .. } => None,
        })
    }

    /// Fonts referenced by text operations, in first-use order.
    pub fn fonts(&self) -> Vec<StandardFont> {
        let mut fonts = Vec::new();
        for op in &self.ops {
            if let DrawOp::Text { font, .. } = op {
                if !fonts.contains(font) {
                    fonts.push(*font);
                }
            }
        }
        fonts
    }
}

pub fn compose(record: &PropertyRecord, qr: QrRaster, layout: &LayoutSpec) -> RenderedPage {
    let mut ops = vec![DrawOp::Image {
        x: layout.qr.x,
        y: layout.qr.y,
        width: layout.qr.size,
        height: layout.qr.size,
    }];

    place_text(&mut ops, &record.code, &layout.code, layout.page_width);
    place_text(&mut ops, &record.name, &layout.property_name, layout.page_width);

    RenderedPage {
        width: layout.page_width,
        height: layout.page_height,
        ops,
        qr,
    }
}

fn place_text(ops: &mut Vec<DrawOp>, value: &str, anchor: &TextAnchor, page_width: f32) {
    if value.trim().is_empty() {
        return;
    }

    let text = format!("{}{}", anchor.label, value);
    let lines = wrap_text(&text, anchor.font, anchor.size, anchor.max_width);

    for (index, line) in lines.into_iter().enumerate() {
        let x = match anchor.alignment {
            Alignment::Left => anchor.x,
            Alignment::Center => (page_width - anchor.font.text_width(&line, anchor.size)) / 2.0,
        };
        ops.push(DrawOp::Text {
            x,
            y: anchor.y - index as f32 * anchor.line_height(),
            font: anchor.font,
            size: anchor.size,
            text: line,
        });
    }
}
