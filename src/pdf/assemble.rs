//! PDF assembly.
//!
//! A composed page is either written as a fresh one-page document or laid
//! over the single page of a background template. The template is shared
//! between requests and only ever cloned, never modified in place.

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::compose::{DrawOp, RenderedPage};
use super::fonts::encode_win_ansi;
use super::qr::QrRaster;

const PRODUCER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
/// Resource names added to a template page start with this.
const OVERLAY_PREFIX: &str = "Ov";
/// Page sizes closer than this are the same size.
const SIZE_TOLERANCE: f32 = 0.5;
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("template {location} could not be loaded: {reason}")]
    TemplateMissing { location: String, reason: String },
    #[error(
        "template page is {found_width}x{found_height}pt but the layout page is {expected_width}x{expected_height}pt"
    )]
    TemplateMismatch {
        expected_width: f32,
        expected_height: f32,
        found_width: f32,
        found_height: f32,
    },
    #[error("failed to merge overlay onto template: {0}")]
    Merge(String),
    #[error("failed to serialize PDF: {0}")]
    Serialize(String),
}

/// A parsed single-page background document.
#[derive(Clone)]
pub struct BaseDocument {
    document: Document,
    page_id: ObjectId,
    /// Lower-left corner of the MediaBox in default user space.
    origin: (f32, f32),
    width: f32,
    height: f32,
    location: String,
}

impl BaseDocument {
    pub fn load(path: &Path) -> Result<Self, AssembleError> {
        let location = path.display().to_string();
        let document = Document::load(path).map_err(|e| AssembleError::TemplateMissing {
            location: location.clone(),
            reason: e.to_string(),
        })?;
        Self::from_document(document, location)
    }

    pub fn from_bytes(bytes: &[u8], location: &str) -> Result<Self, AssembleError> {
        let document = Document::load_mem(bytes).map_err(|e| AssembleError::TemplateMissing {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_document(document, location.to_string())
    }

    fn from_document(document: Document, location: String) -> Result<Self, AssembleError> {
        let pages = document.get_pages();
        if pages.len() != 1 {
            return Err(AssembleError::Merge(format!(
                "template {location} must have exactly one page, found {}",
                pages.len()
            )));
        }
        let page_id = pages
            .values()
            .next()
            .copied()
            .ok_or_else(|| AssembleError::Merge(format!("template {location} has no pages")))?;
        let (origin, (width, height)) = media_box(&document, page_id)?;

        Ok(Self {
            document,
            page_id,
            origin,
            width,
            height,
            location,
        })
    }

    pub fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn origin(&self) -> (f32, f32) {
        self.origin
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn matches(&self, width: f32, height: f32) -> bool {
        (self.width - width).abs() <= SIZE_TOLERANCE && (self.height - height).abs() <= SIZE_TOLERANCE
    }
}

impl fmt::Debug for BaseDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseDocument")
            .field("location", &self.location)
            .field("origin", &self.origin)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Serialize `page`, over `template` when one is given.
pub fn assemble(page: &RenderedPage, template: Option<&BaseDocument>) -> Result<Vec<u8>, AssembleError> {
    let document = match template {
        Some(base) => overlay_on_template(base, page)?,
        None => standalone(page)?,
    };
    finish(document)
}

struct Overlay {
    content_id: ObjectId,
    fonts: Dictionary,
    xobjects: Dictionary,
}

fn standalone(page: &RenderedPage) -> Result<Document, AssembleError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let overlay = add_overlay(&mut doc, page, "", (0.0, 0.0))?;

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page.width),
            Object::Real(page.height),
        ],
        "Contents" => overlay.content_id,
        "Resources" => dictionary! {
            "Font" => overlay.fonts,
            "XObject" => overlay.xobjects,
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

fn overlay_on_template(template: &BaseDocument, page: &RenderedPage) -> Result<Document, AssembleError> {
    if !template.matches(page.width, page.height) {
        return Err(AssembleError::TemplateMismatch {
            expected_width: page.width,
            expected_height: page.height,
            found_width: template.width,
            found_height: template.height,
        });
    }

    let mut doc = template.document.clone();
    let page_id = template.page_id;

    let mut resources = page_resources(&doc, page_id);
    let mut contents = page_contents(&doc, page_id)?;
    let overlay = add_overlay(&mut doc, page, OVERLAY_PREFIX, template.origin)?;

    merge_resource_category(&doc, &mut resources, b"Font", &overlay.fonts);
    merge_resource_category(&doc, &mut resources, b"XObject", &overlay.xobjects);

    // Isolate the template's graphics state from the overlay.
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));

    let mut layered = Vec::with_capacity(contents.len() + 3);
    layered.push(Object::Reference(save_id));
    layered.append(&mut contents);
    layered.push(Object::Reference(restore_id));
    layered.push(Object::Reference(overlay.content_id));

    let page_dict = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| AssembleError::Merge(e.to_string()))?;
    page_dict.set("Contents", layered);
    page_dict.set("Resources", resources);

    Ok(doc)
}

/// Layout coordinates are relative to the page's lower-left corner, so a
/// page whose MediaBox does not start at the origin gets a translation.
fn add_overlay(
    doc: &mut Document,
    page: &RenderedPage,
    prefix: &str,
    origin: (f32, f32),
) -> Result<Overlay, AssembleError> {
    let image_name = format!("{prefix}Im1");
    let image_id = doc.add_object(image_stream(&page.qr));
    let mut xobjects = Dictionary::new();
    xobjects.set(image_name.clone(), image_id);

    let mut fonts = Dictionary::new();
    for font in page.fonts() {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(format!("{prefix}{}", font.resource_name()), font_id);
    }

    let mut operations = Vec::new();
    if origin != (0.0, 0.0) {
        operations.push(Operation::new(
            "cm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(origin.0),
                Object::Real(origin.1),
            ],
        ));
    }
    operations.push(Operation::new("g", vec![Object::Integer(0)]));
    for op in &page.ops {
        match op {
            DrawOp::Image { x, y, width, height } => {
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        Object::Real(*width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(*height),
                        Object::Real(*x),
                        Object::Real(*y),
                    ],
                ));
                operations.push(Operation::new(
                    "Do",
                    vec![Object::Name(image_name.clone().into_bytes())],
                ));
                operations.push(Operation::new("Q", vec![]));
            }
            DrawOp::Text { x, y, font, size, text } => {
                let font_name = format!("{prefix}{}", font.resource_name());
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font_name.into_bytes()), Object::Real(*size)],
                ));
                operations.push(Operation::new("Td", vec![Object::Real(*x), Object::Real(*y)]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
        }
    }

    let content = Content { operations }
        .encode()
        .map_err(|e| AssembleError::Serialize(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    Ok(Overlay {
        content_id,
        fonts,
        xobjects,
    })
}

fn image_stream(raster: &QrRaster) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(raster.width() as i64),
            "Height" => Object::Integer(raster.height() as i64),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => Object::Integer(8),
        },
        raster.luma().to_vec(),
    )
}

fn finish(mut doc: Document) -> Result<Vec<u8>, AssembleError> {
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(PRODUCER),
        "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
    });
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AssembleError::Serialize(e.to_string()))?;
    Ok(buffer)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look up a page attribute, walking up the page tree for inherited ones.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// The MediaBox as (lower-left corner, (width, height)).
fn media_box(doc: &Document, page_id: ObjectId) -> Result<((f32, f32), (f32, f32)), AssembleError> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .ok_or_else(|| AssembleError::Merge("template page has no MediaBox".to_string()))?;
    let corners = resolve(doc, media_box)
        .as_array()
        .map_err(|e| AssembleError::Merge(format!("template MediaBox is not an array: {e}")))?;

    let values: Vec<f32> = corners
        .iter()
        .map(|corner| number(resolve(doc, corner)))
        .collect::<Option<Vec<_>>>()
        .filter(|values| values.len() == 4)
        .ok_or_else(|| AssembleError::Merge("template MediaBox must hold four numbers".to_string()))?;

    let origin = (values[0].min(values[2]), values[1].min(values[3]));
    let size = ((values[2] - values[0]).abs(), (values[3] - values[1]).abs());
    Ok((origin, size))
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|resources| resolve(doc, resources).as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, AssembleError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| AssembleError::Merge(e.to_string()))?;

    match page.get(b"Contents").ok().map(|entry| (entry, resolve(doc, entry))) {
        None => Ok(Vec::new()),
        Some((_, Object::Array(streams))) => Ok(streams.clone()),
        Some((Object::Reference(id), Object::Stream(_))) => Ok(vec![Object::Reference(*id)]),
        Some(_) => Err(AssembleError::Merge(
            "template page has an unusable Contents entry".to_string(),
        )),
    }
}

fn merge_resource_category(doc: &Document, resources: &mut Dictionary, key: &[u8], additions: &Dictionary) {
    let mut merged = resources
        .get(key)
        .ok()
        .and_then(|entry| resolve(doc, entry).as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    for (name, value) in additions.iter() {
        merged.set(name.clone(), value.clone());
    }
    resources.set(key.to_vec(), merged);
}
