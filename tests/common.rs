#![allow(dead_code)]

use actix_web::web;
use async_trait::async_trait;
use flate2::read::ZlibDecoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use property_qr_server::pdf::{BaseDocument, LayoutSpec, QrOptions};
use property_qr_server::property::{FetchError, PropertyRow, PropertyStore, RecordFetcher};
use property_qr_server::AppState;
use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_URL: &str = "https://example.com";

/// In-memory stand-in for the Supabase property store.
#[derive(Default)]
pub struct MockPropertyStore {
    properties: HashMap<String, PropertyRow>,
    landing_pages: HashMap<String, String>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, id: &str, code: &str, name: &str, qr_url: Option<&str>) -> Self {
        self.properties.insert(
            id.to_string(),
            PropertyRow {
                id: Some(id.to_string()),
                code: Some(code.to_string()),
                property_name: Some(name.to_string()),
                qr_url: qr_url.map(str::to_string),
                landing_page_id: None,
            },
        );
        self
    }

    pub fn with_landing_page(mut self, property_id: &str, landing_page_id: &str, url: &str) -> Self {
        if let Some(row) = self.properties.get_mut(property_id) {
            row.landing_page_id = Some(landing_page_id.to_string());
        }
        self.landing_pages
            .insert(landing_page_id.to_string(), url.to_string());
        self
    }

    /// Every lookup fails with an upstream error.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Sleep before answering, so concurrent requests overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(FetchError::Upstream(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PropertyStore for MockPropertyStore {
    async fn find_property(&self, id: &str) -> Result<Option<PropertyRow>, FetchError> {
        self.answer().await?;
        Ok(self.properties.get(id).cloned())
    }

    async fn find_landing_page_url(&self, landing_page_id: &str) -> Result<Option<String>, FetchError> {
        self.answer().await?;
        Ok(self.landing_pages.get(landing_page_id).cloned())
    }
}

pub fn test_state(
    store: Arc<MockPropertyStore>,
    layout: LayoutSpec,
    template: Option<BaseDocument>,
) -> web::Data<AppState> {
    let fetcher = RecordFetcher::new(store, DEFAULT_URL, true);
    web::Data::new(AppState::new_with_fetcher(
        fetcher,
        layout,
        QrOptions::default(),
        template,
    ))
}

/// A background PDF with `pages` pages of `width`x`height` points, each
/// showing the string "TEMPLATE".
pub fn template_pdf(width: f32, height: f32, pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new("Td", vec![Object::Integer(36), Object::Integer(36)]),
            Operation::new("Tj", vec![Object::string_literal("TEMPLATE")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.encode().unwrap(),
    ));

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            }))
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn load_template(width: f32, height: f32) -> BaseDocument {
    BaseDocument::from_bytes(&template_pdf(width, height, 1), "test-template").unwrap()
}

pub fn only_page(doc: &Document) -> ObjectId {
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1, "expected a single page");
    *pages.values().next().unwrap()
}

pub fn media_box(doc: &Document) -> (f32, f32) {
    let page = doc.get_dictionary(only_page(doc)).unwrap();
    let corners = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let values: Vec<f32> = corners
        .iter()
        .map(|value| match value {
            Object::Integer(v) => *v as f32,
            Object::Real(v) => *v as f32,
            other => panic!("unexpected MediaBox entry {:?}", other),
        })
        .collect();
    (values[2] - values[0], values[3] - values[1])
}

/// Raw stream data, inflated when the stream is Flate-encoded. lopdf refuses
/// to decompress image streams itself.
pub fn stream_bytes(stream: &Stream) -> Vec<u8> {
    let flate = stream
        .dict
        .get(b"Filter")
        .and_then(|filter| filter.as_name())
        .map(|name| name == b"FlateDecode")
        .unwrap_or(false);
    if !flate {
        return stream.content.clone();
    }

    let mut inflated = Vec::new();
    ZlibDecoder::new(stream.content.as_slice())
        .read_to_end(&mut inflated)
        .unwrap();
    inflated
}

pub fn page_operations(doc: &Document) -> Vec<Operation> {
    let content = doc.get_page_content(only_page(doc)).unwrap();
    Content::decode(&content).unwrap().operations
}

/// Every string shown with `Tj`, in paint order.
pub fn shown_strings(doc: &Document) -> Vec<String> {
    page_operations(doc)
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}

/// The first image XObject in the document as (width, height, grey pixels).
pub fn qr_image(doc: &Document) -> (usize, usize, Vec<u8>) {
    doc.objects
        .values()
        .find_map(|object| match object {
            Object::Stream(stream)
                if stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|subtype| subtype.as_name())
                    .map(|name| name == b"Image")
                    .unwrap_or(false) =>
            {
                let width = stream.dict.get(b"Width").unwrap().as_i64().unwrap() as usize;
                let height = stream.dict.get(b"Height").unwrap().as_i64().unwrap() as usize;
                Some((width, height, stream_bytes(stream)))
            }
            _ => None,
        })
        .expect("document has no image XObject")
}

/// Decode the embedded QR image back to its text.
pub fn decode_qr(doc: &Document) -> String {
    let (width, height, pixels) = qr_image(doc);
    decode_luma(width, height, &pixels)
}

pub fn decode_luma(width: usize, height: usize, pixels: &[u8]) -> String {
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| pixels[y * width + x]);
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR code");
    let (_, text) = grids[0].decode().unwrap();
    text
}

/// What a viewer would see: page operations plus image pixels. Excludes
/// the Info dictionary, whose CreationDate changes between runs.
pub fn visible_fingerprint(bytes: &[u8]) -> (Vec<u8>, (usize, usize, Vec<u8>)) {
    let doc = Document::load_mem(bytes).unwrap();
    let content = doc.get_page_content(only_page(&doc)).unwrap();
    (content, qr_image(&doc))
}
