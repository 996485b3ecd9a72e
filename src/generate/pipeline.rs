//! The request-independent half of `POST /generate_pdf`: body parsing and
//! turning a resolved record into PDF bytes.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

use super::error::{GenerateError, INVALID_JSON_BODY};
use crate::pdf::{self, BaseDocument, LayoutSpec, QrOptions};
use crate::property::PropertyRecord;

/// Where a request currently is. Only used for debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Validated,
    Fetched,
    Encoded,
    Composed,
    Assembled,
    Responded,
    Errored,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Fetched => "fetched",
            Self::Encoded => "encoded",
            Self::Composed => "composed",
            Self::Assembled => "assembled",
            Self::Responded => "responded",
            Self::Errored => "errored",
        };
        f.write_str(stage)
    }
}

pub fn log_stage(property_id: &str, stage: RequestStage) {
    log::debug!("[generate_pdf {}] {}", property_id, stage);
}

/// Stage tracking for one request. Carries the property id once the body
/// has been parsed so every later log line can be correlated.
#[derive(Debug)]
pub struct RequestTrace {
    property_id: Option<String>,
    stage: RequestStage,
}

impl RequestTrace {
    pub fn start() -> Self {
        let trace = Self {
            property_id: None,
            stage: RequestStage::Received,
        };
        log_stage(trace.label(), trace.stage);
        trace
    }

    pub fn identify(&mut self, property_id: &str) {
        self.property_id = Some(property_id.to_string());
    }

    pub fn advance(&mut self, stage: RequestStage) {
        self.stage = stage;
        log_stage(self.label(), stage);
    }

    /// The property id, or `-` before it is known.
    pub fn label(&self) -> &str {
        self.property_id.as_deref().unwrap_or("-")
    }

    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    pub fn stage(&self) -> RequestStage {
        self.stage
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedPdf {
    pub property_id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl GeneratedPdf {
    pub fn sha256_hex(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

/// Extract `property_id` from a raw request body.
///
/// Strings are trimmed and numbers are accepted as their decimal form.
/// An empty body is treated like `{}`.
pub fn parse_property_id(body: &[u8]) -> Result<String, GenerateError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(GenerateError::missing_property_id());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|_| GenerateError::InvalidRequest(INVALID_JSON_BODY.to_string()))?;

    let id = match value.get("property_id") {
        Some(Value::String(id)) => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };

    if id.is_empty() {
        Err(GenerateError::missing_property_id())
    } else {
        Ok(id)
    }
}

/// Encode, compose and assemble. CPU-bound; callers run it off the reactor.
pub fn render_document(
    record: &PropertyRecord,
    layout: &LayoutSpec,
    qr_options: QrOptions,
    template: Option<&BaseDocument>,
) -> Result<GeneratedPdf, GenerateError> {
    let qr = pdf::encode(&record.target_url, qr_options)?;
    log_stage(&record.id, RequestStage::Encoded);

    let page = pdf::compose(record, qr, layout);
    log_stage(&record.id, RequestStage::Composed);

    let bytes = pdf::assemble(&page, template)?;
    log_stage(&record.id, RequestStage::Assembled);

    Ok(GeneratedPdf {
        property_id: record.id.clone(),
        filename: record.filename(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::UrlSource;

    fn record() -> PropertyRecord {
        PropertyRecord {
            id: "42".to_string(),
            code: "MAPLE-7".to_string(),
            name: "Maple Court".to_string(),
            target_url: "https://example.com/p/42".to_string(),
            url_source: UrlSource::Record,
        }
    }

    #[test]
    fn test_parse_property_id() {
        assert_eq!(parse_property_id(br#"{"property_id":"abc"}"#).unwrap(), "abc");
        assert_eq!(parse_property_id(br#"{"property_id":" abc "}"#).unwrap(), "abc");
        assert_eq!(parse_property_id(br#"{"property_id":17}"#).unwrap(), "17");
    }

    #[test]
    fn test_parse_property_id_rejects_missing() {
        let bodies: [&[u8]; 9] = [
            b"",
            b"  ",
            b"{}",
            br#"{"property_id":null}"#,
            br#"{"property_id":""}"#,
            br#"{"property_id":"   "}"#,
            br#"{"property_id":true}"#,
            br#"{"property_id":["a"]}"#,
            b"[]",
        ];
        for body in bodies {
            let err = parse_property_id(body).unwrap_err();
            assert_eq!(err.to_string(), "Missing property_id", "body: {:?}", body);
        }
    }

    #[test]
    fn test_parse_property_id_rejects_malformed_json() {
        let err = parse_property_id(b"{property_id:").unwrap_err();
        assert!(matches!(err, GenerateError::InvalidRequest(ref m) if m == "Invalid JSON body"));
    }

    #[test]
    fn test_render_document_standalone() {
        let pdf = render_document(&record(), &LayoutSpec::classic(), QrOptions::default(), None).unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF-"));
        assert_eq!(pdf.filename, "MAPLE-7.pdf");
        assert_eq!(pdf.sha256_hex().len(), 64);
    }

    #[test]
    fn test_trace_labels_with_property_id_once_known() {
        let mut trace = RequestTrace::start();
        assert_eq!(trace.label(), "-");
        assert_eq!(trace.stage(), RequestStage::Received);

        trace.identify("42");
        trace.advance(RequestStage::Errored);
        assert_eq!(trace.label(), "42");
        assert_eq!(trace.property_id(), Some("42"));
        assert_eq!(trace.stage(), RequestStage::Errored);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(RequestStage::Received.to_string(), "received");
        assert_eq!(RequestStage::Errored.to_string(), "errored");
    }
}
