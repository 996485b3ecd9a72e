pub mod error;
pub mod handlers;
pub mod pipeline;

pub use error::GenerateError;
pub use pipeline::{parse_property_id, render_document, GeneratedPdf, RequestStage, RequestTrace};
