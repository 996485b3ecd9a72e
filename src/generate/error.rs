use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::pdf::{AssembleError, QrError};
use crate::property::FetchError;
use crate::ErrorResponse;

pub const MISSING_PROPERTY_ID: &str = "Missing property_id";
pub const INVALID_JSON_BODY: &str = "Invalid JSON body";

/// Anything that can stop a PDF from being generated.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("QR encoding failed: {0}")]
    Encoding(#[from] QrError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error("PDF generation failed: {0}")]
    Internal(String),
}

impl GenerateError {
    pub fn missing_property_id() -> Self {
        Self::InvalidRequest(MISSING_PROPERTY_ID.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Fetch(FetchError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Fetch(FetchError::Upstream(_) | FetchError::InvalidRecord(_))
            | Self::Encoding(_)
            | Self::Assemble(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GenerateError> for HttpResponse {
    fn from(error: GenerateError) -> Self {
        HttpResponse::build(error.status_code()).json(ErrorResponse::new(&error.to_string()))
    }
}
