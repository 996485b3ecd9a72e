use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::error::GenerateError;
use super::pipeline::{self, GeneratedPdf, RequestStage, RequestTrace};
use crate::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Property id; numbers are accepted too.
    #[schema(example = "a1b2c3")]
    pub property_id: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Property PDF",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse { ok: true })
}

#[utoipa::path(
    post,
    path = "/generate_pdf",
    tag = "Property PDF",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "One-page PDF with the property's QR code", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Missing property_id or malformed body", body = crate::ErrorResponse),
        (status = 404, description = "Property not found", body = crate::ErrorResponse),
        (status = 500, description = "Store, encoding or assembly failure", body = crate::ErrorResponse)
    )
)]
pub async fn generate_pdf(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    log::info!("Executing generate_pdf handler");

    match run_request(&state, &body).await {
        (_, Ok(pdf)) => pdf_response(pdf),
        (_, Err(e)) => e.into(),
    }
}

/// Drive one request through every stage, logging against its property id.
async fn run_request(state: &AppState, body: &[u8]) -> (RequestTrace, Result<GeneratedPdf, GenerateError>) {
    let mut trace = RequestTrace::start();
    let result = handle_generate(state, body, &mut trace).await;

    match &result {
        Ok(pdf) => {
            log::info!(
                "Generated {} for property {} ({} bytes, sha256 {})",
                pdf.filename,
                pdf.property_id,
                pdf.bytes.len(),
                pdf.sha256_hex()
            );
            trace.advance(RequestStage::Responded);
        }
        Err(e) => {
            if e.status_code().is_server_error() {
                log::error!("PDF generation for property {} failed: {}", trace.label(), e);
            } else {
                log::warn!("Rejected generate_pdf request for property {}: {}", trace.label(), e);
            }
            trace.advance(RequestStage::Errored);
        }
    }

    (trace, result)
}

async fn handle_generate(
    state: &AppState,
    body: &[u8],
    trace: &mut RequestTrace,
) -> Result<GeneratedPdf, GenerateError> {
    let property_id = pipeline::parse_property_id(body)?;
    trace.identify(&property_id);
    trace.advance(RequestStage::Validated);

    let record = state.fetcher.fetch(&property_id).await?;
    trace.advance(RequestStage::Fetched);
    log::debug!(
        "Property {} code='{}' name='{}' qr target {} ({})",
        record.id,
        record.code,
        record.name,
        record.target_url,
        record.url_source
    );

    let layout = Arc::clone(&state.layout);
    let template = state.template.clone();
    let qr_options = state.qr_options;

    web::block(move || pipeline::render_document(&record, &layout, qr_options, template.as_deref()))
        .await
        .map_err(|e| GenerateError::Internal(e.to_string()))?
}

fn pdf_response(pdf: GeneratedPdf) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(pdf.filename)],
        })
        .body(pdf.bytes)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(health)))
        .service(web::resource("/generate_pdf").route(web::post().to(generate_pdf)));
}
