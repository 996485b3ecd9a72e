use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod generate;
pub mod pdf;
pub mod property;
pub mod state;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::generate::handlers::health,
        crate::generate::handlers::generate_pdf
    ),
    components(
        schemas(
            generate::handlers::GenerateRequest,
            generate::handlers::HealthResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Property PDF", description = "QR code PDF generation for property records.")
    )
)]
pub struct ApiDoc;

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_logging(config.debug_logs);

    let app_state = match AppState::new(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialize application state: {}", e);
            return Err(e.into());
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("property_qr_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create Prometheus metrics middleware: {}", e))?;

    let allowed_origins = config.allowed_origins.clone();
    log::info!("Starting server at http://0.0.0.0:{}", config.port);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = allowed_origins.iter().fold(
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .expose_headers(vec![header::CONTENT_DISPOSITION])
                .max_age(3600),
            |cors, origin| cors.allowed_origin(origin),
        );

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(generate::handlers::config)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}
