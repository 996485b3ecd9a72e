//! Shared, read-only application state.

use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::pdf::{AssembleError, BaseDocument, LayoutSpec, QrOptions};
use crate::property::{FetchError, RecordFetcher, SupabasePropertyStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to set up property store: {0}")]
    Store(#[from] FetchError),
    #[error(transparent)]
    Template(#[from] AssembleError),
}

/// Everything a request needs. Built once; never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<RecordFetcher>,
    pub layout: Arc<LayoutSpec>,
    pub qr_options: QrOptions,
    pub template: Option<Arc<BaseDocument>>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let store = SupabasePropertyStore::new(config.supabase.clone())?;
        let fetcher = RecordFetcher::new(
            Arc::new(store),
            config.default_qr_url.clone(),
            config.supabase.landing_pages,
        );

        let template = match config.effective_template_path() {
            Some(path) => {
                let base = BaseDocument::load(&path)?;
                let (width, height) = base.page_size();
                log::info!("Loaded template {} ({}x{}pt)", base.location(), width, height);
                if !base.matches(config.layout.page_width, config.layout.page_height) {
                    log::warn!(
                        "Template {} does not match layout '{}' ({}x{}pt); generation will fail",
                        base.location(),
                        config.layout.name,
                        config.layout.page_width,
                        config.layout.page_height
                    );
                }
                Some(base)
            }
            None => None,
        };

        log::info!("Using layout '{}'", config.layout.name);
        Ok(Self::new_with_fetcher(
            fetcher,
            config.layout.clone(),
            config.qr,
            template,
        ))
    }

    pub fn new_with_fetcher(
        fetcher: RecordFetcher,
        layout: LayoutSpec,
        qr_options: QrOptions,
        template: Option<BaseDocument>,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            layout: Arc::new(layout),
            qr_options,
            template: template.map(Arc::new),
        }
    }
}
