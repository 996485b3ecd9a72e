use std::sync::Arc;

use super::model::{PropertyRecord, PropertyRow, UrlSource};
use super::store::{FetchError, PropertyStore};

/// Resolves property ids into printable records.
///
/// The QR target is the row's `qr_url`, else the linked landing page's
/// `url` (when enabled), else the configured default URL.
pub struct RecordFetcher {
    store: Arc<dyn PropertyStore>,
    default_url: String,
    landing_pages: bool,
}

impl RecordFetcher {
    pub fn new(store: Arc<dyn PropertyStore>, default_url: impl Into<String>, landing_pages: bool) -> Self {
        Self {
            store,
            default_url: default_url.into(),
            landing_pages,
        }
    }

    pub async fn fetch(&self, id: &str) -> Result<PropertyRecord, FetchError> {
        let row = self
            .store
            .find_property(id)
            .await?
            .ok_or_else(|| FetchError::NotFound(id.to_string()))?;

        let record_id = non_blank(row.id.as_deref())
            .ok_or_else(|| FetchError::InvalidRecord(format!("row for {id} has no id")))?;
        let (target_url, url_source) = self.resolve_target_url(&row).await?;

        log::debug!("Property {} resolved QR target from {}", record_id, url_source);

        Ok(PropertyRecord {
            id: record_id,
            code: row.code.unwrap_or_default(),
            name: row.property_name.unwrap_or_default(),
            target_url,
            url_source,
        })
    }

    async fn resolve_target_url(&self, row: &PropertyRow) -> Result<(String, UrlSource), FetchError> {
        if let Some(url) = non_blank(row.qr_url.as_deref()) {
            return Ok((url, UrlSource::Record));
        }

        if self.landing_pages {
            if let Some(landing_page_id) = non_blank(row.landing_page_id.as_deref()) {
                let url = self.store.find_landing_page_url(&landing_page_id).await?;
                if let Some(url) = non_blank(url.as_deref()) {
                    return Ok((url, UrlSource::LandingPage));
                }
                log::debug!("Landing page {} has no url, using default", landing_page_id);
            }
        }

        non_blank(Some(&self.default_url))
            .map(|url| (url, UrlSource::Default))
            .ok_or_else(|| FetchError::InvalidRecord("no QR target URL and no default configured".to_string()))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
