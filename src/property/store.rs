//! Remote property store.
//!
//! Properties live in Supabase and are read through its PostgREST interface.
//! The `PropertyStore` trait keeps the HTTP client out of the pipeline so
//! tests can swap in an in-memory store.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::model::{LandingPageRow, PropertyRow};

const PROPERTY_COLUMNS: &str = "id,code,property_name,qr_url";
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Property not found: {0}")]
    NotFound(String),
    #[error("Property store request failed: {0}")]
    Upstream(String),
    #[error("Invalid property record: {0}")]
    InvalidRecord(String),
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Zero or one `properties` row whose id equals `id`.
    async fn find_property(&self, id: &str) -> Result<Option<PropertyRow>, FetchError>;

    /// The `url` of the `landing_pages` row whose id equals `landing_page_id`.
    async fn find_landing_page_url(&self, landing_page_id: &str) -> Result<Option<String>, FetchError>;
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_key: String,
    pub timeout: Duration,
    /// Also select `landing_page_id` and follow it when `qr_url` is empty.
    pub landing_pages: bool,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("landing_pages", &self.landing_pages)
            .finish()
    }
}

pub struct SupabasePropertyStore {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabasePropertyStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Upstream(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.supabase_url.trim_end_matches('/'),
            table
        )
    }

    fn property_columns(&self) -> String {
        if self.config.landing_pages {
            format!("{PROPERTY_COLUMNS},landing_page_id")
        } else {
            PROPERTY_COLUMNS.to_string()
        }
    }

    /// `GET /rest/v1/{table}?id=eq.{id}&select={columns}`, returning the raw body.
    async fn select_by_id(&self, table: &str, id: &str, columns: &str) -> Result<String, FetchError> {
        log::info!("Fetching {} row {} from Supabase", table, id);

        let response = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.config.supabase_key)
            .bearer_auth(&self.config.supabase_key)
            .header(ACCEPT, "application/json")
            .query(&[("id", format!("eq.{id}")), ("select", columns.to_string())])
            .send()
            .await
            .map_err(|e| request_error(table, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| request_error(table, e))?;
        log::debug!("Supabase {} response ({}): {}", table, status, body);

        if !status.is_success() {
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(FetchError::Upstream(format!(
                "{table} lookup returned {status}: {preview}"
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl PropertyStore for SupabasePropertyStore {
    async fn find_property(&self, id: &str) -> Result<Option<PropertyRow>, FetchError> {
        let body = self
            .select_by_id("properties", id, &self.property_columns())
            .await?;
        parse_property_rows(&body)
    }

    async fn find_landing_page_url(&self, landing_page_id: &str) -> Result<Option<String>, FetchError> {
        let body = self.select_by_id("landing_pages", landing_page_id, "url").await?;
        parse_landing_page_rows(&body)
    }
}

fn request_error(table: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Upstream(format!("{table} lookup timed out"))
    } else {
        FetchError::Upstream(format!("{table} lookup failed: {error}"))
    }
}

fn parse_rows(body: &str) -> Result<Vec<serde_json::Value>, FetchError> {
    serde_json::from_str(body)
        .map_err(|e| FetchError::Upstream(format!("malformed response body: {e}")))
}

/// First row of a `properties` response, if any.
pub fn parse_property_rows(body: &str) -> Result<Option<PropertyRow>, FetchError> {
    match parse_rows(body)?.into_iter().next() {
        None => Ok(None),
        Some(row) => serde_json::from_value(row)
            .map(Some)
            .map_err(|e| FetchError::InvalidRecord(e.to_string())),
    }
}

/// `url` of the first row of a `landing_pages` response, if any.
pub fn parse_landing_page_rows(body: &str) -> Result<Option<String>, FetchError> {
    match parse_rows(body)?.into_iter().next() {
        None => Ok(None),
        Some(row) => serde_json::from_value::<LandingPageRow>(row)
            .map(|row| row.url)
            .map_err(|e| FetchError::InvalidRecord(format!("landing page: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(landing_pages: bool) -> SupabaseConfig {
        SupabaseConfig {
            supabase_url: "https://test.supabase.co/".to_string(),
            supabase_key: "service-key".to_string(),
            timeout: Duration::from_secs(5),
            landing_pages,
        }
    }

    #[test]
    fn test_parse_empty_array_is_none() {
        assert_eq!(parse_property_rows("[]").unwrap(), None);
        assert_eq!(parse_landing_page_rows("[]").unwrap(), None);
    }

    #[test]
    fn test_parse_takes_first_row() {
        let body = r#"[{"id":"a","code":"C1","property_name":"One","qr_url":"https://x.test/1"},
                       {"id":"b","code":"C2","property_name":"Two","qr_url":null}]"#;
        let row = parse_property_rows(body).unwrap().unwrap();
        assert_eq!(row.id.as_deref(), Some("a"));
        assert_eq!(row.qr_url.as_deref(), Some("https://x.test/1"));
    }

    #[test]
    fn test_parse_malformed_body_is_upstream_error() {
        assert!(matches!(parse_property_rows("<html>"), Err(FetchError::Upstream(_))));
        assert!(matches!(
            parse_property_rows(r#"{"message":"oops"}"#),
            Err(FetchError::Upstream(_))
        ));
    }

    #[test]
    fn test_parse_bad_row_is_invalid_record() {
        assert!(matches!(
            parse_property_rows(r#"[{"id":"a","qr_url":42}]"#),
            Err(FetchError::InvalidRecord(_))
        ));
        assert!(matches!(parse_property_rows("[7]"), Err(FetchError::InvalidRecord(_))));
    }

    #[test]
    fn test_landing_page_url_is_extracted() {
        let url = parse_landing_page_rows(r#"[{"url":"https://lp.test/a"}]"#).unwrap();
        assert_eq!(url.as_deref(), Some("https://lp.test/a"));
    }

    #[test]
    fn test_table_url_and_columns() {
        let store = SupabasePropertyStore::new(config(false)).unwrap();
        assert_eq!(
            store.table_url("properties"),
            "https://test.supabase.co/rest/v1/properties"
        );
        assert_eq!(store.property_columns(), "id,code,property_name,qr_url");

        let store = SupabasePropertyStore::new(config(true)).unwrap();
        assert_eq!(
            store.property_columns(),
            "id,code,property_name,qr_url,landing_page_id"
        );
    }

    #[test]
    fn test_config_debug_hides_key() {
        let debug = format!("{:?}", config(false));
        assert!(debug.contains("test.supabase.co"));
        assert!(!debug.contains("service-key"));
    }
}
