//! Process configuration, read once at startup.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::pdf::{LayoutError, LayoutSpec, QrOptions, MAX_MODULE_SCALE, MAX_QUIET_ZONE};
use crate::property::SupabaseConfig;

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_QR_URL: &str = "https://example.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LAYOUT_PROFILE: &str = "classic";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase: SupabaseConfig,
    pub debug_logs: bool,
    pub port: u16,
    pub default_qr_url: String,
    pub layout: LayoutSpec,
    /// Overrides the layout's own template path.
    pub template_path: Option<PathBuf>,
    pub qr: QrOptions,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let supabase_url = var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                value: supabase_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }
        let supabase_key = var("SUPABASE_KEY").ok_or(ConfigError::Missing("SUPABASE_KEY"))?;

        let timeout_secs = parse_or("STORE_TIMEOUT_SECS", var("STORE_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "STORE_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let supabase = SupabaseConfig {
            supabase_url,
            supabase_key,
            timeout: Duration::from_secs(timeout_secs),
            landing_pages: flag(var("LANDING_PAGES_ENABLED")),
        };

        let layout = match var("LAYOUT_PATH") {
            Some(path) => LayoutSpec::from_file(&PathBuf::from(path))?,
            None => LayoutSpec::from_profile(
                &var("LAYOUT_PROFILE").unwrap_or_else(|| DEFAULT_LAYOUT_PROFILE.to_string()),
            )?,
        };

        let defaults = QrOptions::default();
        let qr = QrOptions {
            module_scale: parse_or("QR_MODULE_SCALE", var("QR_MODULE_SCALE"), defaults.module_scale)?,
            quiet_zone: parse_or("QR_QUIET_ZONE", var("QR_QUIET_ZONE"), defaults.quiet_zone)?,
        };
        if !(1..=MAX_MODULE_SCALE).contains(&qr.module_scale) {
            return Err(ConfigError::Invalid {
                name: "QR_MODULE_SCALE",
                value: qr.module_scale.to_string(),
                reason: format!("must be between 1 and {}", MAX_MODULE_SCALE),
            });
        }
        if qr.quiet_zone > MAX_QUIET_ZONE {
            return Err(ConfigError::Invalid {
                name: "QR_QUIET_ZONE",
                value: qr.quiet_zone.to_string(),
                reason: format!("must be at most {}", MAX_QUIET_ZONE),
            });
        }

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            supabase,
            debug_logs: flag(var("DEBUG_LOGS")),
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            default_qr_url: var("DEFAULT_QR_URL").unwrap_or_else(|| DEFAULT_QR_URL.to_string()),
            layout,
            template_path: var("TEMPLATE_PATH").map(PathBuf::from),
            qr,
            allowed_origins,
        })
    }

    /// The template to load, if any: `TEMPLATE_PATH` first, then the layout's.
    pub fn effective_template_path(&self) -> Option<PathBuf> {
        self.template_path
            .clone()
            .or_else(|| self.layout.template_path.clone())
    }
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value: raw,
        }),
    }
}
