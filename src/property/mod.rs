//! Property records and the remote store they come from.
//!
//! - `model` - table rows and the per-request `PropertyRecord`
//! - `store` - the `PropertyStore` trait and its Supabase implementation
//! - `fetcher` - id lookup plus the QR target fallback chain

pub mod fetcher;
pub mod model;
pub mod store;

pub use fetcher::RecordFetcher;
pub use model::{PropertyRecord, PropertyRow, UrlSource};
pub use store::{FetchError, PropertyStore, SupabaseConfig, SupabasePropertyStore};
