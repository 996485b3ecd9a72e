use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Row of the `properties` table as PostgREST returns it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyRow {
    #[serde(default, deserialize_with = "optional_identifier")]
    pub id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "name")]
    pub property_name: Option<String>,
    #[serde(default)]
    pub qr_url: Option<String>,
    #[serde(default, deserialize_with = "optional_identifier", skip_serializing_if = "Option::is_none")]
    pub landing_page_id: Option<String>,
}

/// Row of the `landing_pages` table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LandingPageRow {
    #[serde(default)]
    pub url: Option<String>,
}

/// Where a record's QR target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    Record,
    LandingPage,
    Default,
}

impl fmt::Display for UrlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Record => "record",
            Self::LandingPage => "landing_page",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

/// A property ready to be printed. Built per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    pub id: String,
    pub code: String,
    pub name: String,
    pub target_url: String,
    pub url_source: UrlSource,
}

impl PropertyRecord {
    /// Download name: the code, or the id when the code is blank.
    pub fn filename(&self) -> String {
        let base = if self.code.trim().is_empty() {
            self.id.trim()
        } else {
            self.code.trim()
        };
        let sanitized = sanitize_filename::sanitize(base);
        let sanitized = sanitized.trim();
        if sanitized.is_empty() {
            "property.pdf".to_string()
        } else {
            format!("{sanitized}.pdf")
        }
    }
}

/// Accepts ids stored either as text or as numbers.
fn optional_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Identifier {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Identifier>::deserialize(deserializer)?.map(|id| match id {
        Identifier::Text(text) => text,
        Identifier::Number(number) => number.to_string(),
    }))
}
