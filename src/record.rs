//! Typed view of raw records returned by the Zenodo records API.
//!
//! The API is loosely shaped: identifiers arrive as numbers or strings,
//! `resource_type` and `license` are objects on current records and plain
//! strings on older ones, and nearly every field may be missing or `null`.
//! Every field is therefore optional here and the accessors hide the shape
//! differences. Search hits are decoded one at a time so that a single
//! malformed hit does not discard the rest of its page.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Decodes an explicit `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope of a search response: `{"hits": {"hits": [...], "total": n}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: SearchHits,
}

/// Inner `hits` object of a search response.
///
/// Hits stay as raw JSON until [`SearchHits::into_page`] decodes them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHits {
    #[serde(default, deserialize_with = "null_as_default")]
    pub hits: Vec<Value>,
    /// Either an integer or an object such as `{"value": n}`.
    #[serde(default)]
    pub total: Option<Value>,
}

impl SearchHits {
    /// Returns the total-count hint, if the server sent a usable one.
    #[must_use]
    pub fn total_hint(&self) -> Option<u64> {
        match self.total.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::Object(map) => map.get("value").and_then(Value::as_u64),
            _ => None,
        }
    }

    /// Decodes every hit independently. Hits that do not fit [`RawRecord`]
    /// are logged and counted in [`SearchPage::skipped`].
    #[must_use]
    pub fn into_page(self) -> SearchPage {
        let total = self.total_hint();
        let mut page = SearchPage {
            records: Vec::with_capacity(self.hits.len()),
            total,
            skipped: 0,
        };
        for (position, hit) in self.hits.into_iter().enumerate() {
            match serde_json::from_value::<RawRecord>(hit) {
                Ok(record) => page.records.push(record),
                Err(error) => {
                    warn!(position, error = %error, "skipping undecodable search hit");
                    page.skipped += 1;
                }
            }
        }
        page
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub records: Vec<RawRecord>,
    pub total: Option<u64>,
    /// Hits the server returned that could not be decoded.
    pub skipped: usize,
}

impl SearchPage {
    /// Number of hits the server returned, decodable or not.
    #[must_use]
    pub fn returned(&self) -> usize {
        self.records.len() + self.skipped
    }
}

/// A record as delivered by the external API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: RecordLinks,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: RecordMetadata,
    /// Set by the crawler when the record is admitted into a session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawled_at: Option<String>,
}

/// Link bag of a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordLinks {
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

/// Nested metadata bag of a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub creators: Vec<Creator>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub resource_type: Option<Value>,
    #[serde(default)]
    pub access_right: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub license: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_identifiers: Vec<Value>,
}

/// A creator entry; only `name` is used downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub orcid: Option<String>,
}

impl RawRecord {
    /// Returns the record identifier in string form, or an empty string.
    #[must_use]
    pub fn id_string(&self) -> String {
        match &self.id {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.metadata.title.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn description(&self) -> &str {
        self.metadata.description.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.metadata.keywords
    }

    /// Returns the resource-type tag (`type` of the object form, or the plain string).
    #[must_use]
    pub fn resource_type(&self) -> Option<String> {
        match self.metadata.resource_type.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("type").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }

    /// Returns the license identifier (`id` of the object form, or the plain string).
    #[must_use]
    pub fn license_id(&self) -> Option<String> {
        match self.metadata.license.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(map) => map
                .get("id")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            _ => None,
        }
    }

    /// Lowercased `title description keywords...` text used by the classifier.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title(),
            self.description(),
            self.keywords().join(" ")
        )
        .to_lowercase()
    }
}
