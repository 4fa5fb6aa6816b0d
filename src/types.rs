use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A fetched page or post, reduced to the text the parsers care about.
/// How it was retrieved (plain HTTP, API, feed item) is irrelevant here.
#[derive(Debug, Clone, Default)]
pub struct Post {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// The canonical unit persisted to the shared update store.
///
/// `update_date` stays a string on purpose: it holds either `YYYY-MM-DD`,
/// a full `YYYY-MM-DDTHH:MM:00+09:00` stamp, or the sentinel `TBA`, and
/// downstream consumers sort it lexicographically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateRecord {
    pub game_id: String,
    #[serde(default)]
    pub version: String,
    pub update_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    /// Source-specific pass-through attributes (name, platform, tags,
    /// summary, header_image, …). Preserved verbatim across
    /// read-modify-write cycles.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UpdateRecord {
    pub fn new(game_id: &str, version: &str, update_date: &str, description: &str, url: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            version: version.to_string(),
            update_date: update_date.to_string(),
            end_date: None,
            description: description.to_string(),
            url: url.to_string(),
            extra: Map::new(),
        }
    }

    pub fn with_end_date(mut self, end_date: &str) -> Self {
        self.end_date = Some(end_date.to_string());
        self
    }

    /// Fetch a pass-through attribute as a string, empty if absent.
    pub fn extra_str(&self, key: &str) -> &str {
        self.extra.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// Core trait that all update sources implement
#[async_trait::async_trait]
pub trait UpdateSource: Send + Sync {
    /// Unique identifier for this source
    fn source_name(&self) -> &'static str;

    /// Fetch and parse all currently visible updates from this source.
    /// Individual page failures are logged and skipped; an error here
    /// means the source as a whole could not be reached.
    async fn fetch_updates(&self, config: &Config) -> Result<Vec<UpdateRecord>>;

    /// Persist a fetched batch. The default is the plain dedup merge;
    /// sources with refresh semantics override this.
    fn merge_into(
        &self,
        store: &crate::store::UpdateStore,
        _config: &Config,
        records: &[UpdateRecord],
    ) -> Result<usize> {
        store.merge(records)
    }
}
