//! Ranked chart types shared by the store, the HTTP collaborators and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder written into developer/publisher cells until enrichment fills them.
pub const UNKNOWN: &str = "Unknown";

/// One row of a captured wishlist chart.
///
/// `identifier` is the display title and is the only identity used for
/// diffing and enrichment. Two different games sharing a title are conflated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    /// 1-based, dense and unique within a snapshot.
    pub rank: u32,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Follower count. `None` and `Some(0)` both mean unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u64>,
}

impl RankedItem {
    pub fn new(rank: u32, identifier: impl Into<String>) -> Self {
        Self {
            rank,
            identifier: identifier.into(),
            external_id: None,
            metric: None,
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_metric(mut self, metric: u64) -> Self {
        self.metric = Some(metric);
        self
    }

    /// The follower count if it is known (non-zero).
    pub fn known_metric(&self) -> Option<u64> {
        self.metric.filter(|&m| m > 0)
    }
}

/// A timestamped capture of the full chart. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub items: Vec<RankedItem>,
}

impl Snapshot {
    /// Build a snapshot after checking the ranking is well formed.
    pub fn capture(
        captured_at: DateTime<Utc>,
        items: Vec<RankedItem>,
    ) -> Result<Self, ChartError> {
        validate_ranking(&items)?;
        Ok(Self { captured_at, items })
    }

    /// Sortable timestamp used in snapshot and artifact file names.
    pub fn stamp(&self) -> String {
        file_stamp(self.captured_at)
    }
}

/// `YYYYMMDD_HHMMSS`, lexicographic order equals chronological order.
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Secondary metadata resolved for a flagged item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub identifier: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub developer: String,
    pub publisher: String,
}

impl EnrichmentRecord {
    /// A record carrying only placeholders.
    pub fn unknown(identifier: impl Into<String>, external_id: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            external_id,
            developer: UNKNOWN.to_string(),
            publisher: UNKNOWN.to_string(),
        }
    }

    /// True when neither field carries real data.
    pub fn is_unknown(&self) -> bool {
        self.developer == UNKNOWN && self.publisher == UNKNOWN
    }

    /// True when both fields carry real data.
    pub fn is_complete(&self) -> bool {
        self.developer != UNKNOWN && self.publisher != UNKNOWN
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChartError {
    #[error("chart is empty")]
    Empty,
    #[error("rank {found} at position {position}, expected {expected}")]
    NonDenseRank {
        position: usize,
        expected: u32,
        found: u32,
    },
    #[error("entry at rank {rank} has a blank title")]
    BlankIdentifier { rank: u32 },
    #[error("chart JSON parse error: {0}")]
    Json(String),
}

/// Reject empty charts, blank titles and ranks that are not `1..=n` in order.
pub fn validate_ranking(items: &[RankedItem]) -> Result<(), ChartError> {
    if items.is_empty() {
        return Err(ChartError::Empty);
    }
    for (position, item) in items.iter().enumerate() {
        let expected = position as u32 + 1;
        if item.rank != expected {
            return Err(ChartError::NonDenseRank {
                position,
                expected,
                found: item.rank,
            });
        }
        if item.identifier.trim().is_empty() {
            return Err(ChartError::BlankIdentifier { rank: item.rank });
        }
    }
    Ok(())
}

// ── Chart wire format ──

/// Store ids arrive as either JSON numbers or strings depending on the feed.
#[derive(Deserialize)]
#[serde(untagged)]
enum AppId {
    Num(u64),
    Text(String),
}

#[derive(Deserialize)]
struct ChartEntry {
    rank: u32,
    name: String,
    #[serde(default)]
    appid: Option<AppId>,
    #[serde(default)]
    followers: Option<u64>,
}

/// Parse a chart feed (`[{ "rank", "name", "appid"?, "followers"? }]`) and
/// validate the resulting ranking.
pub fn parse_chart_json(json: &str) -> Result<Vec<RankedItem>, ChartError> {
    let entries: Vec<ChartEntry> =
        serde_json::from_str(json).map_err(|e| ChartError::Json(e.to_string()))?;

    let items: Vec<RankedItem> = entries
        .into_iter()
        .map(|e| RankedItem {
            rank: e.rank,
            identifier: e.name.trim().to_string(),
            external_id: e.appid.map(|id| match id {
                AppId::Num(n) => n.to_string(),
                AppId::Text(s) => s.trim().to_string(),
            }),
            metric: e.followers,
        })
        .collect();

    validate_ranking(&items)?;
    Ok(items)
}
