//! Core types for wishwatch: chart model, snapshot diff engine, watchlist
//! rendering and the in-place enrichment merge.

pub mod chart;
pub mod diff;
pub mod merge;
pub mod notify;
pub mod render;

pub use chart::{
    ChartError, EnrichmentRecord, RankedItem, Snapshot, UNKNOWN, file_stamp, parse_chart_json,
    validate_ranking,
};
pub use diff::{DiffOutcome, RISER_THRESHOLD, Riser, diff};
pub use merge::{MergeOutcome, is_pending, merge};
pub use notify::{MailPayload, mail_payload};
pub use render::{escape_html, render_report, render_watchlist};
