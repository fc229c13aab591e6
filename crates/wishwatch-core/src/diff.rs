//! Snapshot diff engine.
//!
//! Compares the current chart against the most recent prior capture and
//! flags two kinds of change:
//!
//! - **new entries**: titles absent from the prior capture
//! - **risers**: titles present in both whose rank improved by more than
//!   [`RISER_THRESHOLD`] places
//!
//! Identity is the display title. Items that fall, hold, climb by at most
//! the threshold, or drop off the chart produce nothing.

use std::collections::HashMap;

use serde::Serialize;

use crate::chart::RankedItem;

/// A climb must exceed this many places to be reported.
pub const RISER_THRESHOLD: i64 = 2;

/// An item that climbed more than [`RISER_THRESHOLD`] places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Riser {
    pub item: RankedItem,
    pub previous_rank: u32,
    /// `previous_rank - item.rank`, always positive.
    pub change: u32,
}

/// Result of [`diff`]. Both lists keep the relative order of the current chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffOutcome {
    pub new_entries: Vec<RankedItem>,
    pub risers: Vec<Riser>,
    /// No prior capture existed, so nothing could be classified.
    pub is_baseline: bool,
}

impl DiffOutcome {
    /// True when there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.new_entries.is_empty() && self.risers.is_empty()
    }

    /// Every flagged item, new entries first.
    pub fn flagged(&self) -> impl Iterator<Item = &RankedItem> {
        self.new_entries
            .iter()
            .chain(self.risers.iter().map(|r| &r.item))
    }
}

/// Classify `current` against `previous`.
///
/// An empty `previous` marks a baseline run. Duplicate titles in `previous`
/// resolve last-write-wins.
pub fn diff(current: &[RankedItem], previous: &[RankedItem]) -> DiffOutcome {
    if previous.is_empty() {
        return DiffOutcome {
            is_baseline: true,
            ..Default::default()
        };
    }

    let prior: HashMap<&str, &RankedItem> = previous
        .iter()
        .map(|item| (item.identifier.as_str(), item))
        .collect();

    let mut outcome = DiffOutcome::default();
    for item in current {
        match prior.get(item.identifier.as_str()) {
            None => outcome.new_entries.push(item.clone()),
            Some(before) => {
                let delta = i64::from(before.rank) - i64::from(item.rank);
                if delta > RISER_THRESHOLD {
                    outcome.risers.push(Riser {
                        item: item.clone(),
                        previous_rank: before.rank,
                        change: delta as u32,
                    });
                }
            }
        }
    }

    tracing::debug!(
        new_entries = outcome.new_entries.len(),
        risers = outcome.risers.len(),
        "diffed chart"
    );
    outcome
}
