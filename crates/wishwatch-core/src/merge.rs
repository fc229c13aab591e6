//! In-place enrichment of a rendered watchlist.
//!
//! A watchlist row is patched only while both of its trailing cells still
//! read the placeholder, so merging the same record twice leaves the
//! document untouched the second time. Rows are located by their title
//! cell, which is matched literally: the title is HTML-escaped the way the
//! renderer wrote it and then regex-escaped.
//!
//! Row shapes (see [`crate::render`]):
//!
//! - new entry: rank, title, followers, developer, publisher
//! - riser: rank, title, previous, change, followers, developer, publisher

use std::ops::Range;

use regex::Regex;

use crate::chart::{EnrichmentRecord, UNKNOWN};
use crate::render::escape_html;

/// Result of [`merge`]. `text` equals the input when `matched` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub text: String,
    pub matched: bool,
}

/// Fill the developer/publisher placeholders of the row titled
/// `record.identifier`.
///
/// No matching row (unknown title, row already enriched) is a normal
/// outcome reported as `matched: false`. A record with nothing but
/// placeholders never matches.
pub fn merge(artifact: &str, record: &EnrichmentRecord) -> MergeOutcome {
    let slots = if record.is_unknown() {
        None
    } else {
        placeholder_cells(artifact, &record.identifier)
    };
    let Some((dev, publ)) = slots else {
        return MergeOutcome {
            text: artifact.to_string(),
            matched: false,
        };
    };

    let mut text = String::with_capacity(artifact.len() + 64);
    text.push_str(&artifact[..dev.start]);
    text.push_str(&escape_html(&record.developer));
    text.push_str(&artifact[dev.end..publ.start]);
    text.push_str(&escape_html(&record.publisher));
    text.push_str(&artifact[publ.end..]);
    MergeOutcome {
        text,
        matched: true,
    }
}

/// True when a row titled `identifier` still carries both placeholders.
pub fn is_pending(artifact: &str, identifier: &str) -> bool {
    placeholder_cells(artifact, identifier).is_some()
}

/// Byte ranges of the developer and publisher placeholders in the first
/// row titled `identifier`, trying new-entry rows then riser rows.
fn placeholder_cells(artifact: &str, identifier: &str) -> Option<(Range<usize>, Range<usize>)> {
    let title = regex::escape(&escape_html(identifier));
    for pattern in [new_entry_pattern(&title), riser_pattern(&title)] {
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(identifier, error = %e, "merge pattern rejected");
                return None;
            }
        };
        if let Some(caps) = re.captures(artifact)
            && let (Some(dev), Some(publ)) = (caps.name("dev"), caps.name("pub"))
        {
            return Some((dev.range(), publ.range()));
        }
    }
    None
}

fn trailing_placeholders() -> String {
    format!(r"<td>(?P<dev>{UNKNOWN})</td>\s*<td>(?P<pub>{UNKNOWN})</td>\s*</tr>")
}

fn new_entry_pattern(title: &str) -> String {
    format!(
        r"<tr>\s*<td>\d+</td>\s*<td>{title}</td>\s*<td>[^<]*</td>\s*{}",
        trailing_placeholders()
    )
}

fn riser_pattern(title: &str) -> String {
    let movement = r"<td>\d+</td>\s*<td>\+\d+</td>\s*";
    format!(
        r"<tr>\s*<td>\d+</td>\s*<td>{title}</td>\s*{movement}<td>[^<]*</td>\s*{}",
        trailing_placeholders()
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::chart::RankedItem;
    use crate::diff::{DiffOutcome, Riser};
    use crate::render::render_watchlist;

    fn record(id: &str, dev: &str, publ: &str) -> EnrichmentRecord {
        EnrichmentRecord {
            identifier: id.into(),
            external_id: None,
            developer: dev.into(),
            publisher: publ.into(),
        }
    }

    fn watchlist() -> String {
        let outcome = DiffOutcome {
            new_entries: vec![
                RankedItem::new(3, "Hades II").with_metric(250_000),
                RankedItem::new(7, "Tom & Jerry (2026)"),
            ],
            risers: vec![
                Riser {
                    item: RankedItem::new(1, "Half-Life: Alyx").with_metric(98_000),
                    previous_rank: 6,
                    change: 5,
                },
                Riser {
                    item: RankedItem::new(5, "Cost $9.99?").with_metric(10),
                    previous_rank: 12,
                    change: 7,
                },
            ],
            is_baseline: false,
        };
        render_watchlist(
            &outcome,
            "2026-10-16T12:00:00Z".parse().unwrap(),
            &HashMap::new(),
        )
    }

    #[test]
    fn patches_new_entry_row() {
        let text = watchlist();
        let out = merge(&text, &record("Hades II", "Supergiant Games", "Supergiant Games"));
        assert!(out.matched);
        assert!(out.text.contains(
            "Hades II</td><td>250,000</td><td>Supergiant Games</td><td>Supergiant Games</td></tr>"
        ));
        // Only the two cells changed.
        let removed = "<td>Unknown</td><td>Unknown</td>";
        assert_eq!(
            text.matches(removed).count() - 1,
            out.text.matches(removed).count()
        );
    }

    #[test]
    fn patches_riser_row_with_regex_metacharacters() {
        let out = merge(&watchlist(), &record("Half-Life: Alyx", "Valve", "Valve"));
        assert!(out.matched);
        assert!(out.text.contains(
            "Alyx</td><td>6</td><td>+5</td><td>98,000</td><td>Valve</td><td>Valve</td></tr>"
        ));

        let out = merge(&watchlist(), &record("Cost $9.99?", "Dev $1", "Pub \\0"));
        assert!(out.matched);
        assert!(out.text.contains("<td>Dev $1</td><td>Pub \\0</td></tr>"));
    }

    #[test]
    fn matches_html_escaped_titles() {
        let out = merge(&watchlist(), &record("Tom & Jerry (2026)", "A&B", "<C>"));
        assert!(out.matched);
        assert!(out.text.contains(
            "<td>Tom &amp; Jerry (2026)</td><td>n/a</td><td>A&amp;B</td><td>&lt;C&gt;</td></tr>"
        ));
    }

    #[test]
    fn second_merge_is_a_no_op() {
        let r = record("Half-Life: Alyx", "Valve", "Valve");
        let first = merge(&watchlist(), &r);
        let second = merge(&first.text, &r);
        assert!(!second.matched);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn idempotent_for_placeholder_and_partial_records() {
        for r in [
            record("Hades II", UNKNOWN, UNKNOWN),
            record("Hades II", "Supergiant Games", UNKNOWN),
            record("Hades II", UNKNOWN, "Supergiant Games"),
            record("Nope", "x", "y"),
        ] {
            let first = merge(&watchlist(), &r);
            let second = merge(&first.text, &r);
            assert!(!second.matched, "{r:?}");
            assert_eq!(second.text, first.text);
        }
    }

    #[test]
    fn all_placeholder_record_never_matches() {
        let text = watchlist();
        let out = merge(&text, &record("Hades II", UNKNOWN, UNKNOWN));
        assert!(!out.matched);
        assert_eq!(out.text, text);
    }

    #[test]
    fn unknown_title_leaves_text_untouched() {
        let text = watchlist();
        let out = merge(&text, &record("Hades", "x", "y"));
        assert!(!out.matched);
        assert_eq!(out.text, text);
    }

    #[test]
    fn title_prefix_does_not_match() {
        // "Hades" must not match the "Hades II" row.
        let text = watchlist();
        assert!(!merge(&text, &record("Hades", "x", "y")).matched);
        assert!(!merge(&text, &record("ades II", "x", "y")).matched);
    }

    #[test]
    fn pending_tracks_placeholder_rows() {
        let text = watchlist();
        assert!(is_pending(&text, "Half-Life: Alyx"));
        assert!(!is_pending(&text, "Not There"));
        let done = merge(&text, &record("Half-Life: Alyx", "Valve", "Valve")).text;
        assert!(!is_pending(&done, "Half-Life: Alyx"));
        assert!(is_pending(&done, "Hades II"));
    }

    #[test]
    fn empty_artifact_is_not_an_error() {
        let out = merge("", &record("Hades II", "x", "y"));
        assert!(!out.matched);
        assert!(out.text.is_empty());
    }

    #[test]
    fn order_of_merges_does_not_matter() {
        let a = record("Hades II", "Supergiant Games", "Supergiant Games");
        let b = record("Half-Life: Alyx", "Valve", "Valve");
        let ab = merge(&merge(&watchlist(), &a).text, &b).text;
        let ba = merge(&merge(&watchlist(), &b).text, &a).text;
        assert_eq!(ab, ba);
        assert!(!ab.contains("Alyx</td><td>6</td><td>+5</td><td>98,000</td><td>Unknown"));
    }

    #[test]
    fn tolerates_whitespace_between_cells() {
        let text = "<tr>\n  <td>1</td>\n  <td>Spaced</td>\n  <td>n/a</td>\n  \
                    <td>Unknown</td>\n  <td>Unknown</td>\n</tr>";
        let out = merge(text, &record("Spaced", "D", "P"));
        assert!(out.matched);
        assert_eq!(
            out.text,
            "<tr>\n  <td>1</td>\n  <td>Spaced</td>\n  <td>n/a</td>\n  \
             <td>D</td>\n  <td>P</td>\n</tr>"
        );
    }
}
