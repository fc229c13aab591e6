//! HTML report and watchlist rendering.
//!
//! Each table row is written on a single line. The watchlist row layout is
//! the contract [`crate::merge`] patches against, so the two modules must
//! change together.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::chart::{EnrichmentRecord, RankedItem, Snapshot, UNKNOWN};
use crate::diff::DiffOutcome;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; margin-bottom: 1.5em; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }
th { background: #f0f0f0; }
.empty, .captured { color: #666; }";

const NEW_HEADER: &[&str] = &["Rank", "Title", "Followers", "Developer", "Publisher"];
const RISER_HEADER: &[&str] = &[
    "Rank",
    "Title",
    "Previous",
    "Change",
    "Followers",
    "Developer",
    "Publisher",
];
const REPORT_HEADER: &[&str] = &["Rank", "Title", "Followers"];

// ── Public API ──

/// Full chart as a single table: rank, title, followers.
pub fn render_report(snapshot: &Snapshot) -> String {
    let mut out = open_document("Wishlist chart", snapshot.captured_at);
    out.push_str(&format!("<h2>Top {}</h2>\n", snapshot.items.len()));
    open_table(&mut out, REPORT_HEADER);
    for item in &snapshot.items {
        out.push_str(&row(&[
            item.rank.to_string(),
            escape_html(&item.identifier),
            followers(item),
        ]));
    }
    close_table(&mut out);
    close_document(&mut out);
    out
}

/// New entries and risers, each ending in developer/publisher cells.
///
/// Cells are pre-filled from `known` (keyed by title); everything else is
/// left as the `Unknown` placeholder for later enrichment.
pub fn render_watchlist(
    outcome: &DiffOutcome,
    captured_at: DateTime<Utc>,
    known: &HashMap<String, EnrichmentRecord>,
) -> String {
    let mut out = open_document("Wishlist watchlist", captured_at);

    if outcome.is_baseline {
        out.push_str(
            "<p class=\"empty\">Baseline run: no earlier snapshot to compare against.</p>\n",
        );
    }

    out.push_str(&format!(
        "<h2>New entries ({})</h2>\n",
        outcome.new_entries.len()
    ));
    if outcome.new_entries.is_empty() {
        out.push_str("<p class=\"empty\">No new entries.</p>\n");
    } else {
        open_table(&mut out, NEW_HEADER);
        for item in &outcome.new_entries {
            let (dev, publ) = metadata(item, known);
            out.push_str(&row(&[
                item.rank.to_string(),
                escape_html(&item.identifier),
                followers(item),
                dev,
                publ,
            ]));
        }
        close_table(&mut out);
    }

    out.push_str(&format!("<h2>Risers ({})</h2>\n", outcome.risers.len()));
    if outcome.risers.is_empty() {
        out.push_str("<p class=\"empty\">No risers.</p>\n");
    } else {
        open_table(&mut out, RISER_HEADER);
        for riser in &outcome.risers {
            let (dev, publ) = metadata(&riser.item, known);
            out.push_str(&row(&[
                riser.item.rank.to_string(),
                escape_html(&riser.item.identifier),
                riser.previous_rank.to_string(),
                format!("+{}", riser.change),
                followers(&riser.item),
                dev,
                publ,
            ]));
        }
        close_table(&mut out);
    }

    close_document(&mut out);
    out
}

/// Escape text for an HTML text node.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Helpers ──

fn open_document(title: &str, captured_at: DateTime<Utc>) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>\n{STYLE}\n</style>\n</head>\n<body>\n<h1>{title}</h1>\n\
         <p class=\"captured\">Captured {}</p>\n",
        captured_at.format("%Y-%m-%d %H:%M UTC")
    )
}

fn close_document(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

fn open_table(out: &mut String, header: &[&str]) {
    out.push_str("<table>\n<thead><tr>");
    for h in header {
        out.push_str(&format!("<th>{h}</th>"));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
}

fn close_table(out: &mut String) {
    out.push_str("</tbody>\n</table>\n");
}

fn row(cells: &[String]) -> String {
    let mut out = String::from("<tr>");
    for cell in cells {
        out.push_str("<td>");
        out.push_str(cell);
        out.push_str("</td>");
    }
    out.push_str("</tr>\n");
    out
}

fn metadata(item: &RankedItem, known: &HashMap<String, EnrichmentRecord>) -> (String, String) {
    match known.get(&item.identifier) {
        Some(rec) => (escape_html(&rec.developer), escape_html(&rec.publisher)),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    }
}

fn followers(item: &RankedItem) -> String {
    item.known_metric()
        .map(group_thousands)
        .unwrap_or_else(|| "n/a".to_string())
}

/// 1234567 -> "1,234,567"
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
