//! Reformat a rendered watchlist into a mail payload.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SECTION_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<h2>(New entries|Risers) \((\d+)\)</h2>").expect("invalid section regex")
});
static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<body>(.*)</body>").expect("invalid body regex"));
static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tr>(.*?)</tr>").expect("invalid row regex"));
static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<t[dh]>(.*?)</t[dh]>").expect("invalid cell regex"));

const EMAIL_STYLE: &str = "font-family: sans-serif; font-size: 14px;";

/// Subject plus HTML and plain-text bodies for one watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailPayload {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Build a mail payload from watchlist HTML.
///
/// `label` names the run (typically the file stamp) and is appended to the
/// subject.
pub fn mail_payload(watchlist: &str, label: &str) -> MailPayload {
    let (new_entries, risers) = section_counts(watchlist);
    let summary = if new_entries == 0 && risers == 0 {
        "no changes".to_string()
    } else {
        format!("{new_entries} new, {risers} risers")
    };

    let inner = BODY
        .captures(watchlist)
        .and_then(|c| c.get(1))
        .map_or(watchlist, |m| m.as_str())
        .trim();

    MailPayload {
        subject: format!("Wishlist watch {label}: {summary}"),
        html: format!("<div style=\"{EMAIL_STYLE}\">\n{inner}\n</div>"),
        text: plain_text(watchlist),
    }
}

fn section_counts(watchlist: &str) -> (usize, usize) {
    let mut new_entries = 0;
    let mut risers = 0;
    for caps in SECTION_COUNT.captures_iter(watchlist) {
        let n = caps[2].parse().unwrap_or(0);
        match &caps[1] {
            "New entries" => new_entries = n,
            _ => risers = n,
        }
    }
    (new_entries, risers)
}

/// One line per table row, cells separated by ` | `.
fn plain_text(watchlist: &str) -> String {
    let mut out = String::new();
    for row in ROW.captures_iter(watchlist) {
        let cells: Vec<String> = CELL
            .captures_iter(&row[1])
            .map(|c| unescape_html(&c[1]))
            .collect();
        if !cells.is_empty() {
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
    }
    out
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::chart::RankedItem;
    use crate::diff::{DiffOutcome, Riser};
    use crate::render::render_watchlist;

    fn rendered(outcome: &DiffOutcome) -> String {
        render_watchlist(outcome, "2026-10-16T12:00:00Z".parse().unwrap(), &HashMap::new())
    }

    #[test]
    fn subject_carries_counts() {
        let outcome = DiffOutcome {
            new_entries: vec![RankedItem::new(1, "A"), RankedItem::new(2, "B")],
            risers: vec![Riser {
                item: RankedItem::new(3, "C"),
                previous_rank: 9,
                change: 6,
            }],
            is_baseline: false,
        };
        let payload = mail_payload(&rendered(&outcome), "20261016_120000");
        assert_eq!(payload.subject, "Wishlist watch 20261016_120000: 2 new, 1 risers");
    }

    #[test]
    fn quiet_run_subject() {
        let payload = mail_payload(&rendered(&DiffOutcome::default()), "x");
        assert_eq!(payload.subject, "Wishlist watch x: no changes");
    }

    #[test]
    fn html_body_drops_document_shell() {
        let payload = mail_payload(&rendered(&DiffOutcome::default()), "x");
        assert!(payload.html.starts_with("<div style="));
        assert!(!payload.html.contains("<!DOCTYPE"));
        assert!(!payload.html.contains("<style>"));
        assert!(payload.html.contains("<h1>Wishlist watchlist</h1>"));
    }

    #[test]
    fn text_body_lists_rows() {
        let outcome = DiffOutcome {
            new_entries: vec![RankedItem::new(4, "Tom & Jerry").with_metric(1500)],
            ..Default::default()
        };
        let payload = mail_payload(&rendered(&outcome), "x");
        assert_eq!(
            payload.text,
            "Rank | Title | Followers | Developer | Publisher\n\
             4 | Tom & Jerry | 1,500 | Unknown | Unknown\n"
        );
    }
}
