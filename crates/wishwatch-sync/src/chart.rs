//! Current chart acquisition: a JSON feed over HTTP or a local JSON file.

use std::path::Path;

use tracing::info;
use wishwatch_core::{RankedItem, parse_chart_json};

use crate::SourceError;

/// Read a chart feed saved to disk.
pub fn read_chart_file(path: &Path) -> Result<Vec<RankedItem>, SourceError> {
    let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let items = parse_chart_json(&text)?;
    info!(path = %path.display(), count = items.len(), "read chart file");
    Ok(items)
}

/// HTTP client for the chart feed.
#[cfg(feature = "http")]
pub struct ChartClient {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http")]
impl ChartClient {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    /// Fetch and validate the current chart.
    pub async fn fetch(&self) -> Result<Vec<RankedItem>, SourceError> {
        info!(url = %self.url, "fetching chart");
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        let items = parse_chart_json(&text)?;
        info!(count = items.len(), "fetched chart");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wishwatch_core::ChartError;

    #[test]
    fn reads_valid_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("chart.json");
        std::fs::write(
            &path,
            r#"[{"rank":1,"name":"A","appid":10},{"rank":2,"name":"B","followers":3}]"#,
        )
        .unwrap();
        let items = read_chart_file(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id.as_deref(), Some("10"));
        assert_eq!(items[1].metric, Some(3));
    }

    #[test]
    fn empty_file_chart_is_input_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("chart.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            read_chart_file(&path),
            Err(SourceError::Chart(ChartError::Empty))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            read_chart_file(&tmp.path().join("absent.json")),
            Err(SourceError::Io { .. })
        ));
    }
}
