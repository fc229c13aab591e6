//! Per-item developer/publisher lookups.

use async_trait::async_trait;
use serde::Deserialize;
use wishwatch_core::{EnrichmentRecord, UNKNOWN};

/// Resolves secondary metadata for one item.
///
/// Implementations never fail: any problem degrades to placeholder values.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn lookup(&self, identifier: &str, external_id: &str) -> EnrichmentRecord;
}

// ── Steam appdetails payload ──

#[derive(Deserialize)]
struct AppDetailsEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<AppDetailsData>,
}

#[derive(Deserialize)]
struct AppDetailsData {
    #[serde(default)]
    developers: Vec<String>,
    #[serde(default)]
    publishers: Vec<String>,
}

/// Extract `(developer, publisher)` for `appid` from an appdetails response.
///
/// Multiple names are joined with `", "`. A missing or empty list yields
/// the placeholder for that field; an unsuccessful response yields `None`.
pub fn parse_app_details(json: &str, appid: &str) -> Option<(String, String)> {
    let mut envelope: std::collections::HashMap<String, AppDetailsEnvelope> =
        serde_json::from_str(json).ok()?;
    let entry = envelope.remove(appid)?;
    if !entry.success {
        return None;
    }
    let data = entry.data?;
    Some((join_names(&data.developers), join_names(&data.publishers)))
}

fn join_names(names: &[String]) -> String {
    let names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        UNKNOWN.to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(feature = "http")]
pub use http::SteamDetailSource;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use tracing::{debug, warn};
    use wishwatch_core::EnrichmentRecord;

    use super::{DetailSource, parse_app_details};
    use crate::SourceError;

    /// `basic` does not carry developers or publishers, so ask for them by name.
    const DETAIL_FILTERS: &str = "developers,publishers";

    /// Looks items up on the Steam store `appdetails` endpoint.
    pub struct SteamDetailSource {
        client: reqwest::Client,
        base_url: String,
    }

    impl SteamDetailSource {
        /// `base_url` is the appdetails endpoint, e.g.
        /// `https://store.steampowered.com/api/appdetails`.
        pub fn new(client: reqwest::Client, base_url: String) -> Self {
            Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }
        }

        fn request(&self, appid: &str) -> reqwest::RequestBuilder {
            self.client
                .get(&self.base_url)
                .query(&[("appids", appid), ("filters", DETAIL_FILTERS)])
        }

        async fn fetch(&self, appid: &str) -> Result<String, SourceError> {
            let resp = self.request(appid).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SourceError::Server {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(resp.text().await?)
        }
    }

    #[async_trait]
    impl DetailSource for SteamDetailSource {
        async fn lookup(&self, identifier: &str, external_id: &str) -> EnrichmentRecord {
            let mut record =
                EnrichmentRecord::unknown(identifier, Some(external_id.to_string()));
            match self.fetch(external_id).await {
                Ok(body) => match parse_app_details(&body, external_id) {
                    Some((developer, publisher)) => {
                        debug!(identifier, %developer, %publisher, "resolved details");
                        record.developer = developer;
                        record.publisher = publisher;
                    }
                    None => warn!(identifier, appid = external_id, "no details in response"),
                },
                Err(e) => {
                    warn!(identifier, appid = external_id, error = %e, "detail lookup failed")
                }
            }
            record
        }
    }

}
