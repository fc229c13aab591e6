//! Watchlist delivery through a transactional mail API.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use wishwatch_core::{MailPayload, mail_payload};

pub const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";

/// Why a notification was skipped or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyReason {
    NotConfigured,
    NoWatchlist,
    Transport,
    Rejected,
}

impl NotifyReason {
    pub fn code(self) -> &'static str {
        match self {
            NotifyReason::NotConfigured => "not_configured",
            NotifyReason::NoWatchlist => "no_watchlist",
            NotifyReason::Transport => "transport",
            NotifyReason::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Skipped(NotifyReason),
    Failed { reason: NotifyReason, detail: String },
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent)
    }

    /// Reason code, `None` when sent.
    pub fn reason(&self) -> Option<NotifyReason> {
        match self {
            NotifyOutcome::Sent => None,
            NotifyOutcome::Skipped(r) => Some(*r),
            NotifyOutcome::Failed { reason, .. } => Some(*reason),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl NotifyError {
    fn reason(&self) -> NotifyReason {
        match self {
            NotifyError::Transport(_) => NotifyReason::Transport,
            NotifyError::Rejected { .. } => NotifyReason::Rejected,
        }
    }
}

/// Sends one mail payload.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, payload: &MailPayload) -> Result<(), NotifyError>;
}

/// Delivery settings. Incomplete settings mean delivery is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub to: Vec<String>,
}

impl MailConfig {
    /// Build a config when key, sender and at least one recipient are set.
    ///
    /// `to` is a comma-separated recipient list.
    pub fn from_parts(
        api_url: Option<String>,
        api_key: Option<String>,
        from: Option<String>,
        to: Option<String>,
    ) -> Option<Self> {
        let non_empty =
            |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let api_key = non_empty(api_key)?;
        let from = non_empty(from)?;
        let to: Vec<String> = non_empty(to)?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if to.is_empty() {
            return None;
        }
        Some(Self {
            api_url: non_empty(api_url).unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
            api_key,
            from,
            to,
        })
    }
}

/// Send the latest watchlist (`(label, html)`) if delivery is configured.
///
/// Never fails: every problem becomes a skipped or failed outcome.
pub async fn dispatch(
    mailer: Option<&dyn Mailer>,
    watchlist: Option<(&str, &str)>,
) -> NotifyOutcome {
    let Some(mailer) = mailer else {
        debug!("mail delivery not configured, skipping notification");
        return NotifyOutcome::Skipped(NotifyReason::NotConfigured);
    };
    let Some((label, html)) = watchlist else {
        info!(reason = NotifyReason::NoWatchlist.code(), "no watchlist to send");
        return NotifyOutcome::Skipped(NotifyReason::NoWatchlist);
    };

    let payload = mail_payload(html, label);
    match mailer.send(&payload).await {
        Ok(()) => {
            info!(subject = %payload.subject, "notification sent");
            NotifyOutcome::Sent
        }
        Err(e) => {
            let reason = e.reason();
            warn!(reason = reason.code(), error = %e, "notification failed");
            NotifyOutcome::Failed {
                reason,
                detail: e.to_string(),
            }
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpMailer;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use serde::Serialize;
    use wishwatch_core::MailPayload;

    use super::{MailConfig, Mailer, NotifyError};

    #[derive(Serialize)]
    struct SendRequest<'a> {
        from: &'a str,
        to: &'a [String],
        subject: &'a str,
        html: &'a str,
        text: &'a str,
    }

    /// Posts payloads as JSON with bearer authentication.
    pub struct HttpMailer {
        client: reqwest::Client,
        config: MailConfig,
    }

    impl HttpMailer {
        pub fn new(client: reqwest::Client, config: MailConfig) -> Self {
            Self { client, config }
        }
    }

    #[async_trait]
    impl Mailer for HttpMailer {
        async fn send(&self, payload: &MailPayload) -> Result<(), NotifyError> {
            let body = SendRequest {
                from: &self.config.from,
                to: &self.config.to,
                subject: &payload.subject,
                html: &payload.html,
                text: &payload.text,
            };
            let resp = self
                .client
                .post(&self.config.api_url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| NotifyError::Transport(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct RecordingMailer {
        sent: Mutex<Vec<MailPayload>>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, payload: &MailPayload) -> Result<(), NotifyError> {
            if let Some(status) = self.fail_with {
                return Err(NotifyError::Rejected {
                    status,
                    body: "nope".into(),
                });
            }
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    const WATCHLIST: &str = "<html><body><h2>New entries (1)</h2><h2>Risers (0)</h2></body></html>";

    #[tokio::test]
    async fn unconfigured_is_silent_skip() {
        let outcome = dispatch(None, Some(("x", WATCHLIST))).await;
        assert_eq!(outcome, NotifyOutcome::Skipped(NotifyReason::NotConfigured));
        assert_eq!(outcome.reason().map(NotifyReason::code), Some("not_configured"));
    }

    #[tokio::test]
    async fn missing_watchlist_is_skipped() {
        let mailer = RecordingMailer {
            sent: Mutex::new(vec![]),
            fail_with: None,
        };
        let outcome = dispatch(Some(&mailer as &dyn Mailer), None).await;
        assert_eq!(outcome, NotifyOutcome::Skipped(NotifyReason::NoWatchlist));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sends_reformatted_watchlist() {
        let mailer = RecordingMailer {
            sent: Mutex::new(vec![]),
            fail_with: None,
        };
        let outcome = dispatch(
            Some(&mailer as &dyn Mailer),
            Some(("20261016_120000", WATCHLIST)),
        )
        .await;
        assert!(outcome.is_sent());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Wishlist watch 20261016_120000: 1 new, 0 risers");
    }

    #[tokio::test]
    async fn rejection_is_reported_not_raised() {
        let mailer = RecordingMailer {
            sent: Mutex::new(vec![]),
            fail_with: Some(422),
        };
        let outcome = dispatch(Some(&mailer as &dyn Mailer), Some(("x", WATCHLIST))).await;
        assert_eq!(outcome.reason(), Some(NotifyReason::Rejected));
        assert!(matches!(
            outcome,
            NotifyOutcome::Failed { ref detail, .. } if detail.contains("422")
        ));
    }

    #[test]
    fn config_requires_key_sender_and_recipient() {
        assert!(
            MailConfig::from_parts(None, None, Some("a@x".into()), Some("b@x".into())).is_none()
        );
        assert!(MailConfig::from_parts(None, Some("k".into()), None, Some("b@x".into())).is_none());
        assert!(
            MailConfig::from_parts(
                None,
                Some("k".into()),
                Some("a@x".into()),
                Some(" , ".into())
            )
            .is_none()
        );

        let config = MailConfig::from_parts(
            Some("  ".into()),
            Some("k".into()),
            Some("a@x".into()),
            Some("b@x, c@x".into()),
        )
        .unwrap();
        assert_eq!(config.api_url, DEFAULT_MAIL_API_URL);
        assert_eq!(config.to, vec!["b@x", "c@x"]);
    }
}
