//! External collaborators: chart feed, per-item detail lookups, politeness
//! pacing and mail delivery.

mod error;
pub use error::SourceError;

pub mod chart;
pub mod detail;
pub mod notify;
pub mod pacer;

pub use chart::read_chart_file;
pub use detail::DetailSource;
pub use notify::{MailConfig, Mailer, NotifyError, NotifyOutcome, NotifyReason, dispatch};
pub use pacer::Pacer;

#[cfg(feature = "http")]
pub use chart::ChartClient;
#[cfg(feature = "http")]
pub use detail::SteamDetailSource;
#[cfg(feature = "http")]
pub use notify::HttpMailer;
