//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use wishwatch_sync::MailConfig;

pub const DEFAULT_DETAIL_URL: &str = "https://store.steampowered.com/api/appdetails";

/// Track a wishlist chart, flag new entries and risers, enrich and notify.
#[derive(Debug, Parser)]
#[command(name = "wishwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding one JSON file per captured snapshot.
    #[arg(long, env = "WISHWATCH_DATA_DIR", default_value = "data/snapshots", global = true)]
    pub data_dir: PathBuf,

    /// Directory for rendered reports and watchlists.
    #[arg(long, env = "WISHWATCH_OUT_DIR", default_value = "data/output", global = true)]
    pub out_dir: PathBuf,

    /// Enrichment cache file.
    #[arg(
        long,
        env = "WISHWATCH_CACHE",
        default_value = "data/enrichment_cache.json",
        global = true
    )]
    pub cache: PathBuf,

    /// Store detail endpoint used for developer/publisher lookups.
    #[arg(long, env = "WISHWATCH_DETAIL_URL", default_value = DEFAULT_DETAIL_URL, global = true)]
    pub detail_url: String,

    /// Pause between detail lookups, in milliseconds.
    #[arg(long, env = "WISHWATCH_DELAY_MS", default_value_t = 1500, global = true)]
    pub delay_ms: u64,

    /// HTTP timeout, in seconds.
    #[arg(long, env = "WISHWATCH_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub mail: MailArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct MailArgs {
    /// Mail API endpoint.
    #[arg(long, env = "WISHWATCH_MAIL_API_URL", global = true)]
    pub mail_api_url: Option<String>,

    /// Mail API key. Delivery is skipped when unset.
    #[arg(long, env = "WISHWATCH_MAIL_API_KEY", hide_env_values = true, global = true)]
    pub mail_api_key: Option<String>,

    /// Sender address.
    #[arg(long, env = "WISHWATCH_MAIL_FROM", global = true)]
    pub mail_from: Option<String>,

    /// Comma-separated recipients.
    #[arg(long, env = "WISHWATCH_MAIL_TO", global = true)]
    pub mail_to: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Capture the chart, diff, render, enrich and notify.
    Run(RunArgs),
    /// Retry enrichment of rows still reading Unknown in the latest watchlist.
    Enrich,
    /// Send the latest watchlist.
    Notify,
    /// Show changes between the two most recent snapshots.
    Diff(DiffArgs),
    /// List stored snapshots.
    Snapshots,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Chart feed URL returning `[{rank, name, appid, followers}]`.
    #[arg(
        long,
        env = "WISHWATCH_CHART_URL",
        conflicts_with = "input",
        required_unless_present = "input"
    )]
    pub chart_url: Option<String>,

    /// Read the chart from a local JSON file instead.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Skip developer/publisher lookups.
    #[arg(long)]
    pub no_enrich: bool,

    /// Skip notification.
    #[arg(long)]
    pub no_notify: bool,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Print the diff as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Mail settings, `None` unless key, sender and recipients are all set.
    pub fn mail_config(&self) -> Option<MailConfig> {
        MailConfig::from_parts(
            self.mail.mail_api_url.clone(),
            self.mail.mail_api_key.clone(),
            self.mail.mail_from.clone(),
            self.mail.mail_to.clone(),
        )
    }
}
