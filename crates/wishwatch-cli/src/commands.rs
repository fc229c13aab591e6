//! Subcommand implementations.

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use tracing::debug;
use wishwatch_core::{DiffOutcome, Snapshot, diff};
use wishwatch_store::{
    ArtifactKind, ArtifactStore, EnrichmentCache, FileSnapshotStore, SnapshotStore,
};
use wishwatch_sync::{
    ChartClient, HttpMailer, Mailer, NotifyOutcome, Pacer, SteamDetailSource, read_chart_file,
};

use crate::cli::{Cli, Commands, DiffArgs, RunArgs};
use crate::pipeline::{self, Context, EnrichStats, RunOptions, RunSummary};

pub async fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => run(cli, args).await,
        Commands::Enrich => enrich(cli).await,
        Commands::Notify => notify(cli).await,
        Commands::Diff(args) => show_diff(cli, args),
        Commands::Snapshots => list_snapshots(cli),
    }
}

fn http_client(cli: &Cli) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(cli.timeout())
        .user_agent(concat!("wishwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}

fn build_mailer(cli: &Cli, client: &reqwest::Client) -> Option<HttpMailer> {
    cli.mail_config().map(|config| HttpMailer::new(client.clone(), config))
}

async fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let client = http_client(cli)?;
    let items = match (&args.input, &args.chart_url) {
        (Some(path), _) => read_chart_file(path)?,
        (None, Some(url)) => ChartClient::new(client.clone(), url.clone()).fetch().await?,
        (None, None) => bail!("either --chart-url or --input is required"),
    };

    let snapshots = FileSnapshotStore::new(&cli.data_dir);
    let artifacts = ArtifactStore::new(&cli.out_dir);
    let details = SteamDetailSource::new(client.clone(), cli.detail_url.clone());
    let mailer = build_mailer(cli, &client);
    let mut ctx = Context {
        snapshots: &snapshots,
        artifacts: &artifacts,
        cache: EnrichmentCache::load(&cli.cache),
        details: &details,
        mailer: mailer.as_ref().map(|m| m as &dyn Mailer),
        pacer: Pacer::new(cli.delay()),
    };
    let opts = RunOptions {
        enrich: !args.no_enrich,
        notify: !args.no_notify,
    };

    let summary = pipeline::run(&mut ctx, items, Utc::now(), opts).await?;
    print_run_summary(&summary);
    Ok(())
}

async fn enrich(cli: &Cli) -> Result<()> {
    let artifacts = ArtifactStore::new(&cli.out_dir);
    let Some(watchlist) = artifacts.latest(ArtifactKind::Watchlist)? else {
        println!("No watchlist to enrich.");
        return Ok(());
    };

    let snapshots = FileSnapshotStore::new(&cli.data_dir);
    let snapshot = match snapshots.load(&watchlist.stamp) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            debug!(
                stamp = %watchlist.stamp,
                error = %e,
                "no snapshot for watchlist stamp, using latest"
            );
            snapshots
                .latest()?
                .context("no snapshots stored, nothing to take store ids from")?
        }
    };

    let client = http_client(cli)?;
    let details = SteamDetailSource::new(client, cli.detail_url.clone());
    let mut ctx = Context {
        snapshots: &snapshots,
        artifacts: &artifacts,
        cache: EnrichmentCache::load(&cli.cache),
        details: &details,
        mailer: None,
        pacer: Pacer::new(cli.delay()),
    };
    let stats = pipeline::enrich(&mut ctx, &watchlist, &snapshot.items).await?;
    println!("Watchlist: {}", watchlist.path.display());
    print_enrich_stats(&stats);
    Ok(())
}

async fn notify(cli: &Cli) -> Result<()> {
    let client = http_client(cli)?;
    let mailer = build_mailer(cli, &client);
    let artifacts = ArtifactStore::new(&cli.out_dir);
    let outcome =
        pipeline::notify_latest(&artifacts, mailer.as_ref().map(|m| m as &dyn Mailer)).await;
    println!("Notification: {}", describe(&outcome));
    if let NotifyOutcome::Failed { detail, .. } = outcome {
        bail!("notification failed: {detail}");
    }
    Ok(())
}

fn show_diff(cli: &Cli, args: &DiffArgs) -> Result<()> {
    let snapshots = FileSnapshotStore::new(&cli.data_dir);
    let stamps = snapshots.stamps()?;
    let Some((current, earlier)) = stamps.split_last() else {
        bail!("no snapshots in {}", cli.data_dir.display());
    };

    let current = snapshots.load(current)?;
    let previous: Option<Snapshot> = earlier.last().map(|s| snapshots.load(s)).transpose()?;
    let outcome = diff(
        &current.items,
        previous.as_ref().map_or(&[][..], |p| p.items.as_slice()),
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("serializing diff")?
        );
    } else {
        let against = previous.as_ref().map(Snapshot::stamp);
        print_diff(&current.stamp(), against.as_deref(), &outcome);
    }
    Ok(())
}

fn list_snapshots(cli: &Cli) -> Result<()> {
    let snapshots = FileSnapshotStore::new(&cli.data_dir);
    let stamps = snapshots.stamps()?;
    if stamps.is_empty() {
        println!("No snapshots in {}", cli.data_dir.display());
        return Ok(());
    }
    for stamp in &stamps {
        let snapshot = snapshots.load(stamp)?;
        println!(
            "{stamp}  {}  {} items",
            snapshot.captured_at.format("%Y-%m-%d %H:%M:%S UTC"),
            snapshot.items.len()
        );
    }
    Ok(())
}

// ── Output ──

fn describe(outcome: &NotifyOutcome) -> String {
    match outcome {
        NotifyOutcome::Sent => "sent".to_string(),
        NotifyOutcome::Skipped(reason) => format!("skipped ({})", reason.code()),
        NotifyOutcome::Failed { reason, detail } => format!("failed ({}): {detail}", reason.code()),
    }
}

fn print_run_summary(summary: &RunSummary) {
    println!("Snapshot:   {} ({} items)", summary.stamp, summary.items);
    if summary.is_baseline {
        println!("Baseline run, nothing to compare against.");
    } else {
        println!("New:        {}", summary.new_entries);
        println!("Risers:     {}", summary.risers);
    }
    println!("Report:     {}", summary.report.display());
    println!("Watchlist:  {}", summary.watchlist.display());
    if let Some(stats) = &summary.enrichment {
        print_enrich_stats(stats);
    }
    if let Some(outcome) = &summary.notification {
        println!("Notification: {}", describe(outcome));
    }
}

fn print_enrich_stats(stats: &EnrichStats) {
    println!(
        "Enriched:   {} ({} from cache), {} unavailable, {} without store id, {} not written",
        stats.merged, stats.cached, stats.unavailable, stats.no_external_id, stats.unwritten
    );
}

fn print_diff(current: &str, against: Option<&str>, outcome: &DiffOutcome) {
    let Some(against) = against else {
        println!("{current}: baseline, no earlier snapshot");
        return;
    };
    println!("{current} vs {against}");
    if outcome.is_empty() {
        println!("  no changes");
        return;
    }
    for item in &outcome.new_entries {
        println!("  NEW   #{:<4} {}", item.rank, item.identifier);
    }
    for riser in &outcome.risers {
        println!(
            "  UP {:>3} #{:<4} {} (was #{})",
            riser.change, riser.item.rank, riser.item.identifier, riser.previous_rank
        );
    }
}
