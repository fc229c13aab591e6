//! Run pipeline: capture → diff → render → enrich → notify.
//!
//! Only capture can fail the run. Enrichment and notification degrade to
//! log lines and counters.

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use wishwatch_core::{
    DiffOutcome, RankedItem, Snapshot, diff, is_pending, merge, render_report, render_watchlist,
};
use wishwatch_store::{Artifact, ArtifactKind, ArtifactStore, EnrichmentCache, SnapshotStore};
use wishwatch_sync::{DetailSource, Mailer, NotifyOutcome, NotifyReason, Pacer, dispatch};

/// Collaborators for one run.
pub struct Context<'a> {
    pub snapshots: &'a dyn SnapshotStore,
    pub artifacts: &'a ArtifactStore,
    pub cache: EnrichmentCache,
    pub details: &'a dyn DetailSource,
    pub mailer: Option<&'a dyn Mailer>,
    pub pacer: Pacer,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub enrich: bool,
    pub notify: bool,
}

/// A stored snapshot and its diff against the previous one.
#[derive(Debug)]
pub struct Captured {
    pub snapshot: Snapshot,
    pub outcome: DiffOutcome,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnrichStats {
    /// Rows filled in, from the cache or a lookup.
    pub merged: usize,
    /// Of `merged`, rows filled from the cache.
    pub cached: usize,
    /// Lookups that returned nothing usable.
    pub unavailable: usize,
    /// Items with no store id to look up.
    pub no_external_id: usize,
    /// Records with no pending row to land in.
    pub missed: usize,
    /// Merges lost because the watchlist could not be rewritten.
    pub unwritten: usize,
}

#[derive(Debug)]
pub struct RunSummary {
    pub stamp: String,
    pub items: usize,
    pub is_baseline: bool,
    pub new_entries: usize,
    pub risers: usize,
    pub report: PathBuf,
    pub watchlist: PathBuf,
    pub enrichment: Option<EnrichStats>,
    pub notification: Option<NotifyOutcome>,
}

/// Full pipeline for one chart capture.
pub async fn run(
    ctx: &mut Context<'_>,
    items: Vec<RankedItem>,
    now: DateTime<Utc>,
    opts: RunOptions,
) -> anyhow::Result<RunSummary> {
    let captured = capture(ctx.snapshots, items, now)?;
    let (report, watchlist) = render(ctx.artifacts, &captured, &ctx.cache)?;

    let enrichment = if opts.enrich && !captured.outcome.is_empty() {
        let flagged: Vec<RankedItem> = captured.outcome.flagged().cloned().collect();
        match enrich(ctx, &watchlist, &flagged).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "enrichment aborted");
                None
            }
        }
    } else {
        None
    };

    let notification = if opts.notify {
        Some(notify_latest(ctx.artifacts, ctx.mailer).await)
    } else {
        None
    };

    Ok(RunSummary {
        stamp: captured.snapshot.stamp(),
        items: captured.snapshot.items.len(),
        is_baseline: captured.outcome.is_baseline,
        new_entries: captured.outcome.new_entries.len(),
        risers: captured.outcome.risers.len(),
        report: report.path,
        watchlist: watchlist.path,
        enrichment,
        notification,
    })
}

/// Validate the chart, diff it against the latest stored snapshot and store it.
///
/// An invalid chart fails before anything is written.
pub fn capture(
    snapshots: &dyn SnapshotStore,
    items: Vec<RankedItem>,
    now: DateTime<Utc>,
) -> anyhow::Result<Captured> {
    let snapshot = Snapshot::capture(now, items).context("rejecting current chart")?;
    let previous = snapshots.latest().context("reading previous snapshot")?;
    let outcome = diff(
        &snapshot.items,
        previous.as_ref().map_or(&[][..], |p| p.items.as_slice()),
    );
    snapshots.append(&snapshot).context("storing current snapshot")?;

    info!(
        stamp = %snapshot.stamp(),
        items = snapshot.items.len(),
        baseline = outcome.is_baseline,
        new_entries = outcome.new_entries.len(),
        risers = outcome.risers.len(),
        "captured chart"
    );
    Ok(Captured { snapshot, outcome })
}

/// Write the report and the watchlist for a capture.
pub fn render(
    artifacts: &ArtifactStore,
    captured: &Captured,
    cache: &EnrichmentCache,
) -> anyhow::Result<(Artifact, Artifact)> {
    let stamp = captured.snapshot.stamp();
    let report = artifacts
        .write(
            ArtifactKind::Report,
            &stamp,
            &render_report(&captured.snapshot),
        )
        .context("writing report")?;
    let watchlist = artifacts
        .write(
            ArtifactKind::Watchlist,
            &stamp,
            &render_watchlist(&captured.outcome, captured.snapshot.captured_at, &cache.known()),
        )
        .context("writing watchlist")?;
    Ok((report, watchlist))
}

/// Fill pending watchlist rows for `candidates`, one item at a time.
///
/// Each successful merge is written back immediately, so an interrupted
/// run keeps the rows it already resolved.
pub async fn enrich(
    ctx: &mut Context<'_>,
    watchlist: &Artifact,
    candidates: &[RankedItem],
) -> anyhow::Result<EnrichStats> {
    let mut text = ctx.artifacts.read(watchlist).context("reading watchlist")?;
    let mut stats = EnrichStats::default();

    for item in candidates {
        if !is_pending(&text, &item.identifier) {
            continue;
        }

        let (record, from_cache) = match ctx.cache.get(&item.identifier) {
            Some(cached) => (cached.clone(), true),
            None => {
                let Some(external_id) = item.external_id.as_deref() else {
                    stats.no_external_id += 1;
                    warn!(identifier = %item.identifier, "no store id, leaving Unknown");
                    continue;
                };
                ctx.pacer.wait().await;
                let record = ctx.details.lookup(&item.identifier, external_id).await;
                if record.is_unknown() {
                    stats.unavailable += 1;
                    continue;
                }
                (record, false)
            }
        };

        let merged = merge(&text, &record);
        if !merged.matched {
            stats.missed += 1;
            warn!(identifier = %item.identifier, "no pending row for record");
            continue;
        }
        if let Err(e) = ctx.artifacts.rewrite(watchlist, &merged.text) {
            stats.unwritten += 1;
            warn!(
                identifier = %item.identifier,
                error = %e,
                "could not write enriched watchlist"
            );
            continue;
        }
        text = merged.text;
        ctx.cache.insert(record);
        stats.merged += 1;
        if from_cache {
            stats.cached += 1;
        }
    }

    if let Err(e) = ctx.cache.save() {
        warn!(error = %e, "could not save enrichment cache");
    }
    info!(
        merged = stats.merged,
        cached = stats.cached,
        unavailable = stats.unavailable,
        no_external_id = stats.no_external_id,
        missed = stats.missed,
        unwritten = stats.unwritten,
        "enrichment finished"
    );
    Ok(stats)
}

/// Send the most recent watchlist, if any.
pub async fn notify_latest(
    artifacts: &ArtifactStore,
    mailer: Option<&dyn Mailer>,
) -> NotifyOutcome {
    if mailer.is_none() {
        return dispatch(None, None).await;
    }
    let latest = match artifacts.latest(ArtifactKind::Watchlist) {
        Ok(latest) => latest,
        Err(e) => {
            warn!(error = %e, "could not list watchlists");
            return NotifyOutcome::Skipped(NotifyReason::NoWatchlist);
        }
    };
    let loaded = match latest {
        Some(artifact) => match artifacts.read(&artifact) {
            Ok(text) => Some((artifact.stamp, text)),
            Err(e) => {
                warn!(error = %e, "could not read watchlist");
                None
            }
        },
        None => None,
    };
    dispatch(
        mailer,
        loaded.as_ref().map(|(stamp, text)| (stamp.as_str(), text.as_str())),
    )
    .await
}
