//! Storage layer: timestamped snapshots, rendered artifacts, enrichment cache.

mod error;
mod files;

pub use error::StoreError;

pub mod artifact;
pub mod cache;
pub mod snapshot;

pub use artifact::{Artifact, ArtifactKind, ArtifactStore};
pub use cache::EnrichmentCache;
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
