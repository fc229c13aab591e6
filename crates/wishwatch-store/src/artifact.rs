//! Rendered report and watchlist files.
//!
//! Artifacts are written once per run under a stamped name and never
//! deleted. Watchlists are later rewritten in place as enrichment lands.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::StoreError;
use crate::files;

const ARTIFACT_EXT: &str = ".html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Report,
    Watchlist,
}

impl ArtifactKind {
    fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Report => "report_",
            ArtifactKind::Watchlist => "watchlist_",
        }
    }
}

/// A stored artifact: its stamp and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub stamp: String,
    pub path: PathBuf,
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new artifact. Existing artifacts are never overwritten.
    pub fn write(
        &self,
        kind: ArtifactKind,
        stamp: &str,
        contents: &str,
    ) -> Result<Artifact, StoreError> {
        let path = self.dir.join(format!("{}{stamp}{ARTIFACT_EXT}", kind.prefix()));
        files::write_new(&path, contents.as_bytes())?;
        info!(path = %path.display(), ?kind, "wrote artifact");
        Ok(Artifact {
            kind,
            stamp: stamp.to_string(),
            path,
        })
    }

    /// The artifact of `kind` with the greatest stamp.
    pub fn latest(&self, kind: ArtifactKind) -> Result<Option<Artifact>, StoreError> {
        let mut found = files::stamped_files(&self.dir, kind.prefix(), ARTIFACT_EXT)?;
        Ok(found.pop().map(|(stamp, path)| Artifact { kind, stamp, path }))
    }

    pub fn read(&self, artifact: &Artifact) -> Result<String, StoreError> {
        files::read_to_string(&artifact.path)
    }

    /// Replace an artifact's contents in place.
    pub fn rewrite(&self, artifact: &Artifact, contents: &str) -> Result<(), StoreError> {
        files::replace(&artifact.path, contents.as_bytes())
    }
}
