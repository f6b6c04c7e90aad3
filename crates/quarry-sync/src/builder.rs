//! Turns declarative content into a committed repository version.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use quarry_core::utils::ExpectedDigest;
use quarry_registry::Fetcher;
use quarry_store::{ContentHash, ContentUnit, Repository, StoredArtifact};
use tracing::{debug, info};

use crate::content::{DeclarativeArtifact, DeclarativeContent};
use crate::delta::ContentDelta;
use crate::SyncResult;

/// What a sync changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The repository version after the sync
    pub version: u64,
    pub added: usize,
    pub removed: usize,
    /// False when the remote matched the inventory and nothing was written
    pub committed: bool,
}

pub struct VersionBuilder<'a> {
    repository: &'a Repository,
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
}

impl<'a> VersionBuilder<'a> {
    pub fn new(repository: &'a Repository, fetcher: Arc<dyn Fetcher>, concurrency: usize) -> Self {
        Self {
            repository,
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Reconcile `remote` with the inventory and commit if anything changed.
    ///
    /// Local units of `unlisted` names survive a mirror sync.
    pub async fn build(
        &self,
        remote: Vec<DeclarativeContent>,
        mirror: bool,
        unlisted: &HashSet<String>,
    ) -> SyncResult<SyncOutcome> {
        let inventory = self.repository.inventory()?;
        let delta = ContentDelta::compute(remote, &inventory, mirror, unlisted);

        if delta.is_empty() {
            info!(version = inventory.version, "repository already up to date");
            return Ok(SyncOutcome {
                version: inventory.version,
                added: 0,
                removed: 0,
                committed: false,
            });
        }

        let removed = delta.to_remove.len();
        let mut units = delta.retained(&inventory);
        let added: Vec<ContentUnit> = stream::iter(delta.to_add)
            .map(|content| self.materialize(content))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        let added_count = added.len();
        units.extend(added);

        let next = self.repository.commit(units)?;
        Ok(SyncOutcome {
            version: next.version,
            added: added_count,
            removed,
            committed: true,
        })
    }

    async fn materialize(&self, content: DeclarativeContent) -> SyncResult<ContentUnit> {
        let mut artifacts = Vec::with_capacity(content.artifacts.len());
        for artifact in &content.artifacts {
            let sha256 = if content.deferred {
                None
            } else {
                Some(self.download(artifact).await?)
            };
            artifacts.push(StoredArtifact::new(artifact.relative_path.clone(), sha256));
        }
        debug!(gem = %content.key(), deferred = content.deferred, "materialized unit");
        Ok(ContentUnit::new(content.record, artifacts))
    }

    /// Store one artifact, skipping the fetch when a pinned digest is already stored
    async fn download(&self, artifact: &DeclarativeArtifact) -> SyncResult<ContentHash> {
        let cas = self.repository.cas();
        if let Some(ExpectedDigest::Sha256(hex)) = &artifact.expected {
            let stored = ContentHash::from_hex(hex).ok().filter(|hash| cas.contains(hash));
            if let Some(hash) = stored {
                debug!(path = %artifact.relative_path, "already stored");
                return Ok(hash);
            }
        }

        let bytes = self
            .fetcher
            .fetch(artifact.url.as_str(), artifact.expected.as_ref())
            .await?;
        cas.store(&bytes)
    }
}
