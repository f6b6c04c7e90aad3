//! Remote repository synchronization
//!
//! A sync runs as a two-stage pipeline. The first stage fetches the remote
//! `versions` file, filters it, fetches `info/<name>` for each surviving
//! name and emits [`DeclarativeContent`] units over a bounded channel. The
//! [`VersionBuilder`] drains the channel, diffs the units against the
//! committed inventory and, when anything changed, downloads the new
//! artifacts and commits the next repository version.

pub mod builder;
pub mod content;
pub mod delta;
pub mod options;
pub mod plan;
pub mod stage;

pub use builder::{SyncOutcome, VersionBuilder};
pub use content::{DeclarativeArtifact, DeclarativeContent};
pub use delta::ContentDelta;
pub use options::SyncOptions;
pub use plan::{plan_versions, select_versions, NamePlan};
pub use stage::{FirstStage, StageReport};

use std::collections::HashSet;
use std::sync::Arc;

use quarry_core::QuarryError;
use quarry_registry::Fetcher;
use quarry_store::Repository;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, QuarryError>;

/// Run a full sync of `repository` against the remote in `options`.
///
/// Nothing is committed unless both stages succeed.
pub async fn synchronize(
    fetcher: Arc<dyn Fetcher>,
    repository: &Repository,
    options: SyncOptions,
    cancel: CancellationToken,
) -> SyncResult<SyncOutcome> {
    options.validate()?;
    info!(remote = %options.remote_url, mirror = options.mirror, "starting sync");

    let mirror = options.mirror;
    let builder = VersionBuilder::new(repository, fetcher.clone(), options.concurrency);
    let (mut receiver, handle) = FirstStage::new(fetcher, options, cancel.clone()).spawn();

    let mut remote = Vec::new();
    while let Some(unit) = receiver.recv().await {
        remote.push(unit);
    }

    let report = handle.await.map_err(|e| {
        QuarryError::io(
            "sync stage terminated abnormally".to_string(),
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        )
    })??;
    info!(
        names = report.names_selected,
        units = report.units_emitted,
        skipped = report.skipped_names.len(),
        "remote index processed"
    );

    if cancel.is_cancelled() {
        return Err(QuarryError::Cancelled);
    }

    // Names skipped after an info failure keep their local units
    let unlisted: HashSet<String> = report.skipped_names.into_iter().collect();
    builder.build(remote, mirror, &unlisted).await
}
