//! The first sync stage: remote index in, declarative content out.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use quarry_core::utils::ExpectedDigest;
use quarry_core::{DownloadPolicy, InfoErrorPolicy, PackageRecord, QuarryError};
use quarry_index::compact::{decode_info, decode_versions};
use quarry_registry::{join_url, Fetcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::content::DeclarativeContent;
use crate::options::SyncOptions;
use crate::plan::{plan_versions, NamePlan};
use crate::SyncResult;

const VERSIONS_PATH: &str = "versions";
const CHANNEL_CAPACITY_PER_WORKER: usize = 64;

/// Counters for one run of the stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Distinct names in the remote `versions` file
    pub names_seen: usize,
    /// Names with at least one version left after filtering
    pub names_selected: usize,
    pub units_emitted: usize,
    /// Names whose `info` fetch failed under the skip policy
    pub skipped_names: Vec<String>,
}

pub struct FirstStage {
    fetcher: Arc<dyn Fetcher>,
    options: SyncOptions,
    cancel: CancellationToken,
}

impl FirstStage {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: SyncOptions, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            options,
            cancel,
        }
    }

    /// Run on a background task, returning the receiving end of the channel
    pub fn spawn(
        self,
    ) -> (
        mpsc::Receiver<DeclarativeContent>,
        JoinHandle<SyncResult<StageReport>>,
    ) {
        let capacity = self.options.concurrency.max(1) * CHANNEL_CAPACITY_PER_WORKER;
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(async move { self.run(sender).await });
        (receiver, handle)
    }

    /// Fetch, filter and emit. A closed receiver cancels the run.
    pub async fn run(self, sender: mpsc::Sender<DeclarativeContent>) -> SyncResult<StageReport> {
        let remote = &self.options.remote_url;
        let versions_url = join_url(remote, VERSIONS_PATH)?;

        let bytes = self.fetcher.fetch(versions_url.as_str(), None).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| QuarryError::codec(format!("versions file is not UTF-8: {}", e)))?;
        let entries = decode_versions(&text)?;

        let plans = plan_versions(&entries, &self.options);
        let mut report = StageReport {
            names_seen: entries.len(),
            names_selected: plans.len(),
            ..StageReport::default()
        };
        info!(
            names = report.names_seen,
            selected = report.names_selected,
            "filtered remote versions"
        );

        let deferred = self.options.policy == DownloadPolicy::OnDemand;
        let mut infos = stream::iter(plans)
            .map(|plan| self.fetch_info(plan))
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some((name, result)) = infos.next().await {
            if self.cancel.is_cancelled() {
                return Err(QuarryError::Cancelled);
            }

            let records = match result {
                Ok(records) => records,
                Err(error) => match self.options.on_info_error {
                    InfoErrorPolicy::Fail => return Err(error),
                    InfoErrorPolicy::Skip => {
                        warn!(name = %name, error = %error, "skipping gem after info fetch failure");
                        report.skipped_names.push(name);
                        continue;
                    },
                },
            };

            for record in records {
                let unit = DeclarativeContent::from_record(record, remote, deferred)?;
                if sender.send(unit).await.is_err() {
                    return Err(QuarryError::Cancelled);
                }
                report.units_emitted += 1;
            }
        }

        Ok(report)
    }

    async fn fetch_info(&self, plan: NamePlan) -> (String, SyncResult<Vec<PackageRecord>>) {
        let result = self.fetch_info_records(&plan).await;
        (plan.name, result)
    }

    async fn fetch_info_records(&self, plan: &NamePlan) -> SyncResult<Vec<PackageRecord>> {
        if self.cancel.is_cancelled() {
            return Err(QuarryError::Cancelled);
        }

        let url = join_url(&self.options.remote_url, &format!("info/{}", plan.name))?;
        let expected = match &plan.md5 {
            Some(md5) => Some(ExpectedDigest::Md5(md5.clone())),
            None => {
                warn!(name = %plan.name, "versions file has no checksum for info file");
                None
            },
        };

        let bytes = self.fetcher.fetch(url.as_str(), expected.as_ref()).await?;
        let text = String::from_utf8(bytes).map_err(|e| {
            QuarryError::codec(format!("info file for {} is not UTF-8: {}", plan.name, e))
        })?;

        let wanted: HashSet<String> = plan.ext_versions.iter().cloned().collect();
        let records = decode_info(&plan.name, &text, Some(&wanted))?;
        debug!(name = %plan.name, records = records.len(), "decoded info file");
        Ok(records)
    }
}
