//! Parameters of one sync run

use quarry_core::{DownloadPolicy, InfoErrorPolicy, PackageFilter, QuarryError};
use url::Url;

use crate::SyncResult;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Root of the remote compact index
    pub remote_url: Url,
    /// When set, only listed names are synced
    pub includes: Option<PackageFilter>,
    pub excludes: Option<PackageFilter>,
    pub prereleases: bool,
    pub policy: DownloadPolicy,
    /// Remove local content that is no longer upstream
    pub mirror: bool,
    /// Maximum concurrent `info` fetches and downloads
    pub concurrency: usize,
    pub on_info_error: InfoErrorPolicy,
}

impl SyncOptions {
    pub fn new(remote_url: Url) -> Self {
        Self {
            remote_url,
            includes: None,
            excludes: None,
            prereleases: false,
            policy: DownloadPolicy::default(),
            mirror: false,
            concurrency: 8,
            on_info_error: InfoErrorPolicy::default(),
        }
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.concurrency == 0 {
            return Err(QuarryError::configuration(
                "remote.concurrency",
                "must be at least 1",
            ));
        }
        if !matches!(self.remote_url.scheme(), "http" | "https") {
            return Err(QuarryError::configuration(
                "remote.url",
                format!("unsupported scheme '{}'", self.remote_url.scheme()),
            ));
        }
        Ok(())
    }
}
