//! The transport seam used by the synchronizer

use std::sync::Arc;

use async_trait::async_trait;
use quarry_core::utils::ExpectedDigest;
use quarry_core::QuarryError;
use url::Url;

use crate::RegistryResult;

/// Fetches one remote resource.
///
/// When `expected` is given the returned bytes have been checked against
/// it; a mismatch is an `IntegrityFailure`. A missing resource is `NotFound`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, expected: Option<&ExpectedDigest>) -> RegistryResult<Vec<u8>>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str, expected: Option<&ExpectedDigest>) -> RegistryResult<Vec<u8>> {
        (**self).fetch(url, expected).await
    }
}

/// Resolve `relative` against a repository root URL.
///
/// The root is treated as a directory whether or not it ends in `/`.
pub fn join_url(base: &Url, relative: &str) -> RegistryResult<Url> {
    let mut root = base.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.join(relative.trim_start_matches('/')).map_err(|e| {
        QuarryError::validation("url", relative, format!("cannot join onto {}: {}", base, e))
    })
}
