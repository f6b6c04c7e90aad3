//! `quarry sync`

use std::collections::HashMap;
use std::sync::Arc;

use quarry_config::RemoteSection;
use quarry_core::QuarryResult;
use quarry_registry::{AuthConfig, RegistryClient, RetryConfig};
use quarry_store::Repository;
use quarry_sync::{synchronize, SyncOptions};

use super::{interrupt_token, CommandContext};

pub async fn execute(mirror: bool, ctx: &CommandContext) -> QuarryResult<()> {
    let mut overrides = HashMap::new();
    if mirror {
        overrides.insert("mirror".to_string(), "true".to_string());
    }
    let (config, _) = ctx.load_config(overrides).await?;
    let remote = config.remote()?;
    let options = sync_options(remote)?;
    let mirror = options.mirror;

    let client = RegistryClient::with_config(auth(remote), RetryConfig::default())?;
    let repository = Repository::open(&config.repository.path)?;

    ctx.output.info(&format!("Syncing {} into {}", remote.url, config.repository.path));
    let outcome = synchronize(Arc::new(client), &repository, options, interrupt_token()).await?;

    if !outcome.committed {
        ctx.output.success(&format!("Already up to date (version {})", outcome.version));
        return Ok(());
    }
    ctx.output.success(&format!(
        "Committed version {}: {} added, {} removed",
        outcome.version, outcome.added, outcome.removed
    ));

    if mirror && outcome.removed > 0 {
        let referenced = repository.inventory()?.referenced_hashes();
        let gc = repository.cas().garbage_collect(&referenced)?;
        ctx.output.info(&format!(
            "Removed {} unreferenced artifacts ({})",
            gc.entries_removed,
            gc.format_freed_space()
        ));
    }
    Ok(())
}

pub fn sync_options(remote: &RemoteSection) -> QuarryResult<SyncOptions> {
    let mut options = SyncOptions::new(remote.parsed_url()?);
    options.includes = remote.includes_filter()?;
    options.excludes = remote.excludes_filter()?;
    options.prereleases = remote.prereleases;
    options.policy = remote.policy;
    options.mirror = remote.mirror;
    options.concurrency = remote.concurrency;
    options.on_info_error = remote.on_info_error;
    Ok(options)
}

fn auth(remote: &RemoteSection) -> Option<AuthConfig> {
    if remote.token.is_none() && remote.username.is_none() {
        return None;
    }
    Some(AuthConfig {
        token: remote.token.clone(),
        username: remote.username.clone(),
        password: remote.password.clone(),
    })
}
