//! `quarry add`: import local gem archives

use std::collections::HashMap;

use camino::Utf8PathBuf;
use quarry_core::{QuarryError, QuarryResult};
use quarry_index::{extract, ClassRegistry};
use quarry_store::Repository;
use tracing::debug;

use super::CommandContext;

pub async fn execute(files: Vec<Utf8PathBuf>, ctx: &CommandContext) -> QuarryResult<()> {
    let (config, _) = ctx.load_config(HashMap::new()).await?;
    let repository = Repository::open(&config.repository.path)?;
    let registry = ClassRegistry::rubygems();

    let mut units = repository.inventory()?.units;
    let mut added = 0;

    for file in files {
        let path = ctx.resolve(&file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| QuarryError::io(format!("Failed to read {}", path), e))?;
        let extracted = extract(&bytes, &registry)?;
        let key = extracted.record.key();

        if let Some(existing) = units.iter().find(|unit| unit.key() == key) {
            if existing.record.checksum.eq_ignore_ascii_case(&extracted.record.checksum) {
                ctx.output.info(&format!("{} is already in the repository", key));
                continue;
            }
            return Err(QuarryError::validation(
                "gem",
                key.to_string(),
                "already in the repository with a different checksum",
            ));
        }

        debug!(gem = %key, %path, "importing");
        units.push(repository.import(extracted.record, &bytes, &extracted.gemspec)?);
        ctx.output.success(&format!("Added {}", key));
        added += 1;
    }

    if added > 0 {
        let inventory = repository.commit(units)?;
        ctx.output.success(&format!(
            "Committed version {} ({} gems)",
            inventory.version,
            inventory.len()
        ));
    }
    Ok(())
}
