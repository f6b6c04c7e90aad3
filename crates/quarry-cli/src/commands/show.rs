//! `quarry show`: print the record extracted from a gem archive

use camino::Utf8PathBuf;
use quarry_core::{PackageRecord, QuarryError, QuarryResult};
use quarry_index::{extract, ClassRegistry};

use super::CommandContext;

pub async fn execute(file: Utf8PathBuf, ctx: &CommandContext) -> QuarryResult<()> {
    let record = read_record(&ctx.resolve(&file)).await?;
    println!("{}", to_json(&record)?);
    Ok(())
}

pub async fn read_record(path: &camino::Utf8Path) -> QuarryResult<PackageRecord> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| QuarryError::io(format!("Failed to read {}", path), e))?;
    Ok(extract(&bytes, &ClassRegistry::rubygems())?.record)
}

pub fn to_json(record: &PackageRecord) -> QuarryResult<String> {
    serde_json::to_string_pretty(record)
        .map_err(|e| QuarryError::codec(format!("failed to encode record: {}", e)))
}
