//! `quarry publish`

use std::collections::HashMap;

use camino::Utf8PathBuf;
use quarry_core::QuarryResult;
use quarry_publish::Publisher;
use quarry_store::Repository;

use super::{interrupt_token, CommandContext};

pub async fn execute(output: Option<Utf8PathBuf>, ctx: &CommandContext) -> QuarryResult<()> {
    let mut overrides = HashMap::new();
    if let Some(output) = output {
        overrides.insert("output".to_string(), ctx.resolve(&output).to_string());
    }
    let (config, _) = ctx.load_config(overrides).await?;
    let repository = Repository::open(&config.repository.path)?;

    let report = Publisher::new(&repository)
        .with_cancellation(interrupt_token())
        .publish(&config.publish.output)?;

    ctx.output.success(&format!(
        "Published version {} to {}: {} gems under {} names",
        report.version, report.output, report.packages, report.names
    ));
    if report.missing_artifacts > 0 {
        ctx.output.warn(&format!(
            "{} artifacts are indexed but not stored yet",
            report.missing_artifacts
        ));
    }
    Ok(())
}
