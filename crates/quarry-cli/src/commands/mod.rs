//! Command implementations and dispatch logic.
//!
//! Each command is implemented as an async function that takes a
//! CommandContext.

use std::collections::HashMap;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use quarry_config::{ConfigLayering, ConfigLoader, ConfigSource, QuarryToml};
use quarry_core::{QuarryError, QuarryResult};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod add;
pub mod publish;
pub mod show;
pub mod sync;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    /// `--config`, if given
    pub config_path: Option<Utf8PathBuf>,
    pub output: OutputHandler,
}

impl CommandContext {
    pub fn new(config_path: Option<PathBuf>) -> QuarryResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| QuarryError::io("Failed to get current directory".to_string(), e))?;

        Ok(Self {
            cwd: utf8(cwd)?,
            config_path: config_path.map(utf8).transpose()?,
            output: OutputHandler::new(),
        })
    }

    /// Load quarry.toml with `QUARRY_*` and command-line overrides applied
    pub async fn load_config(
        &self,
        cli_overrides: HashMap<String, String>,
    ) -> QuarryResult<(QuarryToml, ConfigSource)> {
        let loader = ConfigLoader::new(self.cwd.clone());
        let (config, source) = loader.load(self.config_path.as_deref()).await?;
        let env_overrides = ConfigLayering::collect_env_overrides();
        let merged = ConfigLayering::merge_configs(config, &env_overrides, &cli_overrides)?;
        Ok((merged, source))
    }

    /// Resolve a command-line path against the working directory
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.cwd.join(path)
    }
}

pub fn utf8(path: PathBuf) -> QuarryResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| {
        QuarryError::validation("path", path.display().to_string(), "path is not valid UTF-8")
    })
}

/// A token cancelled on Ctrl-C
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current step");
            child.cancel();
        }
    });
    token
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> QuarryResult<()> {
    match command {
        Commands::Sync { mirror } => {
            info!("Synchronizing repository (mirror: {})", mirror);
            sync::execute(mirror, ctx).await
        },
        Commands::Add { files } => {
            let files = files.into_iter().map(utf8).collect::<QuarryResult<Vec<_>>>()?;
            add::execute(files, ctx).await
        },
        Commands::Publish { output } => {
            let output = output.map(utf8).transpose()?;
            publish::execute(output, ctx).await
        },
        Commands::Show { file } => show::execute(utf8(file)?, ctx).await,
        Commands::Check => check_config(ctx).await,
        Commands::Version => show_version(ctx).await,
    }
}

async fn check_config(ctx: &CommandContext) -> QuarryResult<()> {
    let (config, source) = ctx.load_config(HashMap::new()).await?;

    ctx.output.info(&format!("Configuration: {}", source.path()));
    ctx.output.info(&format!("Repository: {}", config.repository.path));
    ctx.output.info(&format!("Publish output: {}", config.publish.output));
    match &config.remote {
        Some(remote) => {
            ctx.output.info(&format!("Remote: {} ({} policy)", remote.url, remote.policy));
            if let Some(includes) = remote.includes_filter()? {
                ctx.output.info(&format!("Includes: {} gems", includes.len()));
            }
            if let Some(excludes) = remote.excludes_filter()? {
                ctx.output.info(&format!("Excludes: {} gems", excludes.len()));
            }
        },
        None => ctx.output.warn("No [remote] section; sync is unavailable"),
    }
    ctx.output.success("Configuration is valid");
    Ok(())
}

async fn show_version(ctx: &CommandContext) -> QuarryResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build_date = env!("BUILD_DATE");
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.info(&format!("Quarry v{}", version));
    ctx.output.info(&format!("Built: {}", build_date));
    ctx.output.info(&format!("Target: {}", target));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));

    Ok(())
}
