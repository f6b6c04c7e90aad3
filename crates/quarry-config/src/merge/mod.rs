//! Configuration discovery and environment/CLI overrides

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use quarry_core::{DownloadPolicy, QuarryError};

use crate::toml::{load_from_file, validate_config, QuarryToml, RemoteSection, CONFIG_FILE};
use crate::ConfigResult;

const ENV_PREFIX: &str = "QUARRY_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// quarry.toml found by walking up from the working directory
    Project(Utf8PathBuf),
    /// Path given on the command line
    Explicit(Utf8PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Utf8Path {
        match self {
            ConfigSource::Project(path) | ConfigSource::Explicit(path) => path,
        }
    }
}

impl ConfigLoader {
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load `explicit` if given, otherwise the nearest quarry.toml.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(QuarryToml, ConfigSource)> {
        let source = match explicit {
            Some(path) => ConfigSource::Explicit(self.cwd.join(path)),
            None => {
                let path = self.resolve_config_path(CONFIG_FILE);
                if !path.exists() {
                    return Err(QuarryError::configuration(
                        "config",
                        format!(
                            "no {} found in {} or its parent directories",
                            CONFIG_FILE, self.cwd
                        ),
                    ));
                }
                ConfigSource::Project(path)
            },
        };

        let mut config = load_from_file(source.path()).await?;
        if let Some(dir) = source.path().parent() {
            config.resolve_paths(dir);
        }
        Ok((config, source))
    }

    /// Find a configuration file by walking up the directory tree.
    ///
    /// Falls back to the path in the working directory.
    pub fn resolve_config_path(&self, filename: &str) -> Utf8PathBuf {
        let mut current = Some(self.cwd.as_path());
        while let Some(dir) = current {
            let candidate = dir.join(filename);
            if candidate.exists() {
                return candidate;
            }
            current = dir.parent();
        }
        self.cwd.join(filename)
    }
}

/// Applies environment and command-line overrides on top of a file
pub struct ConfigLayering;

impl ConfigLayering {
    /// Apply overrides, CLI last, then validate the result
    pub fn merge_configs(
        project_config: QuarryToml,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<QuarryToml> {
        let mut merged = project_config;
        Self::apply_env_overrides(&mut merged, env_overrides)?;
        Self::apply_cli_overrides(&mut merged, cli_overrides)?;
        validate_config(&merged)?;
        Ok(merged)
    }

    fn apply_env_overrides(
        config: &mut QuarryToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "QUARRY_REMOTE_URL" => match &mut config.remote {
                    Some(remote) => remote.url = value.clone(),
                    None => config.remote = Some(RemoteSection::new(value.clone())),
                },
                "QUARRY_REPOSITORY_PATH" => config.repository.path = Utf8PathBuf::from(value),
                "QUARRY_PUBLISH_OUTPUT" => config.publish.output = Utf8PathBuf::from(value),
                "QUARRY_REMOTE_PRERELEASES" => {
                    remote_for(config, key)?.prereleases = parse_bool(key, value)?;
                },
                "QUARRY_REMOTE_POLICY" => {
                    remote_for(config, key)?.policy = value.parse::<DownloadPolicy>()?;
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }
        Ok(())
    }

    fn apply_cli_overrides(
        config: &mut QuarryToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "repository" => config.repository.path = Utf8PathBuf::from(value),
                "output" => config.publish.output = Utf8PathBuf::from(value),
                "mirror" => remote_for(config, "--mirror")?.mirror = parse_bool(key, value)?,
                "remote" => match &mut config.remote {
                    Some(remote) => remote.url = value.clone(),
                    None => config.remote = Some(RemoteSection::new(value.clone())),
                },
                _ => {
                    // Unknown CLI override, ignore
                },
            }
        }
        Ok(())
    }

    /// Collect `QUARRY_*` variables from the process environment
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn remote_for<'c>(config: &'c mut QuarryToml, source: &str) -> ConfigResult<&'c mut RemoteSection> {
    config.remote.as_mut().ok_or_else(|| {
        QuarryError::configuration(
            "remote",
            format!("{} needs a [remote] section or QUARRY_REMOTE_URL", source),
        )
    })
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(QuarryError::configuration(
            key,
            format!("'{}' is not a boolean", value),
        )),
    }
}
