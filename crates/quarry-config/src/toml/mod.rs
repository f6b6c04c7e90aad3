//! quarry.toml configuration parsing and serialization

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use quarry_core::{DownloadPolicy, InfoErrorPolicy, PackageFilter, QuarryError};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigResult;

pub const CONFIG_FILE: &str = "quarry.toml";

const DEFAULT_REPOSITORY_PATH: &str = "repo";
const DEFAULT_OUTPUT: &str = "public";
const DEFAULT_CONCURRENCY: usize = 8;

/// Complete quarry.toml configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarryToml {
    /// Local repository (inventory and content store)
    #[serde(default)]
    pub repository: RepositorySection,

    /// Upstream compact index; only `sync` needs it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSection>,

    #[serde(default)]
    pub publish: PublishSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySection {
    #[serde(default = "default_repository_path")]
    pub path: Utf8PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSection {
    pub url: String,

    #[serde(default)]
    pub policy: DownloadPolicy,

    #[serde(default)]
    pub prereleases: bool,

    /// Remove local content that is no longer upstream
    #[serde(default)]
    pub mirror: bool,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default, rename = "on-info-error")]
    pub on_info_error: InfoErrorPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Name to requirement (`"*"` for every version); absent means everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<IndexMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excludes: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishSection {
    #[serde(default = "default_output")]
    pub output: Utf8PathBuf,
}

fn default_repository_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_REPOSITORY_PATH)
}

fn default_output() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_OUTPUT)
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            path: default_repository_path(),
            name: None,
        }
    }
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

impl RemoteSection {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            policy: DownloadPolicy::default(),
            prereleases: false,
            mirror: false,
            concurrency: DEFAULT_CONCURRENCY,
            on_info_error: InfoErrorPolicy::default(),
            username: None,
            password: None,
            token: None,
            includes: None,
            excludes: None,
        }
    }

    /// The remote root as a URL; http and https only
    pub fn parsed_url(&self) -> ConfigResult<Url> {
        let url = Url::parse(&self.url)
            .map_err(|e| QuarryError::configuration("remote.url", format!("'{}': {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(QuarryError::configuration(
                "remote.url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }

    pub fn includes_filter(&self) -> ConfigResult<Option<PackageFilter>> {
        filter("remote.includes", self.includes.as_ref())
    }

    pub fn excludes_filter(&self) -> ConfigResult<Option<PackageFilter>> {
        filter("remote.excludes", self.excludes.as_ref())
    }
}

fn filter(
    field: &str,
    table: Option<&IndexMap<String, String>>,
) -> ConfigResult<Option<PackageFilter>> {
    table
        .map(|pairs| {
            PackageFilter::from_pairs(pairs.iter().map(|(name, req)| (name.as_str(), req.as_str())))
                .map_err(|e| QuarryError::configuration(field, e.to_string()))
        })
        .transpose()
}

impl QuarryToml {
    /// The remote section, required by `sync`
    pub fn remote(&self) -> ConfigResult<&RemoteSection> {
        self.remote.as_ref().ok_or_else(|| {
            QuarryError::configuration("remote.url", "a [remote] section with a url is required")
        })
    }

    /// Make relative paths relative to `base` (the directory of quarry.toml)
    pub fn resolve_paths(&mut self, base: &Utf8Path) {
        if self.repository.path.is_relative() {
            self.repository.path = base.join(&self.repository.path);
        }
        if self.publish.output.is_relative() {
            self.publish.output = base.join(&self.publish.output);
        }
    }
}

/// Parse TOML string to QuarryToml configuration
pub fn parse_quarry_toml(content: &str) -> ConfigResult<QuarryToml> {
    // toml_edit first, for syntax errors with a location
    content
        .parse::<toml_edit::Document>()
        .map_err(|e| toml_error(content, e.message(), e.span()))?;

    let config: QuarryToml =
        ::toml::from_str(content).map_err(|e| toml_error(content, e.message(), e.span()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize QuarryToml to TOML string
pub fn serialize_quarry_toml(config: &QuarryToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| QuarryError::TomlParse {
        message: format!("serialization failed: {}", e),
        line: 0,
        column: 0,
    })
}

/// Validate configuration completeness before any I/O happens
pub fn validate_config(config: &QuarryToml) -> ConfigResult<()> {
    if config.repository.path.as_str().is_empty() {
        return Err(QuarryError::configuration(
            "repository.path",
            "must not be empty",
        ));
    }
    if config.publish.output.as_str().is_empty() {
        return Err(QuarryError::configuration("publish.output", "must not be empty"));
    }

    if let Some(remote) = &config.remote {
        remote.parsed_url()?;
        if remote.concurrency == 0 {
            return Err(QuarryError::configuration(
                "remote.concurrency",
                "must be at least 1",
            ));
        }
        if remote.password.is_some() && remote.username.is_none() {
            return Err(QuarryError::configuration(
                "remote.password",
                "a password needs a username",
            ));
        }
        remote.includes_filter()?;
        remote.excludes_filter()?;
    }

    Ok(())
}

/// Load and parse quarry.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<QuarryToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| QuarryError::io(format!("Failed to read {}", path), e))?;

    parse_quarry_toml(&content).map_err(|e| match e {
        QuarryError::TomlParse {
            message,
            line,
            column,
        } => QuarryError::TomlParse {
            message: format!("{}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

fn toml_error(content: &str, message: &str, span: Option<std::ops::Range<usize>>) -> QuarryError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));
    QuarryError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}
