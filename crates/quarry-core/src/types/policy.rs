//! Synchronization policies shared by configuration and the synchronizer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuarryError;

/// When remote artifacts are downloaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPolicy {
    /// Download archives and gemspecs during the sync
    #[default]
    Immediate,
    /// Record the artifacts; download them when first requested
    OnDemand,
}

/// What a failed `info/<name>` fetch does to the rest of the sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoErrorPolicy {
    /// Abort the whole sync
    #[default]
    Fail,
    /// Log a warning and carry on with the other names
    Skip,
}

impl FromStr for DownloadPolicy {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(Self::Immediate),
            "on_demand" | "on-demand" => Ok(Self::OnDemand),
            _ => Err(QuarryError::validation(
                "policy",
                s,
                "expected 'immediate' or 'on_demand'",
            )),
        }
    }
}

impl fmt::Display for DownloadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("immediate"),
            Self::OnDemand => f.write_str("on_demand"),
        }
    }
}

impl FromStr for InfoErrorPolicy {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            _ => Err(QuarryError::validation(
                "on-info-error",
                s,
                "expected 'fail' or 'skip'",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policies() {
        assert_eq!("on_demand".parse::<DownloadPolicy>().unwrap(), DownloadPolicy::OnDemand);
        assert_eq!("on-demand".parse::<DownloadPolicy>().unwrap(), DownloadPolicy::OnDemand);
        assert_eq!(DownloadPolicy::default().to_string(), "immediate");
        assert!("lazy".parse::<DownloadPolicy>().is_err());

        assert_eq!("skip".parse::<InfoErrorPolicy>().unwrap(), InfoErrorPolicy::Skip);
        assert_eq!(InfoErrorPolicy::default(), InfoErrorPolicy::Fail);
        assert!("ignore".parse::<InfoErrorPolicy>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let policy: DownloadPolicy = serde_json::from_str("\"on_demand\"").unwrap();
        assert_eq!(policy, DownloadPolicy::OnDemand);
        let policy: InfoErrorPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, InfoErrorPolicy::Skip);
    }
}
