//! Configuration: per-invocation environment settings and the local platform file.
//!
//! Invocation settings are environment-style key/value pairs read once at start-up.
//! Required keys fail fast with [`ConfigError::Missing`] before any work is done;
//! an empty value counts as missing.
//!
//! The platform file (TOML) describes the local stand-ins for the managed services:
//! where the object store and catalog live, where the job-run ledger goes, and which
//! jobs the runner knows about.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage::Location;

pub const TICKER: &str = "TICKER";
pub const BUCKET_NAME: &str = "BUCKET_NAME";
pub const GLUE_JOB_NAME: &str = "GLUE_JOB_NAME";

/// Ticker used when `TICKER` is not set.
pub const DEFAULT_TICKER: &str = "PETR4.SA";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting '{key}' is not set")]
    Missing { key: String },

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Read the process environment.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Extractor settings: which ticker to pull and which bucket holds the raw zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorSettings {
    pub ticker: String,
    pub bucket: String,
}

impl ExtractorSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bucket = required(&lookup, BUCKET_NAME)?;
        // Validate early so a bad bucket fails before the fetch
        Location::new(bucket.as_str(), "").map_err(|e| ConfigError::Invalid {
            key: BUCKET_NAME.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            ticker: optional(&lookup, TICKER).unwrap_or_else(|| DEFAULT_TICKER.to_string()),
            bucket,
        })
    }
}

/// Job starter settings: the job to launch for each notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStarterSettings {
    pub job_name: String,
}

impl JobStarterSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            job_name: required(&lookup, GLUE_JOB_NAME)?,
        })
    }
}

/// A job the local runner can start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Arguments merged under every run's own arguments (`--NAME` keys).
    #[serde(default)]
    pub default_arguments: BTreeMap<String, String>,
}

/// Local platform layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Root directory of the filesystem object store.
    pub storage_root: PathBuf,

    /// Root directory of the file catalog.
    pub catalog_root: PathBuf,

    /// JSONL file recording job-run state transitions.
    pub run_ledger: PathBuf,

    /// Jobs known to the local runner, by name.
    pub jobs: BTreeMap<String, JobDefinition>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("lake"),
            catalog_root: PathBuf::from("lake/_catalog"),
            run_ledger: PathBuf::from("lake/_runs/job_runs.jsonl"),
            jobs: BTreeMap::new(),
        }
    }
}

impl PlatformConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn extractor_defaults_ticker() {
        let settings = ExtractorSettings::from_lookup(lookup(&[(BUCKET_NAME, "quotes")])).unwrap();
        assert_eq!(settings.ticker, "PETR4.SA");
        assert_eq!(settings.bucket, "quotes");
    }

    #[test]
    fn extractor_requires_bucket() {
        let err = ExtractorSettings::from_lookup(lookup(&[(TICKER, "VALE3.SA")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key } if key == BUCKET_NAME));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = JobStarterSettings::from_lookup(lookup(&[(GLUE_JOB_NAME, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn bucket_with_slash_is_invalid() {
        let err = ExtractorSettings::from_lookup(lookup(&[(BUCKET_NAME, "a/b")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn platform_config_parses_jobs() {
        let config = PlatformConfig::from_toml(
            r#"
storage_root = "/var/lake"

[jobs.refine-quotes.default_arguments]
"--REFINED_BUCKET_PATH" = "s3://quotes/refined/"
"--GLUE_CATALOG_DB_NAME" = "market"
"--GLUE_CATALOG_TABLE_NAME" = "quotes_refined"
"#,
        )
        .unwrap();

        assert_eq!(config.storage_root, PathBuf::from("/var/lake"));
        assert_eq!(config.catalog_root, PathBuf::from("lake/_catalog"));
        let job = &config.jobs["refine-quotes"];
        assert_eq!(job.default_arguments["--GLUE_CATALOG_DB_NAME"], "market");
    }

    #[test]
    fn missing_platform_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlatformConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, PlatformConfig::default());
    }
}
