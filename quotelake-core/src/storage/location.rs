//! Object-store locations (`s3://bucket/key`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::StorageError;

const SCHEME: &str = "s3://";

/// A fully-qualified object-store location.
///
/// The key never starts with `/`. A key ending in `/` (or an empty key) names a prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    bucket: String,
    key: String,
}

impl Location {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        if bucket.is_empty() || bucket.contains('/') || is_dot_segment(&bucket) {
            return Err(StorageError::InvalidLocation(format!(
                "invalid bucket name '{bucket}'"
            )));
        }
        let key = key.into().trim_start_matches('/').to_string();
        if key.split('/').any(is_dot_segment) {
            return Err(StorageError::InvalidLocation(format!(
                "key '{key}' contains a '.' or '..' segment"
            )));
        }
        Ok(Self { bucket, key })
    }

    /// Parse `s3://bucket/key`.
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let rest = uri.strip_prefix(SCHEME).ok_or_else(|| {
            StorageError::InvalidLocation(format!("'{uri}' is not an {SCHEME} URI"))
        })?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        Self::new(bucket, key)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a relative key, inserting exactly one `/` between the parts.
    pub fn join(&self, relative: &str) -> Location {
        let relative = relative.trim_start_matches('/');
        let key = if self.key.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{relative}", self.key.trim_end_matches('/'))
        };
        Location {
            bucket: self.bucket.clone(),
            key,
        }
    }

    /// The same location viewed as a prefix (key ends with `/` unless empty).
    pub fn as_prefix(&self) -> Location {
        let key = if self.key.is_empty() || self.key.ends_with('/') {
            self.key.clone()
        } else {
            format!("{}/", self.key)
        };
        Location {
            bucket: self.bucket.clone(),
            key,
        }
    }

    /// True if this location's key has a `.parquet` extension.
    pub fn is_parquet(&self) -> bool {
        self.key.ends_with(".parquet")
    }
}

/// `.` and `..` have no object-store meaning and would be resolved by a filesystem.
pub(crate) fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
    }
}

impl FromStr for Location {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.to_string()
    }
}
