//! Table catalog: logical table name → location, schema and partitions.
//!
//! Layout of [`FileCatalog`]:
//! `{root}/{database}/{table}/table.json` and
//! `{root}/{database}/{table}/partitions/{k1=v1}/.../partition.json`
//!
//! Partitions are registered one file each, so runs over different partitions never
//! rewrite each other's entries and registering the same partition again overwrites
//! its entry in place. Every file is written to a temp file and renamed into place.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::storage::Location;

const TABLE_FILE: &str = "table.json";
const PARTITION_FILE: &str = "partition.json";
const PARTITIONS_DIR: &str = "partitions";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog name '{0}'")]
    InvalidName(String),

    #[error("table {database}.{table} does not exist")]
    TableNotFound { database: String, table: String },

    #[error("table {table} is partitioned by {existing:?}, not {requested:?}")]
    PartitionKeyMismatch {
        table: String,
        existing: Vec<String>,
        requested: Vec<String>,
    },

    #[error("partition has {got} values, table has {expected} partition keys")]
    PartitionArity { expected: usize, got: usize },

    #[error("catalog I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog entry {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// What a writer wants the table to look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub database: String,
    pub name: String,
    pub location: Location,
    pub format: String,
    /// Non-partition columns.
    pub columns: Vec<ColumnDef>,
    pub partition_keys: Vec<ColumnDef>,
}

/// What the catalog currently records for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub database: String,
    pub name: String,
    pub location: Location,
    pub format: String,
    pub columns: Vec<ColumnDef>,
    pub partition_keys: Vec<ColumnDef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TableMetadata {
    fn partition_key_names(&self) -> Vec<String> {
        self.partition_keys.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionEntry {
    /// Values in the table's partition-key order.
    pub values: Vec<String>,
    pub location: Location,
    pub row_count: usize,
    pub registered_at: DateTime<Utc>,
}

pub trait Catalog: Send + Sync {
    /// Create the table, or update it in place: new columns are appended, the location
    /// and format follow the definition, `created_at` is preserved.
    fn ensure_table(&self, definition: &TableDefinition) -> Result<TableMetadata, CatalogError>;

    /// Register (or re-register) partitions of an existing table.
    fn add_partitions(
        &self,
        database: &str,
        table: &str,
        partitions: &[PartitionEntry],
    ) -> Result<(), CatalogError>;

    fn get_table(&self, database: &str, table: &str) -> Result<Option<TableMetadata>, CatalogError>;

    /// All registered partitions, sorted by values.
    fn list_partitions(&self, database: &str, table: &str)
        -> Result<Vec<PartitionEntry>, CatalogError>;
}

/// Catalog persisted as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
}

impl FileCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_dir(&self, database: &str, table: &str) -> Result<PathBuf, CatalogError> {
        Ok(self.root.join(valid_name(database)?).join(valid_name(table)?))
    }

    fn partition_dir(&self, table_dir: &Path, keys: &[String], values: &[String]) -> PathBuf {
        let mut dir = table_dir.join(PARTITIONS_DIR);
        for (k, v) in keys.iter().zip(values) {
            dir.push(format!("{k}={v}"));
        }
        dir
    }
}

fn valid_name(name: &str) -> Result<&str, CatalogError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
        return Err(CatalogError::InvalidName(name.to_string()));
    }
    Ok(name)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CatalogError + '_ {
    move |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CatalogError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(io_err(parent))?;

    let json = serde_json::to_string_pretty(value).map_err(|e| CatalogError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let id = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = parent.join(format!(".json.{}-{id}.tmp", std::process::id()));
    fs::write(&tmp_path, json).map_err(io_err(&tmp_path))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(path)(e)
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CatalogError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path)(e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| CatalogError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

impl Catalog for FileCatalog {
    fn ensure_table(&self, definition: &TableDefinition) -> Result<TableMetadata, CatalogError> {
        let path = self
            .table_dir(&definition.database, &definition.name)?
            .join(TABLE_FILE);
        let now = Utc::now();

        let metadata = match read_json::<TableMetadata>(&path)? {
            None => {
                info!(database = %definition.database, table = %definition.name, "creating catalog table");
                TableMetadata {
                    database: definition.database.clone(),
                    name: definition.name.clone(),
                    location: definition.location.clone(),
                    format: definition.format.clone(),
                    columns: definition.columns.clone(),
                    partition_keys: definition.partition_keys.clone(),
                    created_at: now,
                    updated_at: now,
                }
            }
            Some(mut existing) => {
                let requested: Vec<String> =
                    definition.partition_keys.iter().map(|c| c.name.clone()).collect();
                if existing.partition_key_names() != requested {
                    return Err(CatalogError::PartitionKeyMismatch {
                        table: format!("{}.{}", existing.database, existing.name),
                        existing: existing.partition_key_names(),
                        requested,
                    });
                }
                if existing.location != definition.location {
                    warn!(
                        old = %existing.location,
                        new = %definition.location,
                        "table location changed"
                    );
                    existing.location = definition.location.clone();
                }
                for column in &definition.columns {
                    if !existing.columns.iter().any(|c| c.name == column.name) {
                        debug!(column = %column.name, "adding column to catalog table");
                        existing.columns.push(column.clone());
                    }
                }
                existing.format = definition.format.clone();
                existing.updated_at = now;
                existing
            }
        };

        write_json_atomic(&path, &metadata)?;
        Ok(metadata)
    }

    fn add_partitions(
        &self,
        database: &str,
        table: &str,
        partitions: &[PartitionEntry],
    ) -> Result<(), CatalogError> {
        let table_dir = self.table_dir(database, table)?;
        let metadata = self
            .get_table(database, table)?
            .ok_or_else(|| CatalogError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })?;
        let keys = metadata.partition_key_names();

        for partition in partitions {
            if partition.values.len() != keys.len() {
                return Err(CatalogError::PartitionArity {
                    expected: keys.len(),
                    got: partition.values.len(),
                });
            }
            let path = self
                .partition_dir(&table_dir, &keys, &partition.values)
                .join(PARTITION_FILE);
            write_json_atomic(&path, partition)?;
            debug!(values = ?partition.values, "partition registered");
        }

        info!(%database, %table, count = partitions.len(), "catalog partitions updated");
        Ok(())
    }

    fn get_table(&self, database: &str, table: &str) -> Result<Option<TableMetadata>, CatalogError> {
        read_json(&self.table_dir(database, table)?.join(TABLE_FILE))
    }

    fn list_partitions(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<PartitionEntry>, CatalogError> {
        let dir = self.table_dir(database, table)?.join(PARTITIONS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut partitions = Vec::new();
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|e| CatalogError::Io {
                path: dir.clone(),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && entry.file_name() == PARTITION_FILE {
                if let Some(partition) = read_json::<PartitionEntry>(entry.path())? {
                    partitions.push(partition);
                }
            }
        }

        partitions.sort_by(|a, b| a.values.cmp(&b.values));
        Ok(partitions)
    }
}
