//! Transform job: raw partition → refined partition + catalog update.
//!
//! Steps, in order:
//! 1. read every Parquet object at the source (one object, or a prefix recursively)
//! 2. rename `open` → `abertura` and `close` → `fechamento` (exact names)
//! 3. add `variacao_diaria = (fechamento - abertura) / abertura * 100`
//! 4. write one object per `ticker/year/month/day` partition, replacing what was there
//! 5. ensure the catalog table and register the written partitions
//!
//! Step 4 makes duplicate runs over the same source converge on a single copy of each
//! partition (last writer wins). A zero `abertura` yields ±inf (or NaN for 0/0); the
//! value is written as computed.

use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::catalog::{Catalog, ColumnDef, PartitionEntry, TableDefinition};
use crate::config::ConfigError;
use crate::data::schema::{catalog_type, ABERTURA, FECHAMENTO, VARIACAO_DIARIA};
use crate::data::{partition_key_of, PartitionKey, RefinedSchema, PARTITION_COLUMNS};
use crate::error::PipelineError;
use crate::jobs::{resolve_options, JobArguments, JobHandler};
use crate::storage::{parquet, Location, ObjectStore};

pub const JOB_NAME: &str = "JOB_NAME";
pub const SOURCE_PATH: &str = "s3_source_path";
pub const REFINED_BUCKET_PATH: &str = "REFINED_BUCKET_PATH";
pub const GLUE_CATALOG_DB_NAME: &str = "GLUE_CATALOG_DB_NAME";
pub const GLUE_CATALOG_TABLE_NAME: &str = "GLUE_CATALOG_TABLE_NAME";

/// Object name used for every refined partition.
pub const PART_FILE: &str = "part-00000.parquet";

const OUTPUT_FORMAT: &str = "parquet";

/// Resolved job arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSettings {
    pub job_name: String,
    pub source: Location,
    pub output_root: Location,
    pub database: String,
    pub table: String,
}

impl TransformSettings {
    pub fn from_arguments(args: &JobArguments) -> Result<Self, ConfigError> {
        let mut opts = resolve_options(
            args,
            &[
                JOB_NAME,
                SOURCE_PATH,
                REFINED_BUCKET_PATH,
                GLUE_CATALOG_DB_NAME,
                GLUE_CATALOG_TABLE_NAME,
            ],
        )?;
        let mut take = |name: &str| opts.remove(name).unwrap_or_default();

        let job_name = take(JOB_NAME);
        let source = location_arg(SOURCE_PATH, &take(SOURCE_PATH))?;
        let output_root = location_arg(REFINED_BUCKET_PATH, &take(REFINED_BUCKET_PATH))?;

        Ok(Self {
            job_name,
            source,
            output_root,
            database: take(GLUE_CATALOG_DB_NAME),
            table: take(GLUE_CATALOG_TABLE_NAME),
        })
    }
}

fn location_arg(name: &str, value: &str) -> Result<Location, ConfigError> {
    Location::parse(value).map_err(|e| ConfigError::Invalid {
        key: format!("--{name}"),
        reason: e.to_string(),
    })
}

/// One refined partition written by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPartition {
    pub key: PartitionKey,
    /// Partition prefix (ends with `/`).
    pub location: Location,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformReport {
    pub source: Location,
    pub rows_read: usize,
    pub partitions: Vec<WrittenPartition>,
}

impl TransformReport {
    pub fn summary(&self) -> String {
        format!(
            "read {} rows from {}, wrote {} partition(s)",
            self.rows_read,
            self.source,
            self.partitions.len()
        )
    }
}

/// Load all Parquet records at `source`.
pub fn read_source(store: &dyn ObjectStore, source: &Location) -> Result<DataFrame, PipelineError> {
    let objects = if source.is_parquet() && store.exists(source)? {
        vec![source.clone()]
    } else {
        store
            .list(&source.as_prefix())?
            .into_iter()
            .filter(Location::is_parquet)
            .collect()
    };

    let mut frames = objects.iter();
    let first = frames
        .next()
        .ok_or_else(|| PipelineError::NoInput(source.clone()))?;
    debug!(object = %first, "reading");
    let mut combined = read_stamped(store, first)?;
    let order: Vec<PlSmallStr> = combined.get_column_names().into_iter().cloned().collect();

    for object in frames {
        debug!(%object, "reading");
        let df = read_stamped(store, object)?;
        combined.vstack_mut(&df.select(order.clone())?)?;
    }

    Ok(combined)
}

/// Read one object; if its key carries a partition path, its rows must be stamped with it.
fn read_stamped(store: &dyn ObjectStore, object: &Location) -> Result<DataFrame, PipelineError> {
    let df = parquet::read_frame(store, object)?;
    if let Some(expected) = PartitionKey::from_path(object.key()) {
        let stamped = partition_key_of(&df)?;
        if stamped.as_ref() != Some(&expected) {
            return Err(PipelineError::InvalidPartition(format!(
                "{object} is stored under {expected} but its rows are stamped {}",
                stamped.map_or_else(|| "with no key".to_string(), |k| k.to_string())
            )));
        }
    }
    Ok(df)
}

/// Rename `open` → `abertura` and `close` → `fechamento`.
pub fn rename_fields(mut df: DataFrame) -> PolarsResult<DataFrame> {
    df.rename("open", ABERTURA.into())?;
    df.rename("close", FECHAMENTO.into())?;
    // polars 0.46 `rename` leaves the cached schema stale; drop it so lazy plans see the new names.
    df.clear_schema();
    Ok(df)
}

/// Add the row-level daily variation, in percent.
pub fn add_daily_variation(df: DataFrame) -> PolarsResult<DataFrame> {
    df.lazy()
        .with_column(
            ((col(FECHAMENTO) - col(ABERTURA)) / col(ABERTURA) * lit(100.0)).alias(VARIACAO_DIARIA),
        )
        .collect()
}

/// Rename then derive: the full row-level refinement.
pub fn refine(df: DataFrame) -> PolarsResult<DataFrame> {
    add_daily_variation(rename_fields(df)?)
}

/// Mean `volume` per ticker, as `volume_medio`.
///
/// Not part of the refined output, which keeps row granularity.
pub fn mean_volume_by_ticker(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.clone()
        .lazy()
        .group_by([col("ticker")])
        .agg([col("volume").mean().alias("volume_medio")])
        .sort(["ticker"], SortMultipleOptions::default())
        .collect()
}

/// Write `df` under `output_root`, one object per partition.
///
/// Each partition's object is replaced and any other objects left in the partition
/// prefix are deleted afterwards.
pub fn write_partitions(
    store: &dyn ObjectStore,
    output_root: &Location,
    df: &DataFrame,
) -> Result<Vec<WrittenPartition>, PipelineError> {
    let mut written = Vec::new();

    for group in df.partition_by_stable(PARTITION_COLUMNS, true)? {
        let key = partition_key_of(&group)?.ok_or_else(|| {
            PipelineError::InvalidPartition("null or non-positive partition value".into())
        })?;
        let prefix = output_root.join(&key.path()).as_prefix();
        let target = prefix.join(PART_FILE);

        parquet::write_frame(store, &target, &group)?;
        for stale in store.list(&prefix)? {
            if stale != target {
                debug!(%stale, "removing superseded object");
                store.delete(&stale)?;
            }
        }

        info!(partition = %key, rows = group.height(), "refined partition written");
        written.push(WrittenPartition {
            key,
            location: prefix,
            rows: group.height(),
        });
    }

    Ok(written)
}

/// Catalog definition matching a refined frame.
pub fn table_definition(settings: &TransformSettings, df: &DataFrame) -> TableDefinition {
    let schema = df.schema();
    let mut columns = Vec::new();
    let mut partition_types = BTreeMap::new();

    for (name, dtype) in schema.iter() {
        let column = ColumnDef {
            name: name.to_string(),
            data_type: catalog_type(dtype).to_string(),
        };
        if PARTITION_COLUMNS.contains(&name.as_str()) {
            partition_types.insert(name.to_string(), column);
        } else {
            columns.push(column);
        }
    }

    let partition_keys = PARTITION_COLUMNS
        .iter()
        .filter_map(|name| partition_types.remove(*name))
        .collect();

    TableDefinition {
        database: settings.database.clone(),
        name: settings.table.clone(),
        location: settings.output_root.as_prefix(),
        format: OUTPUT_FORMAT.to_string(),
        columns,
        partition_keys,
    }
}

pub struct TransformJob<'a> {
    store: &'a dyn ObjectStore,
    catalog: &'a dyn Catalog,
}

impl<'a> TransformJob<'a> {
    pub fn new(store: &'a dyn ObjectStore, catalog: &'a dyn Catalog) -> Self {
        Self { store, catalog }
    }

    pub fn execute(&self, settings: &TransformSettings) -> Result<TransformReport, PipelineError> {
        info!(job = %settings.job_name, source = %settings.source, "transform started");

        let raw = read_source(self.store, &settings.source)?;
        let rows_read = raw.height();

        let refined = refine(raw)?;
        RefinedSchema::validate(&refined)?;

        let partitions = write_partitions(self.store, &settings.output_root, &refined)?;

        self.catalog
            .ensure_table(&table_definition(settings, &refined))?;
        let registered_at = chrono::Utc::now();
        let entries: Vec<PartitionEntry> = partitions
            .iter()
            .map(|p| PartitionEntry {
                values: p.key.values(),
                location: p.location.clone(),
                row_count: p.rows,
                registered_at,
            })
            .collect();
        self.catalog
            .add_partitions(&settings.database, &settings.table, &entries)?;

        let report = TransformReport {
            source: settings.source.clone(),
            rows_read,
            partitions,
        };
        info!(summary = %report.summary(), "transform finished");
        Ok(report)
    }
}

impl JobHandler for TransformJob<'_> {
    fn run(&self, arguments: &JobArguments) -> Result<String, PipelineError> {
        let settings = TransformSettings::from_arguments(arguments)?;
        Ok(self.execute(&settings)?.summary())
    }
}
