//! Parquet encode/decode between polars DataFrames and object bytes.

use super::{Location, ObjectStore, StorageError};
use polars::prelude::*;
use std::io::Cursor;

/// Encode a DataFrame as a Parquet file in memory.
pub fn encode(df: &DataFrame) -> Result<Vec<u8>, StorageError> {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df.clone())
        .map_err(|e| StorageError::Parquet(format!("write parquet: {e}")))?;
    Ok(buf)
}

/// Decode a Parquet file held in memory.
pub fn decode(bytes: Vec<u8>) -> Result<DataFrame, StorageError> {
    ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| StorageError::Parquet(format!("read parquet: {e}")))
}

/// Encode and `put` a DataFrame.
pub fn write_frame(
    store: &dyn ObjectStore,
    location: &Location,
    df: &DataFrame,
) -> Result<(), StorageError> {
    let bytes = encode(df)?;
    store.put(location, &bytes)
}

/// `get` and decode a single Parquet object.
pub fn read_frame(store: &dyn ObjectStore, location: &Location) -> Result<DataFrame, StorageError> {
    decode(store.get(location)?)
}
