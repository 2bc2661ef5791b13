//! Object storage: locations, the store trait, a filesystem-backed store and Parquet codecs.
//!
//! The store is deliberately narrow (put/get/list/delete of whole objects). There is no
//! read-modify-write and no transaction; overwrite semantics come from `put` replacing
//! whatever object already lives at a location.

pub mod local;
pub mod location;
pub mod parquet;

pub use local::LocalObjectStore;
pub use location::Location;

use thiserror::Error;

/// Errors raised by object-store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("object not found: {0}")]
    NotFound(Location),

    #[error("I/O error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet I/O error: {0}")]
    Parquet(String),
}

/// Minimal object-store interface.
pub trait ObjectStore: Send + Sync {
    /// Write an object, replacing any existing object at the same location.
    fn put(&self, location: &Location, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read a whole object.
    fn get(&self, location: &Location) -> Result<Vec<u8>, StorageError>;

    /// True if an object (not a prefix) exists at `location`.
    fn exists(&self, location: &Location) -> Result<bool, StorageError>;

    /// All objects under `prefix`, recursively, sorted by key.
    fn list(&self, prefix: &Location) -> Result<Vec<Location>, StorageError>;

    /// Delete an object. Deleting a missing object is not an error.
    fn delete(&self, location: &Location) -> Result<(), StorageError>;
}
