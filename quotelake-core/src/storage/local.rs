//! Filesystem-backed object store.
//!
//! Layout: `{root}/{bucket}/{key}`. Writes are atomic: write to a temp file next to the
//! target, then rename into place, so readers never observe a half-written object and
//! concurrent writers to the same key resolve as last-writer-wins.

use super::location::is_dot_segment;
use super::{Location, ObjectStore, StorageError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use walkdir::WalkDir;

const TMP_SUFFIX: &str = ".tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing a location; never resolves outside the store root.
    pub fn path_for(&self, location: &Location) -> Result<PathBuf, StorageError> {
        let mut path = self.root.join(location.bucket());
        for segment in location.key().split('/').filter(|s| !s.is_empty()) {
            if is_dot_segment(segment) {
                return Err(StorageError::InvalidLocation(format!(
                    "{location} escapes the store root"
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn location_for(&self, bucket: &str, path: &Path) -> Result<Location, StorageError> {
        let relative = path.strip_prefix(self.bucket_dir(bucket)).map_err(|_| {
            StorageError::InvalidLocation(format!("{} is outside the store", path.display()))
        })?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Location::new(bucket, key)
    }
}

fn io_err(location: &Location) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        location: location.to_string(),
        source,
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, location: &Location, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(location)?;
        let parent = path.parent().ok_or_else(|| {
            StorageError::InvalidLocation(format!("{location} has no parent directory"))
        })?;
        fs::create_dir_all(parent).map_err(io_err(location))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::InvalidLocation(format!("{location} names a prefix")))?;
        let id = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = parent.join(format!(
            ".{file_name}.{}-{id}{TMP_SUFFIX}",
            std::process::id()
        ));

        fs::write(&tmp_path, bytes).map_err(io_err(location))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(location)(e)
        })?;

        debug!(%location, bytes = bytes.len(), "object written");
        Ok(())
    }

    fn get(&self, location: &Location) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(location)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(location.clone()));
        }
        fs::read(&path).map_err(io_err(location))
    }

    fn exists(&self, location: &Location) -> Result<bool, StorageError> {
        Ok(self.path_for(location)?.is_file())
    }

    fn list(&self, prefix: &Location) -> Result<Vec<Location>, StorageError> {
        let start = self.path_for(prefix)?;
        if !start.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&start).follow_links(false) {
            let entry = entry.map_err(|e| StorageError::Io {
                location: prefix.to_string(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            // In-flight temp files from concurrent writers are not objects yet
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') && name.ends_with(TMP_SUFFIX) {
                continue;
            }
            found.push(self.location_for(prefix.bucket(), entry.path())?);
        }

        found.sort();
        Ok(found)
    }

    fn delete(&self, location: &Location) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(location)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(location)(e)),
        }
    }
}
