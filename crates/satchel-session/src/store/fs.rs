//! Filesystem backend: one file per key.
//!
//! A key `sessions:abc` lives at `<base>/sessions/abc`. Writes land in a
//! sibling temporary file that is renamed over the target, so readers never
//! observe a half-written value.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{KvBackend, StoreResult};
use crate::error::StoreError;

/// Stores each key as a file below a base directory.
#[derive(Debug, Clone)]
pub struct FsBackend {
    base: PathBuf,
}

impl FsBackend {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Map a key onto a path under `base`, refusing anything that could escape it.
    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let mut path = self.base.clone();
        for segment in key.split(':') {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => path.push(segment),
                _ => return Err(StoreError::InvalidKey(key.to_string())),
            }
        }
        Ok(path)
    }

    /// Sibling of `path` that no other writer will pick.
    fn temp_path_for(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.{:016x}.tmp", rand::random::<u64>()))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl KvBackend for FsBackend {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> StoreResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(parent, e))?;
        }

        // Each writer gets its own temp file; the last rename wins.
        let tmp = Self::temp_path_for(&path);
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| Self::io_error(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Self::io_error(&path, e));
        }

        debug!(path = %path.display(), "Wrote storage file");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    async fn get_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        // Only the namespace part of the prefix (everything up to the last
        // ':') selects a directory; the remainder filters file names.
        let (namespace, stem) = match prefix.rfind(':') {
            Some(idx) => (&prefix[..idx], &prefix[idx + 1..]),
            None => ("", prefix),
        };

        let dir = if namespace.is_empty() {
            self.base.clone()
        } else {
            self.path_for(namespace)?
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(&dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_error(&dir, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_file || name.ends_with(".tmp") || !name.starts_with(stem) {
                continue;
            }
            if namespace.is_empty() {
                keys.push(name);
            } else {
                keys.push(format!("{namespace}:{name}"));
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}
