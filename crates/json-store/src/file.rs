use crate::error::{JsonStoreError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub pretty_print: bool,
    /// Create missing parent directories before writing
    pub ensure_dir: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            pretty_print: true,
            ensure_dir: true,
        }
    }
}

/// A single JSON document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileHandler {
    path: PathBuf,
}

impl JsonFileHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|err| JsonStoreError::io(&self.path, err))?;
        serde_json::from_slice(&bytes).map_err(|source| JsonStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Like [`Self::read`], but a missing file is `Ok(None)`.
    pub async fn read_optional<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.read().await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Read, falling back to `T::default()` on any failure.
    pub async fn read_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match self.read().await {
            Ok(value) => value,
            Err(JsonStoreError::NotFound(_)) => T::default(),
            Err(err) => {
                log::warn!("Using default for unreadable {}: {err}", self.path.display());
                T::default()
            }
        }
    }

    /// Write atomically: serialise into a sibling temp file, then rename over the target.
    pub async fn write<T: Serialize + ?Sized>(&self, value: &T, options: WriteOptions) -> Result<()> {
        if options.ensure_dir {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| JsonStoreError::io(parent, err))?;
            }
        }

        let bytes = if options.pretty_print {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };

        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .path
            .with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|err| JsonStoreError::io(&tmp, err))?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(JsonStoreError::io(&self.path, err));
        }
        log::debug!("Wrote {}", self.path.display());
        Ok(())
    }

    /// Remove the file. Returns `false` when it was already absent.
    pub async fn remove(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(JsonStoreError::io(&self.path, err)),
        }
    }
}
