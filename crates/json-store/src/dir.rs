use crate::error::{JsonStoreError, Result};
use crate::file::JsonFileHandler;
use std::path::{Path, PathBuf};

const JSON_EXTENSION: &str = "json";

/// A directory holding one `<id>.json` document per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDirectory {
    root: PathBuf,
}

impl JsonDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{JSON_EXTENSION}"))
    }

    #[must_use]
    pub fn handler(&self, id: &str) -> JsonFileHandler {
        JsonFileHandler::new(self.path_for(id))
    }

    /// File stems of every `*.json` document, sorted. A missing directory lists as empty.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(JsonStoreError::io(&self.root, err)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| JsonStoreError::io(&self.root, err))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(JSON_EXTENSION) {
                continue;
            }
            match entry.file_type().await {
                Ok(kind) if kind.is_file() => {}
                _ => continue,
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
