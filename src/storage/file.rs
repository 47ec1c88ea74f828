//! JSON file backend: one `{unit_id}.json` per unit, locked through `{unit_id}.lock`

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{validate_unit_id, DocumentBackend, LockMode, UnitDocument, UnitLock};
use crate::error::{Error, Result};

const EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Stores each unit document as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, unit_id: &str) -> Result<PathBuf> {
        validate_unit_id(unit_id)?;
        Ok(self.dir.join(format!("{unit_id}.{EXTENSION}")))
    }

    fn lock_path_for(&self, unit_id: &str) -> Result<PathBuf> {
        validate_unit_id(unit_id)?;
        Ok(self.dir.join(format!("{unit_id}.{LOCK_EXTENSION}")))
    }
}

#[async_trait]
impl DocumentBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn load(&self, unit_id: &str) -> Result<Option<UnitDocument>> {
        let path = self.path_for(unit_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage(format!("read {}", path.display()), e)),
        };

        let doc = serde_json::from_slice(&bytes)
            .map_err(|e| Error::storage(format!("parse {}", path.display()), e))?;
        tracing::debug!(path = %path.display(), "Unit document loaded");
        Ok(Some(doc))
    }

    async fn save(&self, doc: &UnitDocument) -> Result<()> {
        let path = self.path_for(doc.key())?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write to a uniquely named sibling, then rename over the target
        let suffix = Uuid::new_v4().simple();
        let temp_path = path.with_extension(format!("{EXTENSION}.{suffix}.tmp"));
        let json = serde_json::to_vec_pretty(doc)?;
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| Error::storage(format!("write {}", temp_path.display()), e))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::storage(format!("rename {}", path.display()), e));
        }

        tracing::debug!(path = %path.display(), "Unit document saved");
        Ok(())
    }

    async fn exists(&self, unit_id: &str) -> Result<bool> {
        let path = self.path_for(unit_id)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn lock(&self, unit_id: &str, mode: LockMode) -> Result<UnitLock> {
        let path = self.lock_path_for(unit_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        UnitLock::acquire(path, mode).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
