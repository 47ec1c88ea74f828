//! In-memory backend for tests and dry runs

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{validate_unit_id, DocumentBackend, UnitDocument};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    docs: RwLock<BTreeMap<String, UnitDocument>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, unit_id: &str) -> Result<Option<UnitDocument>> {
        validate_unit_id(unit_id)?;
        Ok(self.docs.read().await.get(unit_id).cloned())
    }

    async fn save(&self, doc: &UnitDocument) -> Result<()> {
        validate_unit_id(doc.key())?;
        self.docs
            .write()
            .await
            .insert(doc.key().to_string(), doc.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.docs.read().await.keys().cloned().collect())
    }
}
