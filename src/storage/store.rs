//! Lock-and-rewrite access to unit documents

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{DocumentBackend, LockMode, UnitDocument};
use crate::error::{Error, Result};

/// Serializes mutations per unit over a [`DocumentBackend`]
///
/// Writers to one unit take turns: first on an in-process mutex, then on the
/// backend's unit lock, which also excludes other processes. Readers hold
/// the unit lock in shared mode while loading.
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    async fn lock_for(&self, unit_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(unit_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load a unit, failing when it does not exist
    pub async fn read(&self, unit_id: &str) -> Result<UnitDocument> {
        let _unit_lock = self.backend.lock(unit_id, LockMode::Shared).await?;
        self.load(unit_id).await
    }

    async fn load(&self, unit_id: &str) -> Result<UnitDocument> {
        self.backend
            .load(unit_id)
            .await?
            .ok_or_else(|| Error::not_found("unit", unit_id))
    }

    /// Store a new unit, failing when the id is taken
    pub async fn create(&self, doc: UnitDocument) -> Result<UnitDocument> {
        let lock = self.lock_for(doc.key()).await;
        let _guard = lock.lock().await;
        let _unit_lock = self.backend.lock(doc.key(), LockMode::Exclusive).await?;

        if self.backend.exists(doc.key()).await? {
            return Err(Error::conflict(format!("unit '{}' already exists", doc.key())));
        }
        self.backend.save(&doc).await?;
        tracing::info!(unit = %doc.unit, backend = self.backend.name(), "Unit created");
        Ok(doc)
    }

    /// Apply `mutate` to a unit under its lock
    ///
    /// The document is written back only when `mutate` returns `Ok`; on error
    /// the stored version is left exactly as it was.
    pub async fn update<T, F>(&self, unit_id: &str, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut UnitDocument) -> Result<T> + Send,
        T: Send,
    {
        let lock = self.lock_for(unit_id).await;
        let _guard = lock.lock().await;
        let _unit_lock = self.backend.lock(unit_id, LockMode::Exclusive).await?;

        let mut doc = self.load(unit_id).await?;
        let value = mutate(&mut doc)?;
        doc.updated_at = Utc::now();
        self.backend.save(&doc).await?;
        Ok(value)
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.backend.list().await
    }
}
