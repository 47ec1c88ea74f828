//! Unit document persistence
//!
//! Each organizational unit is stored as one JSON document. The service layer
//! never writes fields individually: [`DocumentStore::update`] loads the whole
//! document under a per-unit lock, applies a closure and writes the result
//! back only when the closure succeeds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                RotaService                  │
//! └──────────────────────┬──────────────────────┘
//!                        │ read / create / update(closure)
//!                        ▼
//! ┌─────────────────────────────────────────────┐
//! │ DocumentStore (per-unit Mutex + unit lock)  │
//! └──────────────────────┬──────────────────────┘
//!                        │ DocumentBackend
//!             ┌──────────┴──────────┐
//!             ▼                     ▼
//!    ┌─────────────────┐   ┌─────────────────┐
//!    │ JsonFileBackend │   │  MemoryBackend  │
//!    └─────────────────┘   └─────────────────┘
//! ```
//!
//! File-backed units are additionally guarded by an OS file lock (see
//! [`lock`]), so separate processes sharing a data directory take turns too.
//!
//! The narrow provider traits ([`RosterProvider`], [`AssignmentStore`], ...)
//! describe what the scheduling core reads from and writes to a document.

pub mod document;
pub mod file;
pub mod lock;
pub mod memory;
pub mod store;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Period, Person, UnavailabilitySet};
use crate::scheduler::exchange::ExchangeRequest;
use crate::scheduler::schedule::{Publication, Schedule};

pub use document::UnitDocument;
pub use file::JsonFileBackend;
pub use lock::{LockMode, UnitLock};
pub use memory::MemoryBackend;
pub use store::DocumentStore;

// ============================================================================
// Backend
// ============================================================================

/// Raw load/save of whole unit documents
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Load a document; `Ok(None)` when the unit does not exist
    async fn load(&self, unit_id: &str) -> Result<Option<UnitDocument>>;

    /// Persist a document, replacing any previous version
    async fn save(&self, doc: &UnitDocument) -> Result<()>;

    async fn exists(&self, unit_id: &str) -> Result<bool> {
        Ok(self.load(unit_id).await?.is_some())
    }

    /// Ids of every stored unit, sorted
    async fn list(&self) -> Result<Vec<String>>;

    /// Lock one unit against other processes sharing this storage
    ///
    /// Backends confined to a single process return [`UnitLock::none`].
    async fn lock(&self, _unit_id: &str, _mode: LockMode) -> Result<UnitLock> {
        Ok(UnitLock::none())
    }
}

/// Reject ids that cannot safely become a file name
pub fn validate_unit_id(unit_id: &str) -> Result<()> {
    let bad = unit_id.is_empty()
        || unit_id == "."
        || unit_id.contains("..")
        || unit_id.contains(['/', '\\'])
        || unit_id.chars().any(char::is_control);
    if bad {
        return Err(Error::validation(format!("invalid unit id '{unit_id}'")));
    }
    Ok(())
}

// ============================================================================
// Provider Traits
// ============================================================================

pub trait RosterProvider {
    fn roster(&self) -> &[Person];
}

pub trait UnavailabilityProvider {
    /// Every (person, date) pair marked unavailable
    fn unavailability(&self) -> UnavailabilitySet;
}

pub trait PeriodProvider {
    fn period(&self) -> Option<Period>;
}

/// Main schedule storage
pub trait AssignmentStore {
    fn assignments(&self) -> &Schedule;

    /// Replace the schedule, returning its publication stamp
    fn put_assignments(&mut self, schedule: Schedule) -> Option<&Publication>;

    /// Remove the schedule, returning what was there
    fn clear_assignments(&mut self) -> Schedule;
}

pub trait ExchangeStore {
    fn exchanges(&self) -> &[ExchangeRequest];

    fn append_exchange(&mut self, request: ExchangeRequest);

    /// Replace the stored request with the same id
    fn update_exchange(&mut self, request: ExchangeRequest) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_unit_id() {
        assert!(validate_unit_id("central").is_ok());
        assert!(validate_unit_id("unit-42_b").is_ok());
        assert!(validate_unit_id("").is_err());
        assert!(validate_unit_id("../etc").is_err());
        assert!(validate_unit_id("a/b").is_err());
        assert!(validate_unit_id("a\\b").is_err());
    }
}
