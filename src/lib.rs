//! rota - Organist rota for worship services
//!
//! Builds fair service schedules for a unit's organists, lets administrators
//! publish and adjust them, and runs the request/accept/approve workflow for
//! handing a slot to somebody else.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - People, units, periods and unavailability
//! - [`scheduler`] - Eligibility, fair allocation, generation, publication and exchanges
//! - [`storage`] - Per-unit documents with file and in-memory backends
//! - [`auth`] - Roles, scopes and the authorization gate
//! - [`audit`] - Audit entries and sinks
//! - [`service`] - User-facing operations tying everything together
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rota::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = DocumentStore::new(Arc::new(JsonFileBackend::new(&config.storage.data_dir)));
//!     let service = RotaService::new(store, Arc::new(ScopeGate), Arc::new(TracingAuditSink));
//!
//!     let actor = Actor::new("ana", "Ana", Role::Master);
//!     let unit: UnitRef = "north/centre/u1".parse()?;
//!     let draft = service.generate_draft(&actor, &unit).await?;
//!     for line in draft.log_lines() {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::audit::{
        AuditEntry, AuditSink, JsonlAuditSink, MemoryAuditSink, TracingAuditSink,
    };
    pub use crate::auth::{Actor, AuthorizationGate, Role, ScopeGate};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{Period, Person, PersonId, PhaseType, Slot, UnitRef};
    pub use crate::scheduler::{
        DayEntry, DayPatterns, ExchangeRequest, ExchangeStatus, GeneratedSchedule, NewExchange,
        Schedule, ScheduleGenerator,
    };
    pub use crate::service::RotaService;
    pub use crate::storage::{DocumentStore, JsonFileBackend, MemoryBackend, UnitDocument};
}

// Direct re-exports for convenience
pub use models::{Person, PersonId, UnitRef};
