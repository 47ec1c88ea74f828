//! Unit-level operations with authorization, persistence and audit
//!
//! [`RotaService`] is the entry point callers use. Each mutating operation
//! follows the same path:
//!
//! 1. Read-only actors are turned away.
//! 2. The unit document is loaded under its lock.
//! 3. Role and scope are checked against the unit.
//! 4. The scheduling core mutates the in-memory copy.
//! 5. The document is written back only on success.
//! 6. An audit entry is emitted either way.
//!
//! Operations are grouped by area in [`roster`], [`schedule`] and
//! [`exchange`].

pub mod exchange;
pub mod roster;
pub mod schedule;

use chrono::Weekday;
use serde::Serialize;
use std::sync::Arc;

use crate::audit::{emit, AuditEntry, AuditSink};
use crate::auth::{require_manage, require_write, Actor, AuthorizationGate};
use crate::error::{Error, Result};
use crate::models::UnitRef;
use crate::scheduler::eligibility::SpecialRule;
use crate::scheduler::generator::ScheduleGenerator;
use crate::scheduler::schedule::DayPatterns;
use crate::storage::{DocumentStore, UnitDocument};

/// Result of a mutation plus the snapshots that go into the audit entry
pub(crate) struct Outcome<T> {
    value: T,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            before: None,
            after: None,
        }
    }

    /// Attach before/after snapshots; unserializable values are left out
    pub(crate) fn changes<B: Serialize, A: Serialize>(
        mut self,
        before: Option<&B>,
        after: Option<&A>,
    ) -> Self {
        self.before = before.and_then(|b| serde_json::to_value(b).ok());
        self.after = after.and_then(|a| serde_json::to_value(a).ok());
        self
    }
}

/// Scheduling operations for every unit in a store
pub struct RotaService {
    store: DocumentStore,
    gate: Arc<dyn AuthorizationGate>,
    audit: Arc<dyn AuditSink>,
    generator: ScheduleGenerator,
    rjm_day: Weekday,
}

impl RotaService {
    pub fn new(
        store: DocumentStore,
        gate: Arc<dyn AuthorizationGate>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            gate,
            audit,
            generator: ScheduleGenerator::default(),
            rjm_day: Weekday::Sun,
        }
    }

    /// Use a different weekday layout for generation
    pub fn with_patterns(mut self, patterns: DayPatterns) -> Self {
        self.generator = ScheduleGenerator::new(patterns);
        self
    }

    /// Plug a special eligibility rule into generation
    pub fn with_special_rule(mut self, rule: Box<dyn SpecialRule>) -> Self {
        self.generator = self.generator.with_rule(rule);
        self
    }

    pub fn with_rjm_day(mut self, weekday: Weekday) -> Self {
        self.rjm_day = weekday;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub(crate) fn can_manage(&self, unit: &UnitRef, actor: &Actor) -> bool {
        self.gate.can_manage(unit, actor)
    }

    pub(crate) fn is_admin(&self, actor: &Actor) -> bool {
        self.gate.is_admin(actor)
    }

    /// Fail unless `actor` may manage `unit`
    pub(crate) fn require_manage(&self, unit: &UnitRef, actor: &Actor) -> Result<()> {
        require_manage(self.gate.as_ref(), unit, actor)
    }

    /// Load a unit for reading
    pub(crate) async fn load(&self, unit: &UnitRef) -> Result<UnitDocument> {
        let doc = self.store.read(&unit.unit_id).await?;
        check_unit(&doc, unit)?;
        Ok(doc)
    }

    /// Run one audited mutation against a unit document
    pub(crate) async fn mutate<T, F>(
        &self,
        action: &'static str,
        actor: &Actor,
        unit: &UnitRef,
        apply: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut UnitDocument) -> Result<Outcome<T>> + Send,
        T: Send,
    {
        let result = match require_write(actor) {
            Ok(()) => {
                self.store
                    .update(&unit.unit_id, |doc| {
                        check_unit(doc, unit)?;
                        apply(doc)
                    })
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                tracing::info!(action, unit = %unit, actor = %actor.id, "Unit updated");
                let entry = AuditEntry::success(action, &actor.id, unit)
                    .with_changes(outcome.before, outcome.after);
                emit(self.audit.as_ref(), entry).await;
                Ok(outcome.value)
            }
            Err(e) => {
                tracing::debug!(
                    action,
                    unit = %unit,
                    actor = %actor.id,
                    error = %e,
                    "Mutation refused"
                );
                emit(
                    self.audit.as_ref(),
                    AuditEntry::failure(action, &actor.id, unit, &e),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Create an empty unit
    pub async fn create_unit(&self, actor: &Actor, unit: &UnitRef) -> Result<UnitDocument> {
        let result = async {
            require_write(actor)?;
            self.require_manage(unit, actor)?;
            self.store.create(UnitDocument::new(unit.clone())).await
        }
        .await;

        let entry = match &result {
            Ok(doc) => AuditEntry::success("create_unit", &actor.id, unit)
                .with_changes(None, serde_json::to_value(&doc.unit).ok()),
            Err(e) => AuditEntry::failure("create_unit", &actor.id, unit, e),
        };
        emit(self.audit.as_ref(), entry).await;
        result
    }

    /// Full stored document of a unit
    pub async fn get_unit(&self, actor: &Actor, unit: &UnitRef) -> Result<UnitDocument> {
        let doc = self.load(unit).await?;
        tracing::debug!(unit = %unit, actor = %actor.id, "Unit read");
        Ok(doc)
    }

    /// Ids of every stored unit
    pub async fn list_units(&self) -> Result<Vec<String>> {
        self.store.list().await
    }
}

/// Guard against a unit id that belongs to a different hierarchy position
fn check_unit(doc: &UnitDocument, unit: &UnitRef) -> Result<()> {
    if &doc.unit != unit {
        return Err(Error::not_found("unit", unit));
    }
    Ok(())
}
