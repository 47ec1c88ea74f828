//! Main and RJM schedule operations

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Outcome, RotaService};
use crate::auth::Actor;
use crate::error::{Error, Result};
use crate::models::{PersonId, Slot, UnitRef};
use crate::scheduler::generator::GeneratedSchedule;
use crate::scheduler::publish;
use crate::scheduler::schedule::{DayEntry, DayView, Publication, RjmView, Schedule};
use crate::scheduler::stats::{self, PersonStats};
use crate::storage::{
    AssignmentStore, PeriodProvider, RosterProvider, UnavailabilityProvider,
};

/// Read model of a unit's schedules with display names resolved
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub days: Vec<DayView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication: Option<Publication>,
    pub rjm: Vec<RjmView>,
}

impl RotaService {
    /// Run the generator over the unit's stored data without saving anything
    pub async fn generate_draft(&self, actor: &Actor, unit: &UnitRef) -> Result<GeneratedSchedule> {
        let doc = self.load(unit).await?;
        self.require_manage(unit, actor)?;
        let period = doc
            .period()
            .ok_or_else(|| Error::validation("the unit has no period configured"))?;

        let draft = self
            .generator
            .generate(&period, doc.roster(), &doc.unavailability());
        tracing::info!(unit = %unit, days = draft.days.len(), "Draft generated");
        Ok(draft)
    }

    /// Replace the unit's schedule and stamp it as published
    pub async fn publish(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        days: Vec<DayEntry>,
    ) -> Result<Schedule> {
        self.mutate("publish_schedule", actor, unit, |doc| {
            self.require_manage(unit, actor)?;
            let before = doc.assignments().clone();
            let mut next = Schedule::default();
            publish::publish(
                &mut next,
                days,
                self.generator.patterns(),
                doc.roster(),
                &actor.id,
                Utc::now(),
            )?;
            doc.put_assignments(next.clone());
            Ok(Outcome::new(next.clone()).changes(Some(&before), Some(&next)))
        })
        .await
    }

    /// Overwrite some slots of one published day
    pub async fn edit_day(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        date: NaiveDate,
        updates: BTreeMap<Slot, Option<PersonId>>,
    ) -> Result<DayEntry> {
        self.mutate("edit_schedule_day", actor, unit, |doc| {
            self.require_manage(unit, actor)?;
            let mut next = doc.assignments().clone();
            let before = next.day(date).cloned();
            publish::edit_day(&mut next, date, &updates, doc.roster())?;
            let after = next
                .day(date)
                .cloned()
                .ok_or_else(|| Error::not_found("schedule day", date))?;
            doc.put_assignments(next);
            Ok(Outcome::new(after.clone()).changes(before.as_ref(), Some(&after)))
        })
        .await
    }

    /// Remove the schedule and its publication stamp
    pub async fn delete_schedule(&self, actor: &Actor, unit: &UnitRef) -> Result<Schedule> {
        self.mutate("delete_schedule", actor, unit, |doc| {
            self.require_manage(unit, actor)?;
            let previous = publish::delete(&mut doc.schedule)?;
            Ok(Outcome::new(previous.clone()).changes(Some(&previous), None::<&Schedule>))
        })
        .await
    }

    /// Both schedules with names resolved; readable by anyone
    pub async fn schedule_view(&self, unit: &UnitRef) -> Result<ScheduleView> {
        let doc = self.load(unit).await?;
        let roster = doc.roster();
        Ok(ScheduleView {
            days: doc.assignments().resolve(roster),
            publication: doc.assignments().publication.clone(),
            rjm: doc.rjm.iter().map(|e| e.resolve(roster)).collect(),
        })
    }

    /// Per-person assignment counts
    pub async fn schedule_stats(&self, unit: &UnitRef) -> Result<Vec<PersonStats>> {
        let doc = self.load(unit).await?;
        Ok(stats::schedule_stats(doc.assignments(), &doc.rjm, doc.roster()))
    }

    // ========================================================================
    // RJM
    // ========================================================================

    /// Build an empty RJM schedule over the configured period
    pub async fn create_rjm_schedule(&self, actor: &Actor, unit: &UnitRef) -> Result<usize> {
        let weekday = self.rjm_day;
        self.mutate("create_rjm_schedule", actor, unit, |doc| {
            self.require_admin_of(unit, actor)?;
            let period = doc.period();
            let before = doc.rjm.clone();
            let count = publish::create_rjm(&mut doc.rjm, period.as_ref(), weekday)?;
            Ok(Outcome::new(count).changes(Some(&before), Some(&doc.rjm)))
        })
        .await
    }

    /// Assign several RJM entries at once
    pub async fn update_rjm_entries(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        changes: BTreeMap<String, Option<PersonId>>,
    ) -> Result<usize> {
        self.mutate("update_rjm_entries", actor, unit, |doc| {
            self.require_admin_of(unit, actor)?;
            let before = doc.rjm.clone();
            let count = publish::update_rjm(&mut doc.rjm, &changes, &doc.roster)?;
            Ok(Outcome::new(count).changes(Some(&before), Some(&doc.rjm)))
        })
        .await
    }

    pub async fn delete_rjm_schedule(&self, actor: &Actor, unit: &UnitRef) -> Result<usize> {
        self.mutate("delete_rjm_schedule", actor, unit, |doc| {
            self.require_admin_of(unit, actor)?;
            let removed = publish::delete_rjm(&mut doc.rjm)?;
            Ok(Outcome::new(removed.len()).changes(Some(&removed), None::<&()>))
        })
        .await
    }

    /// Administrator role plus management rights over the unit
    pub(crate) fn require_admin_of(&self, unit: &UnitRef, actor: &Actor) -> Result<()> {
        if !self.is_admin(actor) {
            return Err(Error::unauthorized(format!("{actor} is not an administrator")));
        }
        self.require_manage(unit, actor)
    }
}
