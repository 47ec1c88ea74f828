//! Roster, period and unavailability operations

use chrono::NaiveDate;

use super::{Outcome, RotaService};
use crate::auth::Actor;
use crate::error::{Error, Result};
use crate::models::{find_person, Period, Person, PersonId, UnavailabilityMark, UnitRef};
use crate::storage::{PeriodProvider, RosterProvider, UnitDocument};

fn validate_person(person: &Person) -> Result<()> {
    if person.id.as_str().trim().is_empty() {
        return Err(Error::validation("person id must not be empty"));
    }
    if person.name.trim().is_empty() {
        return Err(Error::validation(format!(
            "person '{}' needs a display name",
            person.id
        )));
    }
    Ok(())
}

fn person_index(doc: &UnitDocument, id: &PersonId) -> Result<usize> {
    doc.roster
        .iter()
        .position(|p| &p.id == id)
        .ok_or_else(|| Error::not_found("person", id))
}

impl RotaService {
    // ========================================================================
    // Period
    // ========================================================================

    /// Configure the unit's period
    pub async fn set_period(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Period> {
        self.mutate("set_period", actor, unit, |doc| {
            self.require_manage(unit, actor)?;
            let period = Period::new(start, end)?;
            let before = doc.period.replace(period);
            Ok(Outcome::new(period).changes(before.as_ref(), Some(&period)))
        })
        .await
    }

    // ========================================================================
    // Roster
    // ========================================================================

    pub async fn add_person(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        person: Person,
    ) -> Result<Person> {
        self.mutate("add_person", actor, unit, |doc| {
            self.require_manage(unit, actor)?;
            validate_person(&person)?;
            if find_person(doc.roster(), &person.id).is_some() {
                return Err(Error::conflict(format!(
                    "person '{}' is already in the roster",
                    person.id
                )));
            }
            doc.roster.push(person.clone());
            Ok(Outcome::new(person.clone()).changes(None::<&Person>, Some(&person)))
        })
        .await
    }

    /// Replace name, weekdays and phases of an existing person
    pub async fn update_person(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        person: Person,
    ) -> Result<Person> {
        self.mutate("update_person", actor, unit, |doc| {
            self.require_manage(unit, actor)?;
            validate_person(&person)?;
            let index = person_index(doc, &person.id)?;
            let before = std::mem::replace(&mut doc.roster[index], person.clone());
            Ok(Outcome::new(person.clone()).changes(Some(&before), Some(&person)))
        })
        .await
    }

    /// Remove a person; schedules keep referring to them by id
    pub async fn remove_person(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        id: &PersonId,
    ) -> Result<Person> {
        self.mutate("remove_person", actor, unit, |doc| {
            self.require_manage(unit, actor)?;
            let index = person_index(doc, id)?;
            let removed = doc.roster.remove(index);
            Ok(Outcome::new(removed.clone()).changes(Some(&removed), None::<&Person>))
        })
        .await
    }

    // ========================================================================
    // Unavailability
    // ========================================================================

    /// People mark themselves; administrators of the unit may mark anyone
    fn require_mark_rights(&self, unit: &UnitRef, actor: &Actor, person: &PersonId) -> Result<()> {
        if &actor.id == person || (self.is_admin(actor) && self.can_manage(unit, actor)) {
            Ok(())
        } else {
            Err(Error::unauthorized(format!(
                "{actor} may not change unavailability of '{person}'"
            )))
        }
    }

    /// Mark a person unavailable on a date, replacing any existing mark
    pub async fn add_unavailability(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        person_id: &PersonId,
        date: NaiveDate,
        reason: Option<String>,
    ) -> Result<UnavailabilityMark> {
        self.mutate("add_unavailability", actor, unit, |doc| {
            self.require_mark_rights(unit, actor, person_id)?;
            if find_person(doc.roster(), person_id).is_none() {
                return Err(Error::not_found("person", person_id));
            }
            let period = doc
                .period()
                .ok_or_else(|| Error::validation("the unit has no period configured"))?;
            if !period.contains(date) {
                return Err(Error::validation(format!(
                    "{date} is outside the period {period}"
                )));
            }

            let mark = UnavailabilityMark {
                person_id: person_id.clone(),
                date,
                reason,
                author: Some(actor.id.clone()),
            };
            let existing = doc
                .unavailability
                .iter_mut()
                .find(|m| &m.person_id == person_id && m.date == date);
            let before = match existing {
                Some(slot) => Some(std::mem::replace(slot, mark.clone())),
                None => {
                    doc.unavailability.push(mark.clone());
                    None
                }
            };
            Ok(Outcome::new(mark.clone()).changes(before.as_ref(), Some(&mark)))
        })
        .await
    }

    pub async fn remove_unavailability(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        person_id: &PersonId,
        date: NaiveDate,
    ) -> Result<UnavailabilityMark> {
        self.mutate("remove_unavailability", actor, unit, |doc| {
            self.require_mark_rights(unit, actor, person_id)?;
            let index = doc
                .unavailability
                .iter()
                .position(|m| &m.person_id == person_id && m.date == date)
                .ok_or_else(|| {
                    Error::not_found("unavailability mark", format!("{person_id} on {date}"))
                })?;
            let removed = doc.unavailability.remove(index);
            Ok(Outcome::new(removed.clone()).changes(Some(&removed), None::<&UnavailabilityMark>))
        })
        .await
    }

    /// Marks visible to the actor: all for unit administrators, own otherwise
    pub async fn list_unavailability(
        &self,
        actor: &Actor,
        unit: &UnitRef,
    ) -> Result<Vec<UnavailabilityMark>> {
        let doc = self.load(unit).await?;
        let sees_all = self.is_admin(actor) && self.can_manage(unit, actor);
        let mut marks: Vec<UnavailabilityMark> = doc
            .unavailability
            .into_iter()
            .filter(|m| sees_all || m.person_id == actor.id)
            .collect();
        marks.sort_by(|a, b| (a.date, &a.person_id).cmp(&(b.date, &b.person_id)));
        Ok(marks)
    }
}
