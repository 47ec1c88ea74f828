//! Manual edit and publish gate
//!
//! Administrators replace a unit's schedule wholesale ([`publish`]), overwrite
//! individual days ([`edit_day`]) or wipe it ([`delete`]). The RJM schedule
//! has matching helpers. All functions validate completely before mutating,
//! so a rejected call leaves the schedule untouched.
//!
//! Manual entries are checked against the roster only; eligibility is the
//! administrator's call.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::schedule::{
    empty_rjm_schedule, DayEntry, DayPattern, DayPatterns, Publication, RjmEntry, Schedule,
};
use crate::error::{Error, Result};
use crate::models::{find_person, Period, Person, PersonId, Slot};

fn require_in_roster(
    roster: &[Person],
    id: &PersonId,
    context: impl FnOnce() -> String,
) -> Result<()> {
    if find_person(roster, id).is_none() {
        return Err(Error::validation(format!(
            "'{id}' is not in the roster ({})",
            context()
        )));
    }
    Ok(())
}

fn validate_day_shape(day: &DayEntry, patterns: &DayPatterns) -> Result<()> {
    let actual = day.date.weekday();
    if day.weekday != actual {
        return Err(Error::validation(format!(
            "day {} is a {actual}, not a {}",
            day.date, day.weekday
        )));
    }

    let expected = match patterns.classify(actual) {
        DayPattern::TwoPhase => BTreeSet::from([Slot::Prelude, Slot::Service]),
        DayPattern::SinglePhase => BTreeSet::from([Slot::Single]),
        DayPattern::Off => {
            return Err(Error::validation(format!(
                "day {} falls on {actual}, which has no service",
                day.date
            )))
        }
    };
    let slots: BTreeSet<Slot> = day.slots.keys().copied().collect();
    if slots != expected {
        let names: Vec<String> = expected.iter().map(Slot::to_string).collect();
        return Err(Error::validation(format!(
            "day {} must carry exactly the slots {}",
            day.date,
            names.join(", ")
        )));
    }
    Ok(())
}

// ============================================================================
// Main Schedule
// ============================================================================

/// Replace the schedule with `days` and stamp the publication
pub fn publish(
    schedule: &mut Schedule,
    mut days: Vec<DayEntry>,
    patterns: &DayPatterns,
    roster: &[Person],
    actor: &PersonId,
    now: DateTime<Utc>,
) -> Result<()> {
    if days.is_empty() {
        return Err(Error::validation("cannot publish an empty schedule"));
    }

    let mut seen = BTreeSet::new();
    for day in &days {
        if !seen.insert(day.date) {
            return Err(Error::validation(format!(
                "date {} appears more than once",
                day.date
            )));
        }
        validate_day_shape(day, patterns)?;
        for (slot, assignee) in &day.slots {
            if let Some(id) = assignee {
                require_in_roster(roster, id, || format!("{} {slot}", day.date))?;
            }
        }
    }

    days.sort_by_key(|d| d.date);
    schedule.days = days;
    schedule.publication = Some(Publication {
        published_at: now,
        published_by: actor.clone(),
    });

    tracing::info!(
        days = schedule.days.len(),
        actor = %actor,
        "Schedule published"
    );
    Ok(())
}

/// Overwrite slots of one existing day
///
/// Overwritten slots lose their exchange marker. An empty `updates` map is a
/// no-op.
pub fn edit_day(
    schedule: &mut Schedule,
    date: NaiveDate,
    updates: &BTreeMap<Slot, Option<PersonId>>,
    roster: &[Person],
) -> Result<()> {
    let day = schedule
        .day_mut(date)
        .ok_or_else(|| Error::not_found("schedule day", date))?;

    for (slot, assignee) in updates {
        if !day.has_slot(*slot) {
            return Err(Error::validation(format!(
                "slot '{slot}' does not exist on {date}"
            )));
        }
        if let Some(id) = assignee {
            require_in_roster(roster, id, || format!("{date} {slot}"))?;
        }
    }

    for (slot, assignee) in updates {
        day.set(*slot, assignee.clone())?;
        day.via_exchange.remove(slot);
    }

    tracing::debug!(date = %date, slots = updates.len(), "Schedule day edited");
    Ok(())
}

/// Clear the schedule and its publication, returning the previous state
pub fn delete(schedule: &mut Schedule) -> Result<Schedule> {
    if schedule.is_empty() {
        return Err(Error::empty_state("the schedule is empty"));
    }
    Ok(std::mem::take(schedule))
}

// ============================================================================
// RJM Schedule
// ============================================================================

/// Replace the RJM schedule with one unassigned entry per `weekday` in the period
pub fn create_rjm(
    rjm: &mut Vec<RjmEntry>,
    period: Option<&Period>,
    weekday: Weekday,
) -> Result<usize> {
    let period = period.ok_or_else(|| Error::validation("the unit has no period configured"))?;
    *rjm = empty_rjm_schedule(period, weekday);
    tracing::info!(period = %period, entries = rjm.len(), "RJM schedule created");
    Ok(rjm.len())
}

/// Assign several RJM entries at once, all or nothing
///
/// `changes` maps entry id to new assignee. Changed entries lose their
/// exchange marker.
pub fn update_rjm(
    rjm: &mut [RjmEntry],
    changes: &BTreeMap<String, Option<PersonId>>,
    roster: &[Person],
) -> Result<usize> {
    if changes.is_empty() {
        return Err(Error::validation("no RJM changes given"));
    }

    let positions: HashMap<&str, usize> = rjm
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.as_str(), i))
        .collect();

    let mut resolved = Vec::with_capacity(changes.len());
    for (id, assignee) in changes {
        let index = *positions
            .get(id.as_str())
            .ok_or_else(|| Error::not_found("RJM entry", id))?;
        if let Some(person) = assignee {
            require_in_roster(roster, person, || format!("RJM entry {id}"))?;
        }
        resolved.push((index, assignee.clone()));
    }

    for (index, assignee) in resolved {
        let entry = &mut rjm[index];
        entry.assignee = assignee;
        entry.via_exchange = false;
    }

    tracing::debug!(updated = changes.len(), "RJM entries updated");
    Ok(changes.len())
}

/// Clear the RJM schedule, returning the removed entries
pub fn delete_rjm(rjm: &mut Vec<RjmEntry>) -> Result<Vec<RjmEntry>> {
    if rjm.is_empty() {
        return Err(Error::empty_state("the RJM schedule is empty"));
    }
    Ok(std::mem::take(rjm))
}
