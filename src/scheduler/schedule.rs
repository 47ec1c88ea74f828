//! Schedule data structures
//!
//! A unit's main schedule is a list of [`DayEntry`] values, one per calendar
//! date that has at least one slot, plus optional publication metadata. The
//! RJM schedule is a simpler list of [`RjmEntry`] values with a single
//! assignee each.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{Error, Result};
use crate::models::{find_person, Period, Person, PersonId, Slot};

// ============================================================================
// Day Patterns
// ============================================================================

/// How a weekday is split into slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPattern {
    /// Prelude and service, potentially different assignees
    TwoPhase,
    /// One assignee who must hold both phase types
    SinglePhase,
    /// No service on this weekday
    Off,
}

/// Weekday → [`DayPattern`] map for a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPatterns {
    two_phase: HashSet<Weekday>,
    single_phase: HashSet<Weekday>,
}

impl DayPatterns {
    /// Build a pattern map; a weekday may not be both two-phase and single-phase
    pub fn new(
        two_phase: impl IntoIterator<Item = Weekday>,
        single_phase: impl IntoIterator<Item = Weekday>,
    ) -> Result<Self> {
        let two_phase: HashSet<Weekday> = two_phase.into_iter().collect();
        let single_phase: HashSet<Weekday> = single_phase.into_iter().collect();

        if let Some(day) = two_phase.intersection(&single_phase).next() {
            return Err(Error::config(format!(
                "weekday {day} is configured as both two-phase and single-phase"
            )));
        }

        Ok(Self {
            two_phase,
            single_phase,
        })
    }

    pub fn classify(&self, weekday: Weekday) -> DayPattern {
        if self.two_phase.contains(&weekday) {
            DayPattern::TwoPhase
        } else if self.single_phase.contains(&weekday) {
            DayPattern::SinglePhase
        } else {
            DayPattern::Off
        }
    }
}

impl Default for DayPatterns {
    /// Sunday carries prelude and service, Tuesday a single combined slot
    fn default() -> Self {
        Self {
            two_phase: HashSet::from([Weekday::Sun]),
            single_phase: HashSet::from([Weekday::Tue]),
        }
    }
}

// ============================================================================
// Day Entry
// ============================================================================

/// Assignments for one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: NaiveDate,

    pub weekday: Weekday,

    /// Slot → assignee; the keys define which slots the day has
    pub slots: BTreeMap<Slot, Option<PersonId>>,

    /// Slots whose current assignee came from an approved exchange
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub via_exchange: BTreeSet<Slot>,
}

impl DayEntry {
    /// Create an entry for a two-phase day
    pub fn two_phase(
        date: NaiveDate,
        prelude: Option<PersonId>,
        service: Option<PersonId>,
    ) -> Self {
        Self {
            date,
            weekday: date.weekday(),
            slots: BTreeMap::from([(Slot::Prelude, prelude), (Slot::Service, service)]),
            via_exchange: BTreeSet::new(),
        }
    }

    /// Create an entry for a single-phase day
    pub fn single(date: NaiveDate, assignee: Option<PersonId>) -> Self {
        Self {
            date,
            weekday: date.weekday(),
            slots: BTreeMap::from([(Slot::Single, assignee)]),
            via_exchange: BTreeSet::new(),
        }
    }

    pub fn has_slot(&self, slot: Slot) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Current assignee of a slot (`None` when the slot is unfilled or absent)
    pub fn assignee(&self, slot: Slot) -> Option<&PersonId> {
        self.slots.get(&slot).and_then(|a| a.as_ref())
    }

    /// Overwrite a slot that exists on this day
    pub fn set(&mut self, slot: Slot, assignee: Option<PersonId>) -> Result<()> {
        match self.slots.get_mut(&slot) {
            Some(current) => {
                *current = assignee;
                Ok(())
            }
            None => Err(Error::validation(format!(
                "slot '{slot}' does not exist on {}",
                self.date
            ))),
        }
    }

    /// Every person referenced by this day
    pub fn assignees(&self) -> impl Iterator<Item = &PersonId> {
        self.slots.values().filter_map(|a| a.as_ref())
    }

    /// Resolve assignee identities to display names
    pub fn resolve(&self, roster: &[Person]) -> DayView {
        DayView {
            date: self.date,
            weekday: self.weekday,
            slots: self
                .slots
                .iter()
                .map(|(slot, assignee)| {
                    (*slot, assignee.as_ref().map(|id| display_name(roster, id)))
                })
                .collect(),
            via_exchange: self.via_exchange.clone(),
        }
    }
}

/// A [`DayEntry`] with display names in place of identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub slots: BTreeMap<Slot, Option<String>>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub via_exchange: BTreeSet<Slot>,
}

/// Display name for an identity; falls back to the raw id for removed people
pub fn display_name(roster: &[Person], id: &PersonId) -> String {
    find_person(roster, id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}

// ============================================================================
// Schedule
// ============================================================================

/// Who published the schedule, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub published_at: DateTime<Utc>,
    pub published_by: PersonId,
}

/// The main schedule of a unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub days: Vec<DayEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<Publication>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn is_published(&self) -> bool {
        self.publication.is_some()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayEntry> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn day_mut(&mut self, date: NaiveDate) -> Option<&mut DayEntry> {
        self.days.iter_mut().find(|d| d.date == date)
    }

    /// All days with display names resolved
    pub fn resolve(&self, roster: &[Person]) -> Vec<DayView> {
        self.days.iter().map(|d| d.resolve(roster)).collect()
    }
}

// ============================================================================
// RJM Schedule
// ============================================================================

/// One slot of the simplified single-assignee schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RjmEntry {
    /// Stable entry id (`rjm_1`, `rjm_2`, ...)
    pub id: String,

    pub date: NaiveDate,

    pub weekday: Weekday,

    #[serde(default)]
    pub assignee: Option<PersonId>,

    /// Current assignee came from an approved exchange
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub via_exchange: bool,
}

impl RjmEntry {
    pub fn resolve(&self, roster: &[Person]) -> RjmView {
        RjmView {
            id: self.id.clone(),
            date: self.date,
            weekday: self.weekday,
            assignee: self.assignee.as_ref().map(|id| display_name(roster, id)),
            via_exchange: self.via_exchange,
        }
    }
}

/// An [`RjmEntry`] with the assignee's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RjmView {
    pub id: String,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub via_exchange: bool,
}

/// Build an unassigned RJM schedule: one entry per occurrence of `weekday`
pub fn empty_rjm_schedule(period: &Period, weekday: Weekday) -> Vec<RjmEntry> {
    period
        .dates_on(weekday)
        .into_iter()
        .enumerate()
        .map(|(i, date)| RjmEntry {
            id: format!("rjm_{}", i + 1),
            date,
            weekday,
            assignee: None,
            via_exchange: false,
        })
        .collect()
}

/// Find the RJM entry for a date
pub fn rjm_entry_mut(entries: &mut [RjmEntry], date: NaiveDate) -> Option<&mut RjmEntry> {
    entries.iter_mut().find(|e| e.date == date)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_patterns() {
        let patterns = DayPatterns::default();
        assert_eq!(patterns.classify(Weekday::Sun), DayPattern::TwoPhase);
        assert_eq!(patterns.classify(Weekday::Tue), DayPattern::SinglePhase);
        assert_eq!(patterns.classify(Weekday::Wed), DayPattern::Off);
    }

    #[test]
    fn test_patterns_reject_overlap() {
        let err = DayPatterns::new([Weekday::Sun], [Weekday::Sun]).unwrap_err();
        assert!(err.to_string().contains("both two-phase and single-phase"));
    }

    #[test]
    fn test_day_entry_set_unknown_slot() {
        let mut day = DayEntry::single(date(2025, 10, 7), None);
        assert!(day.set(Slot::Single, Some(PersonId::from("alice"))).is_ok());
        assert!(day.set(Slot::Prelude, Some(PersonId::from("alice"))).is_err());
        assert_eq!(day.assignee(Slot::Single), Some(&PersonId::from("alice")));
    }

    #[test]
    fn test_day_entry_resolve_names() {
        let roster = vec![Person::new("alice", "Alice")];
        let day = DayEntry::two_phase(
            date(2025, 10, 5),
            Some(PersonId::from("alice")),
            Some(PersonId::from("ghost")),
        );
        let view = day.resolve(&roster);
        assert_eq!(view.slots[&Slot::Prelude].as_deref(), Some("Alice"));
        assert_eq!(view.slots[&Slot::Service].as_deref(), Some("ghost"));
    }

    #[test]
    fn test_empty_rjm_schedule() {
        let period = Period::new(date(2025, 10, 1), date(2025, 11, 30)).unwrap();
        let rjm = empty_rjm_schedule(&period, Weekday::Sun);
        assert_eq!(rjm.len(), 9);
        assert_eq!(rjm[0].id, "rjm_1");
        assert_eq!(rjm[0].date, date(2025, 10, 5));
        assert!(rjm.iter().all(|e| e.assignee.is_none()));
    }

    #[test]
    fn test_day_entry_json_shape() {
        let day = DayEntry::two_phase(date(2025, 10, 5), Some(PersonId::from("alice")), None);
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["weekday"], "Sun");
        assert_eq!(json["slots"]["prelude"], "alice");
        assert!(json["slots"]["service"].is_null());
        assert!(json.get("via_exchange").is_none());
    }
}
