//! Core data structures shared by the scheduler, storage and service layers

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// ============================================================================
// Identities
// ============================================================================

/// Stable identity of a person (organist) within a unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Position of a unit inside the region → sub-region → unit hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRef {
    pub region_id: String,
    pub sub_region_id: String,
    pub unit_id: String,
}

impl UnitRef {
    pub fn new(
        region_id: impl Into<String>,
        sub_region_id: impl Into<String>,
        unit_id: impl Into<String>,
    ) -> Self {
        Self {
            region_id: region_id.into(),
            sub_region_id: sub_region_id.into(),
            unit_id: unit_id.into(),
        }
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region_id, self.sub_region_id, self.unit_id)
    }
}

impl FromStr for UnitRef {
    type Err = Error;

    /// Parse `region/sub_region/unit`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [region, sub_region, unit]
                if !region.is_empty() && !sub_region.is_empty() && !unit.is_empty() =>
            {
                Ok(Self::new(*region, *sub_region, *unit))
            }
            _ => Err(Error::validation(format!(
                "unit reference '{s}' must look like region/sub_region/unit"
            ))),
        }
    }
}

// ============================================================================
// Phases and Slots
// ============================================================================

/// Kind of duty a person may be permitted to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    /// Short segment before the main service
    Prelude,
    /// The main service
    Service,
}

impl PhaseType {
    /// Both phase types, in day order
    pub fn all() -> [Self; 2] {
        [Self::Prelude, Self::Service]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Prelude => "prelude",
            Self::Service => "service",
        }
    }

    /// The other phase of a two-phase day
    pub fn other(&self) -> Self {
        match self {
            Self::Prelude => Self::Service,
            Self::Service => Self::Prelude,
        }
    }
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PhaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "prelude" | "short" | "meia_hora" | "meia-hora" => Ok(Self::Prelude),
            "service" | "main" | "culto" => Ok(Self::Service),
            _ => Err(Error::validation(format!(
                "unknown phase type '{s}' (expected prelude or service)"
            ))),
        }
    }
}

/// A fillable position inside one schedule day
///
/// Two-phase days carry `Prelude` and `Service`; single-phase days and RJM
/// entries carry one `Single` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Prelude,
    Service,
    Single,
}

impl Slot {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Prelude => "prelude",
            Self::Service => "service",
            Self::Single => "single",
        }
    }

    /// Phase types a person must hold to fill this slot
    pub fn required_phase_types(&self) -> &'static [PhaseType] {
        match self {
            Self::Prelude => &[PhaseType::Prelude],
            Self::Service => &[PhaseType::Service],
            Self::Single => &[PhaseType::Prelude, PhaseType::Service],
        }
    }
}

impl From<PhaseType> for Slot {
    fn from(phase: PhaseType) -> Self {
        match phase {
            PhaseType::Prelude => Self::Prelude,
            PhaseType::Service => Self::Service,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "single" | "unica" => Ok(Self::Single),
            other => other.parse::<PhaseType>().map(Self::from).map_err(|_| {
                Error::validation(format!(
                    "unknown slot '{s}' (expected prelude, service or single)"
                ))
            }),
        }
    }
}

// ============================================================================
// Person
// ============================================================================

/// A person who can be assigned to services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,

    /// Display name shown on schedules
    pub name: String,

    /// Weekdays the person opted into
    #[serde(default)]
    pub weekdays: HashSet<Weekday>,

    /// Phase types the person opted into
    #[serde(default)]
    pub phases: HashSet<PhaseType>,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PersonId::new(id),
            name: name.into(),
            weekdays: HashSet::new(),
            phases: HashSet::new(),
        }
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays.extend(weekdays);
        self
    }

    pub fn with_phases(mut self, phases: impl IntoIterator<Item = PhaseType>) -> Self {
        self.phases.extend(phases);
        self
    }

    pub fn plays_on(&self, weekday: Weekday) -> bool {
        self.weekdays.contains(&weekday)
    }

    pub fn plays_phase(&self, phase: PhaseType) -> bool {
        self.phases.contains(&phase)
    }
}

/// Look up a person by identity
pub fn find_person<'a>(roster: &'a [Person], id: &PersonId) -> Option<&'a Person> {
    roster.iter().find(|p| &p.id == id)
}

// ============================================================================
// Period
// ============================================================================

/// Inclusive calendar interval all generation and unavailability is bounded by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Create a period, rejecting an end before the start
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::validation(format!(
                "period start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every calendar day in the period, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Every occurrence of `weekday` in the period
    pub fn dates_on(&self, weekday: Weekday) -> Vec<NaiveDate> {
        self.days().filter(|d| d.weekday() == weekday).collect()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================================
// Unavailability
// ============================================================================

/// A person declaring they cannot play on a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailabilityMark {
    pub person_id: PersonId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Who recorded the mark
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<PersonId>,
}

/// Set of (person, date) pairs a person cannot be assigned on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnavailabilitySet(HashSet<(PersonId, NaiveDate)>);

impl UnavailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, person: PersonId, date: NaiveDate) -> bool {
        self.0.insert((person, date))
    }

    pub fn contains(&self, person: &PersonId, date: NaiveDate) -> bool {
        // Tuple lookup needs an owned key; sets are small enough per unit
        self.0.contains(&(person.clone(), date))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a UnavailabilityMark> for UnavailabilitySet {
    fn from_iter<I: IntoIterator<Item = &'a UnavailabilityMark>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|m| (m.person_id.clone(), m.date))
                .collect(),
        )
    }
}

impl FromIterator<(PersonId, NaiveDate)> for UnavailabilitySet {
    fn from_iter<I: IntoIterator<Item = (PersonId, NaiveDate)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_rejects_inverted_range() {
        let err = Period::new(date(2025, 10, 7), date(2025, 10, 1)).unwrap_err();
        assert!(err.to_string().contains("after its end"));
    }

    #[test]
    fn test_period_days_inclusive() {
        let period = Period::new(date(2025, 10, 1), date(2025, 10, 7)).unwrap();
        let days: Vec<_> = period.days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(days.first(), Some(&date(2025, 10, 1)));
        assert_eq!(days.last(), Some(&date(2025, 10, 7)));
    }

    #[test]
    fn test_period_dates_on_weekday() {
        let period = Period::new(date(2025, 10, 1), date(2025, 10, 31)).unwrap();
        let sundays = period.dates_on(Weekday::Sun);
        assert_eq!(
            sundays,
            vec![
                date(2025, 10, 5),
                date(2025, 10, 12),
                date(2025, 10, 19),
                date(2025, 10, 26)
            ]
        );
    }

    #[test]
    fn test_unit_ref_parsing() {
        let unit: UnitRef = "north/north-east/central".parse().unwrap();
        assert_eq!(unit.sub_region_id, "north-east");
        assert_eq!(unit.to_string(), "north/north-east/central");
        assert!("north/central".parse::<UnitRef>().is_err());
        assert!("a//b".parse::<UnitRef>().is_err());
    }

    #[test]
    fn test_slot_parsing() {
        assert_eq!("prelude".parse::<Slot>().unwrap(), Slot::Prelude);
        assert_eq!("culto".parse::<Slot>().unwrap(), Slot::Service);
        assert_eq!("unica".parse::<Slot>().unwrap(), Slot::Single);
        assert!("evening".parse::<Slot>().is_err());
    }

    #[test]
    fn test_single_slot_requires_both_phases() {
        assert_eq!(
            Slot::Single.required_phase_types(),
            &[PhaseType::Prelude, PhaseType::Service]
        );
        assert_eq!(Slot::Prelude.required_phase_types(), &[PhaseType::Prelude]);
    }

    #[test]
    fn test_unavailability_set_lookup() {
        let marks = vec![UnavailabilityMark {
            person_id: PersonId::from("alice"),
            date: date(2025, 10, 5),
            reason: None,
            author: None,
        }];
        let set: UnavailabilitySet = marks.iter().collect();
        assert!(set.contains(&PersonId::from("alice"), date(2025, 10, 5)));
        assert!(!set.contains(&PersonId::from("alice"), date(2025, 10, 12)));
        assert!(!set.contains(&PersonId::from("bob"), date(2025, 10, 5)));
    }

    #[test]
    fn test_person_serde_weekdays() {
        let json = r#"{"id":"alice","name":"Alice","weekdays":["Sun","Tue"],"phases":["prelude"]}"#;
        let person: Person = serde_json::from_str(json).unwrap();
        assert!(person.plays_on(Weekday::Sun));
        assert!(person.plays_on(Weekday::Tue));
        assert!(!person.plays_on(Weekday::Wed));
        assert!(person.plays_phase(PhaseType::Prelude));
        assert!(!person.plays_phase(PhaseType::Service));
    }
}
