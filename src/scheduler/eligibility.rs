//! Eligibility rules for assigning a person to a slot
//!
//! A person may play a phase on a date when they opted into that phase type,
//! opted into that weekday, and have not marked themself unavailable on that
//! date. Deployments may plug in an extra [`SpecialRule`]; the default one
//! accepts everybody.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;

use crate::models::{Person, PhaseType, UnavailabilitySet};

/// Why a person cannot take a phase on a date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    PhaseNotPermitted(PhaseType),
    WeekdayNotPermitted(Weekday),
    Unavailable,
    SpecialRule(String),
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhaseNotPermitted(phase) => write!(f, "not enabled for {phase}"),
            Self::WeekdayNotPermitted(day) => write!(f, "does not play on {day}"),
            Self::Unavailable => write!(f, "marked unavailable"),
            Self::SpecialRule(reason) => write!(f, "special rule: {reason}"),
        }
    }
}

/// Per-person custom constraint hook
pub trait SpecialRule: Send + Sync {
    /// Return `Err(reason)` to exclude the person
    fn check(&self, person: &Person, date: NaiveDate, phase: PhaseType) -> Result<(), String>;
}

/// Accepts every person
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpecialRule;

impl SpecialRule for NoSpecialRule {
    fn check(&self, _person: &Person, _date: NaiveDate, _phase: PhaseType) -> Result<(), String> {
        Ok(())
    }
}

/// Check every eligibility rule, reporting the first one that fails
pub fn check(
    person: &Person,
    date: NaiveDate,
    phase: PhaseType,
    unavailable: &UnavailabilitySet,
) -> Result<(), Ineligibility> {
    if !person.plays_phase(phase) {
        return Err(Ineligibility::PhaseNotPermitted(phase));
    }
    let weekday = date.weekday();
    if !person.plays_on(weekday) {
        return Err(Ineligibility::WeekdayNotPermitted(weekday));
    }
    if unavailable.contains(&person.id, date) {
        return Err(Ineligibility::Unavailable);
    }
    Ok(())
}

/// Whether `person` may be assigned `phase` on `date`
pub fn is_eligible(
    person: &Person,
    date: NaiveDate,
    phase: PhaseType,
    unavailable: &UnavailabilitySet,
) -> bool {
    check(person, date, phase, unavailable).is_ok()
}

/// Eligibility bound to one unavailability set and special rule
pub struct EligibilityEvaluator<'a> {
    unavailable: &'a UnavailabilitySet,
    rule: &'a dyn SpecialRule,
}

impl<'a> EligibilityEvaluator<'a> {
    pub fn new(unavailable: &'a UnavailabilitySet, rule: &'a dyn SpecialRule) -> Self {
        Self { unavailable, rule }
    }

    pub fn check(
        &self,
        person: &Person,
        date: NaiveDate,
        phase: PhaseType,
    ) -> Result<(), Ineligibility> {
        check(person, date, phase, self.unavailable)?;
        self.rule
            .check(person, date, phase)
            .map_err(Ineligibility::SpecialRule)
    }

    /// Check a person against several phase types at once
    pub fn check_all(
        &self,
        person: &Person,
        date: NaiveDate,
        phases: &[PhaseType],
    ) -> Result<(), Ineligibility> {
        phases
            .iter()
            .try_for_each(|phase| self.check(person, date, *phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonId;

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 5).unwrap()
    }

    fn alice() -> Person {
        Person::new("alice", "Alice")
            .with_weekdays([Weekday::Sun, Weekday::Tue])
            .with_phases([PhaseType::Prelude, PhaseType::Service])
    }

    #[test]
    fn test_eligible_when_all_rules_pass() {
        let none = UnavailabilitySet::new();
        assert!(is_eligible(&alice(), sunday(), PhaseType::Prelude, &none));
        assert!(is_eligible(&alice(), sunday(), PhaseType::Service, &none));
    }

    #[test]
    fn test_phase_not_permitted() {
        let bob = Person::new("bob", "Bob")
            .with_weekdays([Weekday::Sun])
            .with_phases([PhaseType::Service]);
        let none = UnavailabilitySet::new();
        assert_eq!(
            check(&bob, sunday(), PhaseType::Prelude, &none),
            Err(Ineligibility::PhaseNotPermitted(PhaseType::Prelude))
        );
    }

    #[test]
    fn test_weekday_not_permitted() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let none = UnavailabilitySet::new();
        assert_eq!(
            check(&alice(), wednesday, PhaseType::Service, &none),
            Err(Ineligibility::WeekdayNotPermitted(Weekday::Wed))
        );
    }

    #[test]
    fn test_unavailable() {
        let mut marks = UnavailabilitySet::new();
        marks.insert(PersonId::from("alice"), sunday());
        assert_eq!(
            check(&alice(), sunday(), PhaseType::Service, &marks),
            Err(Ineligibility::Unavailable)
        );
    }

    #[test]
    fn test_is_eligible_is_deterministic() {
        let mut marks = UnavailabilitySet::new();
        marks.insert(PersonId::from("alice"), sunday());
        let first = is_eligible(&alice(), sunday(), PhaseType::Prelude, &marks);
        let second = is_eligible(&alice(), sunday(), PhaseType::Prelude, &marks);
        assert_eq!(first, second);
        assert_eq!(marks.len(), 1);
    }

    struct NoAlice;

    impl SpecialRule for NoAlice {
        fn check(&self, person: &Person, _: NaiveDate, _: PhaseType) -> Result<(), String> {
            if person.name == "Alice" {
                Err("excluded".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_special_rule_hook() {
        let none = UnavailabilitySet::new();
        let default_rule = NoSpecialRule;
        let evaluator = EligibilityEvaluator::new(&none, &default_rule);
        assert!(evaluator.check(&alice(), sunday(), PhaseType::Prelude).is_ok());

        let strict = NoAlice;
        let evaluator = EligibilityEvaluator::new(&none, &strict);
        assert_eq!(
            evaluator.check(&alice(), sunday(), PhaseType::Prelude),
            Err(Ineligibility::SpecialRule("excluded".to_string()))
        );
    }

    #[test]
    fn test_check_all_requires_every_phase() {
        let bob = Person::new("bob", "Bob")
            .with_weekdays([Weekday::Tue])
            .with_phases([PhaseType::Service]);
        let tuesday = NaiveDate::from_ymd_opt(2025, 10, 7).unwrap();
        let none = UnavailabilitySet::new();
        let rule = NoSpecialRule;
        let evaluator = EligibilityEvaluator::new(&none, &rule);
        assert!(evaluator
            .check_all(&alice(), tuesday, &PhaseType::all())
            .is_ok());
        assert!(evaluator.check_all(&bob, tuesday, &PhaseType::all()).is_err());
    }
}
