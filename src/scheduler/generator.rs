//! Period-wide schedule generation
//!
//! Walks every date of a [`Period`], classifies it with [`DayPatterns`] and
//! fills its slots with [`allocator::pick`]. Two-phase days use one usage
//! counter per phase type; single-phase days use their own counter and need a
//! person eligible for both phase types.
//!
//! When one phase of a two-phase day has no candidate, the person chosen for
//! the other phase covers it as well, provided they are eligible for the empty
//! phase. Covering does not touch the usage counters.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::allocator::{self, UsageCounter};
use super::eligibility::{EligibilityEvaluator, NoSpecialRule, SpecialRule};
use super::schedule::{DayEntry, DayPattern, DayPatterns};
use crate::models::{Period, Person, PhaseType, UnavailabilitySet};

// ============================================================================
// Decision Log
// ============================================================================

/// Kind of event recorded while generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Rejected,
    Selected,
    NoCandidate,
    Covered,
    CannotCover,
}

/// One human-readable line of the decision log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub date: NaiveDate,
    pub kind: DecisionKind,
    pub message: String,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.date, self.message)
    }
}

// ============================================================================
// Counters
// ============================================================================

/// Usage counters owned by one generation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationCounters {
    pub prelude: UsageCounter,
    pub service: UsageCounter,
    pub single: UsageCounter,
}

impl GenerationCounters {
    fn for_phase(&mut self, phase: PhaseType) -> &mut UsageCounter {
        match phase {
            PhaseType::Prelude => &mut self.prelude,
            PhaseType::Service => &mut self.service,
        }
    }
}

/// Result of a generation run: a draft schedule plus diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSchedule {
    pub days: Vec<DayEntry>,
    pub decisions: Vec<Decision>,
    pub counters: GenerationCounters,
}

impl GeneratedSchedule {
    /// Decision log rendered one line per event
    pub fn log_lines(&self) -> Vec<String> {
        self.decisions.iter().map(|d| d.to_string()).collect()
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Fills a period with fair assignments
pub struct ScheduleGenerator {
    patterns: DayPatterns,
    rule: Box<dyn SpecialRule>,
}

impl ScheduleGenerator {
    pub fn new(patterns: DayPatterns) -> Self {
        Self {
            patterns,
            rule: Box::new(NoSpecialRule),
        }
    }

    pub fn patterns(&self) -> &DayPatterns {
        &self.patterns
    }

    /// Replace the default accept-everybody special rule
    pub fn with_rule(mut self, rule: Box<dyn SpecialRule>) -> Self {
        self.rule = rule;
        self
    }

    /// Generate a draft for every date in `period`
    pub fn generate(
        &self,
        period: &Period,
        roster: &[Person],
        unavailable: &UnavailabilitySet,
    ) -> GeneratedSchedule {
        let evaluator = EligibilityEvaluator::new(unavailable, self.rule.as_ref());
        let mut run = Run {
            evaluator,
            roster,
            counters: GenerationCounters::default(),
            decisions: Vec::new(),
        };

        let mut days = Vec::new();
        for date in period.days() {
            let weekday = date.weekday();
            match self.patterns.classify(weekday) {
                DayPattern::TwoPhase => days.push(run.two_phase_day(date)),
                DayPattern::SinglePhase => days.push(run.single_phase_day(date)),
                DayPattern::Off => {}
            }
        }

        tracing::info!(
            period = %period,
            days = days.len(),
            decisions = run.decisions.len(),
            "Schedule draft generated"
        );

        GeneratedSchedule {
            days,
            decisions: run.decisions,
            counters: run.counters,
        }
    }
}

impl Default for ScheduleGenerator {
    fn default() -> Self {
        Self::new(DayPatterns::default())
    }
}

/// State of a single generation run
struct Run<'a> {
    evaluator: EligibilityEvaluator<'a>,
    roster: &'a [Person],
    counters: GenerationCounters,
    decisions: Vec<Decision>,
}

impl<'a> Run<'a> {
    fn log(&mut self, date: NaiveDate, kind: DecisionKind, message: String) {
        tracing::debug!(date = %date, kind = ?kind, "{message}");
        self.decisions.push(Decision {
            date,
            kind,
            message,
        });
    }

    /// Eligible candidates in roster order, logging every rejection
    fn candidates(
        &mut self,
        date: NaiveDate,
        phases: &[PhaseType],
        label: &str,
    ) -> Vec<&'a Person> {
        let mut eligible = Vec::new();
        for person in self.roster {
            match self.evaluator.check_all(person, date, phases) {
                Ok(()) => eligible.push(person),
                Err(reason) => self.log(
                    date,
                    DecisionKind::Rejected,
                    format!("{} skipped for {label}: {reason}", person.name),
                ),
            }
        }
        eligible
    }

    fn two_phase_day(&mut self, date: NaiveDate) -> DayEntry {
        let mut primary: BTreeMap<PhaseType, Option<&'a Person>> = BTreeMap::new();

        for phase in PhaseType::all() {
            let candidates = self.candidates(date, &[phase], phase.id());
            let chosen = allocator::pick(&candidates, self.counters.for_phase(phase));
            match chosen {
                Some(person) => {
                    let count = self.counters.for_phase(phase).get(&person.id);
                    self.log(
                        date,
                        DecisionKind::Selected,
                        format!("{} -> {phase} (played {count}x)", person.name),
                    );
                }
                None => {
                    tracing::warn!(date = %date, phase = %phase, "No candidate for phase");
                    self.log(
                        date,
                        DecisionKind::NoCandidate,
                        format!("no candidate for {phase}"),
                    );
                }
            }
            primary.insert(phase, chosen);
        }

        let mut assigned = primary.clone();
        for phase in PhaseType::all() {
            if primary[&phase].is_some() {
                continue;
            }
            let other = phase.other();
            let Some(cover) = primary[&other] else {
                continue;
            };
            match self.evaluator.check(cover, date, phase) {
                Ok(()) => {
                    assigned.insert(phase, Some(cover));
                    self.log(
                        date,
                        DecisionKind::Covered,
                        format!("{} covers {phase} from {other}", cover.name),
                    );
                }
                Err(reason) => self.log(
                    date,
                    DecisionKind::CannotCover,
                    format!("{} cannot cover {phase}: {reason}", cover.name),
                ),
            }
        }

        let id_of = |phase: PhaseType| assigned[&phase].map(|p| p.id.clone());
        DayEntry::two_phase(date, id_of(PhaseType::Prelude), id_of(PhaseType::Service))
    }

    fn single_phase_day(&mut self, date: NaiveDate) -> DayEntry {
        let candidates = self.candidates(date, &PhaseType::all(), "single");
        let chosen = allocator::pick(&candidates, &mut self.counters.single);

        match chosen {
            Some(person) => {
                let count = self.counters.single.get(&person.id);
                self.log(
                    date,
                    DecisionKind::Selected,
                    format!("{} -> single (played {count}x)", person.name),
                );
            }
            None => {
                tracing::warn!(date = %date, "No candidate for single slot");
                self.log(
                    date,
                    DecisionKind::NoCandidate,
                    "no candidate for single".to_string(),
                );
            }
        }

        DayEntry::single(date, chosen.map(|p| p.id.clone()))
    }
}
