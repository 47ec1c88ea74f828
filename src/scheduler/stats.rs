//! Per-person and per-status counters over stored schedules

use serde::Serialize;
use std::collections::BTreeMap;

use super::exchange::{ExchangeRequest, ExchangeStatus};
use super::schedule::{RjmEntry, Schedule};
use crate::models::{Person, PersonId, Slot};

/// How often one person appears in the schedules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonStats {
    pub person_id: PersonId,
    pub name: String,
    pub prelude: u32,
    pub service: u32,
    pub single: u32,
    pub rjm: u32,
    pub total: u32,
}

impl PersonStats {
    fn new(person_id: PersonId, name: String) -> Self {
        Self {
            person_id,
            name,
            ..Default::default()
        }
    }

    fn count(&mut self, slot: Slot) {
        match slot {
            Slot::Prelude => self.prelude += 1,
            Slot::Service => self.service += 1,
            Slot::Single => self.single += 1,
        }
        self.total += 1;
    }
}

/// Running tallies keyed by roster position, with stragglers kept apart
struct Tally<'a> {
    roster: &'a [Person],
    known: Vec<PersonStats>,
    departed: BTreeMap<PersonId, PersonStats>,
}

impl<'a> Tally<'a> {
    fn new(roster: &'a [Person]) -> Self {
        Self {
            roster,
            known: roster
                .iter()
                .map(|p| PersonStats::new(p.id.clone(), p.name.clone()))
                .collect(),
            departed: BTreeMap::new(),
        }
    }

    fn stats_mut(&mut self, id: &PersonId) -> &mut PersonStats {
        match self.roster.iter().position(|p| &p.id == id) {
            Some(i) => &mut self.known[i],
            None => self
                .departed
                .entry(id.clone())
                .or_insert_with(|| PersonStats::new(id.clone(), id.to_string())),
        }
    }

    fn finish(mut self) -> Vec<PersonStats> {
        self.known.extend(self.departed.into_values());
        self.known
    }
}

/// Count assignments per person
///
/// Roster members come first in roster order, even with zero assignments.
/// Identities no longer in the roster follow, ordered by id.
pub fn schedule_stats(
    schedule: &Schedule,
    rjm: &[RjmEntry],
    roster: &[Person],
) -> Vec<PersonStats> {
    let mut tally = Tally::new(roster);

    for day in &schedule.days {
        for (slot, assignee) in &day.slots {
            if let Some(id) = assignee {
                tally.stats_mut(id).count(*slot);
            }
        }
    }

    for id in rjm.iter().filter_map(|e| e.assignee.as_ref()) {
        let stats = tally.stats_mut(id);
        stats.rjm += 1;
        stats.total += 1;
    }

    tally.finish()
}

/// Number of exchange requests in each status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeStats {
    pub by_status: BTreeMap<ExchangeStatus, usize>,
    pub total: usize,
}

pub fn exchange_stats(requests: &[ExchangeRequest]) -> ExchangeStats {
    let mut by_status: BTreeMap<ExchangeStatus, usize> =
        ExchangeStatus::all().into_iter().map(|s| (s, 0)).collect();
    for request in requests {
        *by_status.entry(request.status).or_default() += 1;
    }
    ExchangeStats {
        by_status,
        total: requests.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::schedule::DayEntry;
    use chrono::{NaiveDate, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn id(s: &str) -> Option<PersonId> {
        Some(PersonId::from(s))
    }

    #[test]
    fn test_schedule_stats_counts_every_slot() {
        let roster = vec![
            Person::new("alice", "Alice"),
            Person::new("bob", "Bob"),
            Person::new("carla", "Carla"),
        ];
        let schedule = Schedule {
            days: vec![
                DayEntry::two_phase(date(2025, 10, 5), id("alice"), id("alice")),
                DayEntry::single(date(2025, 10, 7), id("bob")),
                DayEntry::two_phase(date(2025, 10, 12), None, id("ghost")),
            ],
            publication: None,
        };
        let rjm = vec![RjmEntry {
            id: "rjm_1".to_string(),
            date: date(2025, 10, 5),
            weekday: Weekday::Sun,
            assignee: id("bob"),
            via_exchange: false,
        }];

        let stats = schedule_stats(&schedule, &rjm, &roster);
        assert_eq!(stats.len(), 4);

        assert_eq!(stats[0].name, "Alice");
        assert_eq!((stats[0].prelude, stats[0].service, stats[0].total), (1, 1, 2));
        assert_eq!((stats[1].single, stats[1].rjm, stats[1].total), (1, 1, 2));
        assert_eq!(stats[2].total, 0);
        assert_eq!(stats[3].name, "ghost");
        assert_eq!(stats[3].service, 1);
    }

    #[test]
    fn test_exchange_stats_lists_every_status() {
        let stats = exchange_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_status.len(), 5);
        assert!(stats.by_status.values().all(|n| *n == 0));
    }
}
