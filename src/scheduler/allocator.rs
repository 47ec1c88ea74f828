//! Least-used-first selection among eligible candidates

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Person, PersonId};

/// Running count of primary assignments per person for one phase type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UsageCounter(HashMap<PersonId, u32>);

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PersonId) -> u32 {
        self.0.get(id).copied().unwrap_or(0)
    }

    /// Increment and return the new count
    pub fn increment(&mut self, id: &PersonId) -> u32 {
        let count = self.0.entry(id.clone()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonId, &u32)> {
        self.0.iter()
    }
}

/// Pick the candidate with the fewest prior assignments
///
/// Ties keep input order. The chosen person's counter is incremented.
pub fn pick<'a>(candidates: &[&'a Person], counter: &mut UsageCounter) -> Option<&'a Person> {
    let mut ranked: Vec<&'a Person> = candidates.to_vec();
    // sort_by_key is stable
    ranked.sort_by_key(|p| counter.get(&p.id));

    let chosen = ranked.into_iter().next()?;
    counter.increment(&chosen.id);
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Vec<Person> {
        vec![
            Person::new("alice", "Alice"),
            Person::new("bob", "Bob"),
            Person::new("carla", "Carla"),
        ]
    }

    #[test]
    fn test_pick_empty() {
        let mut counter = UsageCounter::new();
        assert!(pick(&[], &mut counter).is_none());
        assert_eq!(counter.total(), 0);
    }

    #[test]
    fn test_pick_ties_keep_input_order() {
        let roster = people();
        let candidates: Vec<&Person> = roster.iter().collect();
        let mut counter = UsageCounter::new();

        let first = pick(&candidates, &mut counter).unwrap();
        assert_eq!(first.name, "Alice");
        assert_eq!(counter.get(&first.id), 1);
    }

    #[test]
    fn test_pick_least_used_first() {
        let roster = people();
        let candidates: Vec<&Person> = roster.iter().collect();
        let mut counter = UsageCounter::new();
        counter.increment(&PersonId::from("alice"));
        counter.increment(&PersonId::from("bob"));

        let chosen = pick(&candidates, &mut counter).unwrap();
        assert_eq!(chosen.name, "Carla");
    }

    #[test]
    fn test_pick_rotates_through_pool() {
        let roster = people();
        let candidates: Vec<&Person> = roster.iter().collect();
        let mut counter = UsageCounter::new();

        let names: Vec<String> = (0..6)
            .map(|_| pick(&candidates, &mut counter).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["Alice", "Bob", "Carla", "Alice", "Bob", "Carla"]);
        assert_eq!(counter.total(), 6);
    }
}
