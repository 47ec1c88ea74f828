//! Common test utilities

#![allow(dead_code)]

use chrono::{NaiveDate, Weekday};
use rota::audit::MemoryAuditSink;
use rota::auth::{Actor, Role, ScopeGate};
use rota::models::{Person, PhaseType, UnitRef};
use rota::service::RotaService;
use rota::storage::{DocumentStore, MemoryBackend};
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn unit() -> UnitRef {
    UnitRef::new("north", "centre", "u1")
}

/// Plays Sundays and Tuesdays, both phases
pub fn alice() -> Person {
    Person::new("alice", "Alice")
        .with_weekdays([Weekday::Sun, Weekday::Tue])
        .with_phases(PhaseType::all())
}

/// Plays Sunday services only
pub fn bob() -> Person {
    Person::new("bob", "Bob")
        .with_weekdays([Weekday::Sun])
        .with_phases([PhaseType::Service])
}

pub fn carla() -> Person {
    Person::new("carla", "Carla")
        .with_weekdays([Weekday::Sun])
        .with_phases(PhaseType::all())
}

pub fn dora() -> Person {
    Person::new("dora", "Dora")
        .with_weekdays([Weekday::Sun])
        .with_phases([PhaseType::Service])
}

pub fn master() -> Actor {
    Actor::new("admin", "Administrator", Role::Master)
}

pub fn organist(person: &Person) -> Actor {
    Actor::new(person.id.as_str(), person.name.as_str(), Role::Organist)
}

/// Service over an in-memory backend, with the audit sink exposed for inspection
pub fn memory_service() -> (RotaService, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    let store = DocumentStore::new(Arc::new(MemoryBackend::new()));
    let service = RotaService::new(store, Arc::new(ScopeGate), audit.clone());
    (service, audit)
}

/// A unit with a period and roster already in place
pub async fn seeded_service(
    start: NaiveDate,
    end: NaiveDate,
    roster: Vec<Person>,
) -> (RotaService, Arc<MemoryAuditSink>) {
    let (service, audit) = memory_service();
    let admin = master();
    let unit = unit();
    service.create_unit(&admin, &unit).await.unwrap();
    service.set_period(&admin, &unit, start, end).await.unwrap();
    for person in roster {
        service.add_person(&admin, &unit, person).await.unwrap();
    }
    (service, audit)
}
