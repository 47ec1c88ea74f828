//! The per-unit document
//!
//! Everything a unit owns lives in one [`UnitDocument`]. Mutations load the
//! whole document, change it in memory and write it back as a unit, so the
//! schedule, its publication stamp and the exchange list never drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AssignmentStore, ExchangeStore, PeriodProvider, RosterProvider, UnavailabilityProvider};
use crate::error::{Error, Result};
use crate::models::{Period, Person, UnavailabilityMark, UnavailabilitySet, UnitRef};
use crate::scheduler::exchange::ExchangeRequest;
use crate::scheduler::schedule::{Publication, RjmEntry, Schedule};

/// Persisted state of one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDocument {
    pub unit: UnitRef,

    #[serde(default)]
    pub roster: Vec<Person>,

    #[serde(default)]
    pub unavailability: Vec<UnavailabilityMark>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    #[serde(default)]
    pub schedule: Schedule,

    #[serde(default)]
    pub rjm: Vec<RjmEntry>,

    #[serde(default)]
    pub exchanges: Vec<ExchangeRequest>,

    pub updated_at: DateTime<Utc>,
}

impl UnitDocument {
    /// An empty unit
    pub fn new(unit: UnitRef) -> Self {
        Self {
            unit,
            roster: Vec::new(),
            unavailability: Vec::new(),
            period: None,
            schedule: Schedule::default(),
            rjm: Vec::new(),
            exchanges: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Storage key
    pub fn key(&self) -> &str {
        &self.unit.unit_id
    }
}

impl RosterProvider for UnitDocument {
    fn roster(&self) -> &[Person] {
        &self.roster
    }
}

impl UnavailabilityProvider for UnitDocument {
    fn unavailability(&self) -> UnavailabilitySet {
        self.unavailability.iter().collect()
    }
}

impl PeriodProvider for UnitDocument {
    fn period(&self) -> Option<Period> {
        self.period
    }
}

impl AssignmentStore for UnitDocument {
    fn assignments(&self) -> &Schedule {
        &self.schedule
    }

    fn put_assignments(&mut self, schedule: Schedule) -> Option<&Publication> {
        self.schedule = schedule;
        self.schedule.publication.as_ref()
    }

    fn clear_assignments(&mut self) -> Schedule {
        std::mem::take(&mut self.schedule)
    }
}

impl ExchangeStore for UnitDocument {
    fn exchanges(&self) -> &[ExchangeRequest] {
        &self.exchanges
    }

    fn append_exchange(&mut self, request: ExchangeRequest) {
        self.exchanges.push(request);
    }

    fn update_exchange(&mut self, request: ExchangeRequest) -> Result<()> {
        let slot = self
            .exchanges
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| Error::not_found("exchange request", request.id))?;
        *slot = request;
        Ok(())
    }
}
