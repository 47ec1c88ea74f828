//! Assignment allocation and exchange lifecycle
//!
//! This module holds the decision logic of the crate: who plays which slot,
//! how an administrator commits or overrides that, and how a held slot is
//! handed to somebody else.
//!
//! # Overview
//!
//! ```text
//!  Roster + Unavailability + Period
//!                 │
//!                 ▼
//!  ┌──────────────────────────────┐     ┌───────────────┐
//!  │      ScheduleGenerator       │────►│ Eligibility   │
//!  │  (per-date, per-phase loop)  │     └───────────────┘
//!  │                              │     ┌───────────────┐
//!  │                              │────►│ Allocator     │
//!  └──────────────┬───────────────┘     └───────────────┘
//!                 │ draft days + decision log
//!                 ▼
//!        publish / edit_day / delete
//!                 │ published schedule
//!                 ▼
//!        exchange state machine ──approve──► schedule mutated
//! ```
//!
//! # Modules
//!
//! - [`eligibility`] - Whether a person may take a phase on a date
//! - [`allocator`] - Least-used-first pick among eligible candidates
//! - [`generator`] - Period-wide generation with coverage fallback
//! - [`schedule`] - Day entries, RJM entries and weekday patterns
//! - [`publish`] - Manual publish, edit and delete
//! - [`exchange`] - Swap/substitution request lifecycle
//! - [`stats`] - Per-person and per-status counts
//!
//! # Quick Start
//!
//! ```ignore
//! use rota::scheduler::{DayPatterns, ScheduleGenerator};
//!
//! let generator = ScheduleGenerator::new(DayPatterns::default());
//! let draft = generator.generate(&period, &roster, &unavailable);
//! for line in draft.log_lines() {
//!     println!("{line}");
//! }
//! ```

pub mod allocator;
pub mod eligibility;
pub mod exchange;
pub mod generator;
pub mod publish;
pub mod schedule;
pub mod stats;

// Re-export main types
pub use allocator::{pick, UsageCounter};
pub use eligibility::{is_eligible, EligibilityEvaluator, Ineligibility, NoSpecialRule, SpecialRule};
pub use exchange::{
    validate_transition, valid_actions, ExchangeAction, ExchangeActor, ExchangeContext,
    ExchangeKind, ExchangeMode, ExchangeRequest, ExchangeStatus, HistoryEntry, NewExchange,
};
pub use generator::{
    Decision, DecisionKind, GeneratedSchedule, GenerationCounters, ScheduleGenerator,
};
pub use schedule::{
    DayEntry, DayPattern, DayPatterns, DayView, Publication, RjmEntry, RjmView, Schedule,
};
pub use stats::{exchange_stats, schedule_stats, ExchangeStats, PersonStats};
