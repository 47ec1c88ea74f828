//! Exchange (swap/substitution) state machine
//!
//! A person holding a slot asks someone else to take it over. The request
//! moves through the following states:
//!
//! ```text
//! pending ──accept──► accepted ──approve──► approved   (schedule mutated)
//!    │                   │
//!    ├──refuse──► refused ◄──reject──┤
//!    └──cancel──► cancelled ◄─cancel─┘
//! ```
//!
//! `refused`, `cancelled` and `approved` are terminal. Every transition bumps
//! `updated_at` and appends one [`HistoryEntry`].
//!
//! Authorization facts (administrator, management rights over the unit) are
//! decided by the caller and handed in through [`ExchangeActor`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::eligibility;
use super::schedule::{rjm_entry_mut, RjmEntry, Schedule};
use crate::error::{Error, Result};
use crate::models::{find_person, Person, PersonId, Slot, UnavailabilitySet};

// ============================================================================
// Types
// ============================================================================

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    Refused,
    Cancelled,
    Approved,
}

impl ExchangeStatus {
    pub fn all() -> [Self; 5] {
        [
            Self::Pending,
            Self::Accepted,
            Self::Refused,
            Self::Cancelled,
            Self::Approved,
        ]
    }

    /// Pending or accepted
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Refused => "refused",
            Self::Cancelled => "cancelled",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which schedule the referenced slot lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    MainSchedule,
    RjmSchedule,
}

impl std::str::FromStr for ExchangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "main" | "main_schedule" | "main-schedule" | "culto" => Ok(Self::MainSchedule),
            "rjm" | "rjm_schedule" | "rjm-schedule" => Ok(Self::RjmSchedule),
            _ => Err(Error::validation(format!(
                "unknown exchange kind '{s}' (expected main or rjm)"
            ))),
        }
    }
}

/// Descriptive flavour of the request; does not change the state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeMode {
    #[default]
    Substitution,
    Swap,
}

/// Action recorded in a request's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeAction {
    Created,
    Accepted,
    Refused,
    Cancelled,
    Approved,
    Rejected,
}

impl ExchangeAction {
    /// Imperative form used in error messages
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Created => "create",
            Self::Accepted => "accept",
            Self::Refused => "refuse",
            Self::Cancelled => "cancel",
            Self::Approved => "approve",
            Self::Rejected => "reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub action: ExchangeAction,
    pub actor: PersonId,
}

/// A request to hand one assigned slot to another person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ExchangeStatus,
    pub kind: ExchangeKind,
    #[serde(default)]
    pub mode: ExchangeMode,
    pub date: NaiveDate,
    pub slot: Slot,
    pub requester_id: PersonId,
    pub requester_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<PersonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(default)]
    pub reason: String,
    /// Append-only
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ExchangeRequest {
    fn transition(
        &mut self,
        action: ExchangeAction,
        actor: &PersonId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.status = validate_transition(self.status, action)?;
        self.record(action, actor, now);
        Ok(())
    }

    fn record(&mut self, action: ExchangeAction, actor: &PersonId, now: DateTime<Utc>) {
        self.updated_at = now;
        self.history.push(HistoryEntry {
            at: now,
            action,
            actor: actor.clone(),
        });
    }

    fn involves(&self, id: &PersonId) -> bool {
        &self.requester_id == id || self.target_id.as_ref() == Some(id)
    }
}

/// Who is acting on a request, with their authorization already resolved
#[derive(Debug, Clone)]
pub struct ExchangeActor {
    pub id: PersonId,
    pub name: String,
    pub is_admin: bool,
    /// Management rights over the unit owning the request
    pub can_manage: bool,
}

impl ExchangeActor {
    fn administers(&self) -> bool {
        self.is_admin && self.can_manage
    }
}

/// Input for [`open`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewExchange {
    pub kind: Option<ExchangeKind>,
    pub date: Option<NaiveDate>,
    /// Required for the main schedule; RJM requests always use `single`
    #[serde(default)]
    pub slot: Option<Slot>,
    #[serde(default)]
    pub mode: ExchangeMode,
    #[serde(default)]
    pub target_id: Option<PersonId>,
    #[serde(default)]
    pub reason: String,
}

/// Schedules and roster a request is evaluated against
pub struct ExchangeContext<'a> {
    pub schedule: &'a Schedule,
    pub rjm: &'a [RjmEntry],
    pub roster: &'a [Person],
    pub unavailable: &'a UnavailabilitySet,
}

// ============================================================================
// Transition Table
// ============================================================================

/// Validate that `action` may be applied from `from`, returning the new status
pub fn validate_transition(
    from: ExchangeStatus,
    action: ExchangeAction,
) -> Result<ExchangeStatus> {
    use ExchangeAction as A;
    use ExchangeStatus as S;

    let next = match (from, action) {
        (S::Pending, A::Accepted) => Some(S::Accepted),
        (S::Pending, A::Refused) => Some(S::Refused),
        (S::Pending | S::Accepted, A::Cancelled) => Some(S::Cancelled),
        (S::Accepted, A::Approved) => Some(S::Approved),
        (S::Accepted, A::Rejected) => Some(S::Refused),
        _ => None,
    };

    next.ok_or_else(|| Error::state(action.verb(), from))
}

/// Actions that are legal from a status
pub fn valid_actions(from: ExchangeStatus) -> Vec<ExchangeAction> {
    match from {
        ExchangeStatus::Pending => vec![
            ExchangeAction::Accepted,
            ExchangeAction::Refused,
            ExchangeAction::Cancelled,
        ],
        ExchangeStatus::Accepted => vec![
            ExchangeAction::Cancelled,
            ExchangeAction::Approved,
            ExchangeAction::Rejected,
        ],
        ExchangeStatus::Refused | ExchangeStatus::Cancelled | ExchangeStatus::Approved => vec![],
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Look up a request by id
pub fn find(requests: &[ExchangeRequest], id: Uuid) -> Result<&ExchangeRequest> {
    requests
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| Error::not_found("exchange request", id))
}

/// Resolve and check the slot a new request refers to
fn resolve_slot(
    kind: ExchangeKind,
    date: NaiveDate,
    slot: Option<Slot>,
    schedule: &Schedule,
    rjm: &[RjmEntry],
    requester: &PersonId,
) -> Result<Slot> {
    let (slot, holder) = match kind {
        ExchangeKind::MainSchedule => {
            let slot = slot.ok_or_else(|| {
                Error::validation("a slot is required for main schedule exchanges")
            })?;
            let day = schedule
                .day(date)
                .ok_or_else(|| Error::not_found("schedule day", date))?;
            if !day.has_slot(slot) {
                return Err(Error::validation(format!(
                    "slot '{slot}' does not exist on {date}"
                )));
            }
            (slot, day.assignee(slot))
        }
        ExchangeKind::RjmSchedule => {
            if matches!(slot, Some(s) if s != Slot::Single) {
                return Err(Error::validation(
                    "RJM exchanges only use the single slot",
                ));
            }
            let entry = rjm
                .iter()
                .find(|e| e.date == date)
                .ok_or_else(|| Error::not_found("RJM entry", date))?;
            (Slot::Single, entry.assignee.as_ref())
        }
    };

    if holder != Some(requester) {
        return Err(Error::unauthorized(format!(
            "you are not assigned to {date} {slot}"
        )));
    }
    Ok(slot)
}

/// Build a pending request for a slot the actor currently holds
///
/// `existing` is checked for an active duplicate; the caller stores the
/// returned request.
pub fn open(
    existing: &[ExchangeRequest],
    input: NewExchange,
    actor: &ExchangeActor,
    ctx: &ExchangeContext<'_>,
    now: DateTime<Utc>,
) -> Result<ExchangeRequest> {
    let kind = input
        .kind
        .ok_or_else(|| Error::validation("exchange kind is required"))?;
    let date = input
        .date
        .ok_or_else(|| Error::validation("exchange date is required"))?;

    let slot = resolve_slot(kind, date, input.slot, ctx.schedule, ctx.rjm, &actor.id)?;

    let target_name = match &input.target_id {
        Some(target) if target == &actor.id => {
            return Err(Error::validation("you cannot target yourself"));
        }
        Some(target) => Some(
            find_person(ctx.roster, target)
                .ok_or_else(|| Error::not_found("person", target))?
                .name
                .clone(),
        ),
        None => None,
    };

    let duplicate = existing.iter().any(|r| {
        r.status.is_active()
            && r.requester_id == actor.id
            && r.date == date
            && r.kind == kind
            && r.slot == slot
    });
    if duplicate {
        return Err(Error::conflict(format!(
            "an active request already exists for {date} {slot}"
        )));
    }

    let mut request = ExchangeRequest {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        status: ExchangeStatus::Pending,
        kind,
        mode: input.mode,
        date,
        slot,
        requester_id: actor.id.clone(),
        requester_name: actor.name.clone(),
        target_id: input.target_id,
        target_name,
        reason: input.reason,
        history: Vec::new(),
    };
    request.record(ExchangeAction::Created, &actor.id, now);

    tracing::info!(
        request = %request.id,
        date = %date,
        slot = %slot,
        requester = %actor.id,
        "Exchange request created"
    );
    Ok(request)
}

/// Accept a pending request
///
/// A named target is the only one who may accept. An open request may be
/// accepted by anyone in the roster able to take the slot; they become the
/// target.
pub fn accept(
    request: &mut ExchangeRequest,
    actor: &ExchangeActor,
    ctx: &ExchangeContext<'_>,
    now: DateTime<Utc>,
) -> Result<()> {
    validate_transition(request.status, ExchangeAction::Accepted)?;

    if request.requester_id == actor.id {
        return Err(Error::unauthorized("you cannot accept your own request"));
    }

    match &request.target_id {
        Some(target) if target != &actor.id => {
            return Err(Error::unauthorized(
                "only the named target may accept this request",
            ));
        }
        Some(_) => {}
        None => {
            let person = find_person(ctx.roster, &actor.id).ok_or_else(|| {
                Error::validation(format!("'{}' is not in the roster", actor.id))
            })?;
            check_can_take(request, person, ctx.unavailable)?;
            request.target_id = Some(actor.id.clone());
            request.target_name = Some(person.name.clone());
        }
    }

    request.transition(ExchangeAction::Accepted, &actor.id, now)
}

fn check_can_take(
    request: &ExchangeRequest,
    person: &Person,
    unavailable: &UnavailabilitySet,
) -> Result<()> {
    let verdict = match request.kind {
        ExchangeKind::MainSchedule => request
            .slot
            .required_phase_types()
            .iter()
            .try_for_each(|phase| eligibility::check(person, request.date, *phase, unavailable)),
        ExchangeKind::RjmSchedule if unavailable.contains(&person.id, request.date) => {
            Err(eligibility::Ineligibility::Unavailable)
        }
        ExchangeKind::RjmSchedule => Ok(()),
    };
    verdict.map_err(|reason| {
        Error::validation(format!(
            "{} cannot take {} {}: {reason}",
            person.name, request.date, request.slot
        ))
    })
}

/// Refuse a pending request (named target or administrator)
pub fn refuse(
    request: &mut ExchangeRequest,
    actor: &ExchangeActor,
    now: DateTime<Utc>,
) -> Result<()> {
    validate_transition(request.status, ExchangeAction::Refused)?;
    let is_target = request.target_id.as_ref() == Some(&actor.id);
    if !is_target && !actor.administers() {
        return Err(Error::unauthorized(
            "only the named target or an administrator may refuse",
        ));
    }
    request.transition(ExchangeAction::Refused, &actor.id, now)
}

/// Cancel an active request (requester or administrator)
pub fn cancel(
    request: &mut ExchangeRequest,
    actor: &ExchangeActor,
    now: DateTime<Utc>,
) -> Result<()> {
    validate_transition(request.status, ExchangeAction::Cancelled)?;
    if request.requester_id != actor.id && !actor.administers() {
        return Err(Error::unauthorized(
            "only the requester or an administrator may cancel",
        ));
    }
    request.transition(ExchangeAction::Cancelled, &actor.id, now)
}

fn require_manager(actor: &ExchangeActor, action: ExchangeAction) -> Result<()> {
    if actor.administers() {
        Ok(())
    } else {
        Err(Error::unauthorized(format!(
            "only an administrator of this unit may {} exchanges",
            action.verb()
        )))
    }
}

/// Approve an accepted request and hand the slot to its target
pub fn approve(
    request: &mut ExchangeRequest,
    actor: &ExchangeActor,
    schedule: &mut Schedule,
    rjm: &mut [RjmEntry],
    now: DateTime<Utc>,
) -> Result<()> {
    require_manager(actor, ExchangeAction::Approved)?;
    validate_transition(request.status, ExchangeAction::Approved)?;

    let target = request
        .target_id
        .clone()
        .ok_or_else(|| Error::validation("accepted request has no target"))?;

    match request.kind {
        ExchangeKind::MainSchedule => {
            let day = schedule
                .day_mut(request.date)
                .ok_or_else(|| Error::not_found("schedule day", request.date))?;
            day.set(request.slot, Some(target.clone()))?;
            day.via_exchange.insert(request.slot);
        }
        ExchangeKind::RjmSchedule => {
            let entry = rjm_entry_mut(rjm, request.date)
                .ok_or_else(|| Error::not_found("RJM entry", request.date))?;
            entry.assignee = Some(target.clone());
            entry.via_exchange = true;
        }
    }

    request.transition(ExchangeAction::Approved, &actor.id, now)?;
    tracing::info!(
        request = %request.id,
        date = %request.date,
        slot = %request.slot,
        target = %target,
        "Exchange approved"
    );
    Ok(())
}

/// Administratively reject an accepted request; the schedule is left alone
pub fn reject(
    request: &mut ExchangeRequest,
    actor: &ExchangeActor,
    now: DateTime<Utc>,
) -> Result<()> {
    require_manager(actor, ExchangeAction::Rejected)?;
    request.transition(ExchangeAction::Rejected, &actor.id, now)
}

/// Requests an actor may see
pub fn visible_to<'a>(
    requests: &'a [ExchangeRequest],
    actor: &ExchangeActor,
) -> Vec<&'a ExchangeRequest> {
    if actor.administers() {
        return requests.iter().collect();
    }
    requests.iter().filter(|r| r.involves(&actor.id)).collect()
}
