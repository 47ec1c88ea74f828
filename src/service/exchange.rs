//! Exchange request operations

use chrono::Utc;
use uuid::Uuid;

use super::{Outcome, RotaService};
use crate::auth::Actor;
use crate::error::Result;
use crate::models::UnitRef;
use crate::scheduler::exchange::{
    self, ExchangeActor, ExchangeContext, ExchangeRequest, NewExchange,
};
use crate::scheduler::stats::{self, ExchangeStats};
use crate::storage::{ExchangeStore, RosterProvider, UnavailabilityProvider, UnitDocument};

/// Which transition to apply to a stored request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Accept,
    Refuse,
    Cancel,
    Approve,
    Reject,
}

impl Step {
    fn audit_action(&self) -> &'static str {
        match self {
            Self::Accept => "accept_exchange",
            Self::Refuse => "refuse_exchange",
            Self::Cancel => "cancel_exchange",
            Self::Approve => "approve_exchange",
            Self::Reject => "reject_exchange",
        }
    }
}

fn apply_step(
    doc: &mut UnitDocument,
    step: Step,
    id: Uuid,
    actor: &ExchangeActor,
) -> Result<(ExchangeRequest, ExchangeRequest)> {
    let before = exchange::find(doc.exchanges(), id)?.clone();
    let mut request = before.clone();
    let now = Utc::now();

    match step {
        Step::Accept => {
            let unavailable = doc.unavailability();
            let ctx = ExchangeContext {
                schedule: &doc.schedule,
                rjm: &doc.rjm,
                roster: doc.roster(),
                unavailable: &unavailable,
            };
            exchange::accept(&mut request, actor, &ctx, now)?;
        }
        Step::Refuse => exchange::refuse(&mut request, actor, now)?,
        Step::Cancel => exchange::cancel(&mut request, actor, now)?,
        Step::Approve => {
            exchange::approve(&mut request, actor, &mut doc.schedule, &mut doc.rjm, now)?
        }
        Step::Reject => exchange::reject(&mut request, actor, now)?,
    }

    doc.update_exchange(request.clone())?;
    Ok((before, request))
}

impl RotaService {
    fn exchange_actor(&self, unit: &UnitRef, actor: &Actor) -> ExchangeActor {
        ExchangeActor {
            id: actor.id.clone(),
            name: actor.name.clone(),
            is_admin: self.is_admin(actor),
            can_manage: self.can_manage(unit, actor),
        }
    }

    /// Ask for someone to take over a slot the actor holds
    pub async fn create_exchange(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        input: NewExchange,
    ) -> Result<ExchangeRequest> {
        let who = self.exchange_actor(unit, actor);
        self.mutate("create_exchange", actor, unit, |doc| {
            let unavailable = doc.unavailability();
            let ctx = ExchangeContext {
                schedule: &doc.schedule,
                rjm: &doc.rjm,
                roster: doc.roster(),
                unavailable: &unavailable,
            };
            let request = exchange::open(doc.exchanges(), input, &who, &ctx, Utc::now())?;
            doc.append_exchange(request.clone());
            Ok(Outcome::new(request.clone()).changes(None::<&ExchangeRequest>, Some(&request)))
        })
        .await
    }

    async fn step(
        &self,
        step: Step,
        actor: &Actor,
        unit: &UnitRef,
        id: Uuid,
    ) -> Result<ExchangeRequest> {
        let who = self.exchange_actor(unit, actor);
        self.mutate(step.audit_action(), actor, unit, |doc| {
            let (before, after) = apply_step(doc, step, id, &who)?;
            Ok(Outcome::new(after.clone()).changes(Some(&before), Some(&after)))
        })
        .await
    }

    pub async fn accept_exchange(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        id: Uuid,
    ) -> Result<ExchangeRequest> {
        self.step(Step::Accept, actor, unit, id).await
    }

    pub async fn refuse_exchange(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        id: Uuid,
    ) -> Result<ExchangeRequest> {
        self.step(Step::Refuse, actor, unit, id).await
    }

    pub async fn cancel_exchange(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        id: Uuid,
    ) -> Result<ExchangeRequest> {
        self.step(Step::Cancel, actor, unit, id).await
    }

    /// Approve an accepted request, handing the slot to its target
    pub async fn approve_exchange(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        id: Uuid,
    ) -> Result<ExchangeRequest> {
        self.step(Step::Approve, actor, unit, id).await
    }

    /// Turn down an accepted request without touching the schedule
    pub async fn reject_exchange(
        &self,
        actor: &Actor,
        unit: &UnitRef,
        id: Uuid,
    ) -> Result<ExchangeRequest> {
        self.step(Step::Reject, actor, unit, id).await
    }

    /// Requests visible to the actor, newest first
    pub async fn list_exchanges(
        &self,
        actor: &Actor,
        unit: &UnitRef,
    ) -> Result<Vec<ExchangeRequest>> {
        let doc = self.load(unit).await?;
        let who = self.exchange_actor(unit, actor);
        let mut visible: Vec<ExchangeRequest> = exchange::visible_to(doc.exchanges(), &who)
            .into_iter()
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visible)
    }

    pub async fn exchange_stats(&self, unit: &UnitRef) -> Result<ExchangeStats> {
        let doc = self.load(unit).await?;
        Ok(stats::exchange_stats(doc.exchanges()))
    }
}
