//! Integration tests for the exchange workflow through the service
//!
//! These tests verify:
//! - Create, accept and approve hand the slot to the target
//! - One active request per requester, date, kind and slot
//! - Terminal states accept no further transitions
//! - Rejection leaves the schedule alone
//! - Visibility and statistics

mod common;

use common::{carla, date, dora, master, organist, seeded_service, unit};
use rota::audit::AuditStatus;
use rota::auth::{Actor, Role};
use rota::error::ErrorCategory;
use rota::models::{PersonId, Slot};
use rota::scheduler::{DayEntry, ExchangeKind, ExchangeStatus, NewExchange};
use rota::service::RotaService;
use uuid::Uuid;

/// Carla holds the Sunday 2025-11-02 service
async fn published() -> (RotaService, std::sync::Arc<rota::audit::MemoryAuditSink>) {
    let (service, audit) =
        seeded_service(date(2025, 11, 1), date(2025, 11, 30), vec![carla(), dora()]).await;
    let days = vec![DayEntry::two_phase(
        date(2025, 11, 2),
        None,
        Some(PersonId::new("carla")),
    )];
    service.publish(&master(), &unit(), days).await.unwrap();
    (service, audit)
}

fn service_request() -> NewExchange {
    NewExchange {
        kind: Some(ExchangeKind::MainSchedule),
        date: Some(date(2025, 11, 2)),
        slot: Some(Slot::Service),
        ..Default::default()
    }
}

async fn open_request(service: &RotaService) -> Uuid {
    service
        .create_exchange(&organist(&carla()), &unit(), service_request())
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_accepted_request_approved_by_admin() {
    let (service, _) = published().await;
    let id = open_request(&service).await;

    let accepted = service
        .accept_exchange(&organist(&dora()), &unit(), id)
        .await
        .unwrap();
    assert_eq!(accepted.status, ExchangeStatus::Accepted);
    assert_eq!(accepted.target_name.as_deref(), Some("Dora"));

    let approved = service.approve_exchange(&master(), &unit(), id).await.unwrap();
    assert_eq!(approved.status, ExchangeStatus::Approved);
    assert_eq!(approved.history.len(), 3);

    let view = service.schedule_view(&unit()).await.unwrap();
    let sunday = &view.days[0];
    assert_eq!(sunday.slots[&Slot::Service].as_deref(), Some("Dora"));
    assert!(sunday.via_exchange.contains(&Slot::Service));

    let again = service
        .approve_exchange(&master(), &unit(), id)
        .await
        .unwrap_err();
    assert_eq!(again.category(), ErrorCategory::State);
}

#[tokio::test]
async fn test_duplicate_active_request_conflicts() {
    let (service, _) = published().await;
    open_request(&service).await;

    let err = service
        .create_exchange(&organist(&carla()), &unit(), service_request())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);

    let stats = service.exchange_stats(&unit()).await.unwrap();
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn test_cancelled_request_can_be_reopened() {
    let (service, _) = published().await;
    let id = open_request(&service).await;
    service
        .cancel_exchange(&organist(&carla()), &unit(), id)
        .await
        .unwrap();

    // Terminal: no further transitions
    let err = service
        .accept_exchange(&organist(&dora()), &unit(), id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::State);

    // No longer active, so a new request is fine
    open_request(&service).await;
}

#[tokio::test]
async fn test_reject_leaves_schedule_unchanged() {
    let (service, _) = published().await;
    let id = open_request(&service).await;
    service
        .accept_exchange(&organist(&dora()), &unit(), id)
        .await
        .unwrap();

    let rejected = service.reject_exchange(&master(), &unit(), id).await.unwrap();
    assert_eq!(rejected.status, ExchangeStatus::Refused);

    let view = service.schedule_view(&unit()).await.unwrap();
    assert_eq!(view.days[0].slots[&Slot::Service].as_deref(), Some("Carla"));
    assert!(view.days[0].via_exchange.is_empty());
}

#[tokio::test]
async fn test_only_holder_may_open_request() {
    let (service, _) = published().await;
    let err = service
        .create_exchange(&organist(&dora()), &unit(), service_request())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);
}

#[tokio::test]
async fn test_organist_cannot_approve() {
    let (service, audit) = published().await;
    let id = open_request(&service).await;
    service
        .accept_exchange(&organist(&dora()), &unit(), id)
        .await
        .unwrap();

    let err = service
        .approve_exchange(&organist(&dora()), &unit(), id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);

    let entries = audit.entries().await;
    let last = entries.last().unwrap();
    assert_eq!(last.action, "approve_exchange");
    assert_eq!(last.status, AuditStatus::Failure);
}

#[tokio::test]
async fn test_requests_visible_to_parties_and_admins() {
    let (service, _) = published().await;
    open_request(&service).await;

    let outsider = Actor::new("erin", "Erin", Role::Organist);
    assert!(service
        .list_exchanges(&outsider, &unit())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        service
            .list_exchanges(&organist(&carla()), &unit())
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(service.list_exchanges(&master(), &unit()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_request_not_found() {
    let (service, _) = published().await;
    let err = service
        .cancel_exchange(&master(), &unit(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}
