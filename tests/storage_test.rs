//! Integration tests for file-backed persistence
//!
//! These tests verify that unit documents and the audit trail survive a
//! restart of the service.

mod common;

use std::sync::Arc;

use common::{carla, date, master, unit};
use rota::audit::{AuditEntry, JsonlAuditSink};
use rota::auth::ScopeGate;
use rota::error::ErrorCategory;
use rota::models::{Person, PersonId};
use rota::scheduler::DayEntry;
use rota::service::RotaService;
use rota::storage::{DocumentStore, JsonFileBackend, UnitDocument};
use tempfile::TempDir;

fn file_service(dir: &TempDir) -> RotaService {
    let backend = JsonFileBackend::new(dir.path().join("units"));
    let audit = JsonlAuditSink::new(dir.path().join("audit.jsonl"));
    RotaService::new(
        DocumentStore::new(Arc::new(backend)),
        Arc::new(ScopeGate),
        Arc::new(audit),
    )
}

#[tokio::test]
async fn test_unit_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let service = file_service(&dir);
        service.create_unit(&master(), &unit()).await.unwrap();
        service
            .set_period(&master(), &unit(), date(2025, 11, 1), date(2025, 11, 30))
            .await
            .unwrap();
        service.add_person(&master(), &unit(), carla()).await.unwrap();
        let days = vec![DayEntry::two_phase(
            date(2025, 11, 2),
            Some(PersonId::new("carla")),
            None,
        )];
        service.publish(&master(), &unit(), days).await.unwrap();
    }

    assert!(dir.path().join("units").join("u1.json").exists());

    let service = file_service(&dir);
    let doc = service.get_unit(&master(), &unit()).await.unwrap();
    assert_eq!(doc.roster.len(), 1);
    assert!(doc.schedule.is_published());
    assert_eq!(service.list_units().await.unwrap(), vec!["u1".to_string()]);
}

#[tokio::test]
async fn test_failed_mutation_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir);
    service.create_unit(&master(), &unit()).await.unwrap();
    let path = dir.path().join("units").join("u1.json");
    let before = std::fs::read_to_string(&path).unwrap();

    let err = service
        .publish(&master(), &unit(), Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_audit_lines_are_json() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir);
    service.create_unit(&master(), &unit()).await.unwrap();
    let _ = service.create_unit(&master(), &unit()).await;

    let raw = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
    let entries: Vec<AuditEntry> = raw
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.action == "create_unit"));
    assert!(entries[1].error.is_some());
}

#[tokio::test]
async fn test_corrupt_document_is_storage_error() {
    let dir = TempDir::new().unwrap();
    let units = dir.path().join("units");
    std::fs::create_dir_all(&units).unwrap();
    std::fs::write(units.join("u1.json"), "{ not json").unwrap();

    let service = file_service(&dir);
    let err = service.get_unit(&master(), &unit()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Storage);
    assert!(err.is_recoverable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_stores_on_one_directory_take_turns() {
    let dir = TempDir::new().unwrap();
    let units = dir.path().join("units");
    let first = Arc::new(DocumentStore::new(Arc::new(JsonFileBackend::new(&units))));
    let second = Arc::new(DocumentStore::new(Arc::new(JsonFileBackend::new(&units))));
    first.create(UnitDocument::new(unit())).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let store = if i % 2 == 0 {
            Arc::clone(&first)
        } else {
            Arc::clone(&second)
        };
        handles.push(tokio::spawn(async move {
            store
                .update("u1", move |doc| {
                    doc.roster.push(Person::new(format!("p{i}"), format!("P{i}")));
                    Ok(())
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let doc = second.read("u1").await.unwrap();
    assert_eq!(doc.roster.len(), 40);

    let temp_files = std::fs::read_dir(&units)
        .unwrap()
        .filter(|entry| {
            let name = entry.as_ref().unwrap().file_name();
            name.to_string_lossy().ends_with(".tmp")
        })
        .count();
    assert_eq!(temp_files, 0);
}
