//! Architectural Contract Test: Registration
//!
//! This test verifies how bindings enter the registry.
//!
//! Constraints verified:
//! - Resolve is never attempted while the interface has no IPv4 address
//! - A failed registration is retried on a fixed delay until it succeeds
//! - Incomplete bindings fail immediately and are not retried
//! - Dropping the registration future cancels the retries
//!
//! If this test fails, startup either gives up too early or spins.

mod common;

use common::*;
use ifddns_core::{BindingConfig, EngineEvent, Error};
use std::time::Duration;

#[tokio::test]
async fn resolve_is_not_attempted_without_interface_address() {
    let source = FakeInterfaces::new();
    let provider = ScriptedProvider::new();
    provider.add_record("rec-1", "example.com", "home", "203.0.113.5");
    let (mut engine, _events) = engine_with(&source, &provider);

    let err = tokio_test::assert_err!(engine.register(home_binding()).await);

    assert!(matches!(err, Error::Resolution(_)));
    assert_eq!(provider.resolve_call_count(), 0);
    assert!(engine.registry().is_empty());
}

#[tokio::test]
async fn registered_binding_holds_record_id_and_empty_cache() {
    let source = FakeInterfaces::with("eth0", OLD_IP);
    let provider = ScriptedProvider::new();
    provider.add_record("rec-1", "example.com", "home", "203.0.113.5");
    let (mut engine, mut events) = engine_with(&source, &provider);

    tokio_test::assert_ok!(engine.register(home_binding()).await);

    let binding = engine.registry().find("example.com", "home").unwrap();
    assert_eq!(binding.record_id(), "rec-1");
    assert_eq!(binding.cached_value(), None);
    assert_eq!(binding.fqdn(), "home.example.com");
    assert_eq!(
        drain(&mut events),
        vec![EngineEvent::Registered {
            domain_name: "example.com".to_string(),
            record_prefix: "home".to_string(),
            record_id: "rec-1".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_record_is_retried_every_ten_seconds() {
    let source = FakeInterfaces::with("eth0", OLD_IP);
    let provider = ScriptedProvider::new();
    let (mut engine, mut events) = engine_with(&source, &provider);

    let handle = tokio::spawn(async move {
        let result = engine.register_all(vec![home_binding()]).await;
        (engine, result)
    });

    // Attempts at t=0, 10s and 20s
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(provider.resolve_call_count(), 3);
    assert!(!handle.is_finished());

    // The record appears; the attempt at t=30s succeeds
    provider.add_record("rec-1", "example.com", "home", "203.0.113.5");
    let (engine, result) = handle.await.unwrap();

    tokio_test::assert_ok!(result);
    assert_eq!(provider.resolve_call_count(), 4);
    assert_eq!(engine.registry().len(), 1);

    let events = drain(&mut events);
    let attempts: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::RegistrationFailed { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert!(matches!(events.last(), Some(EngineEvent::Registered { .. })));
}

#[tokio::test(start_paused = true)]
async fn later_bindings_wait_for_earlier_ones() {
    let source = FakeInterfaces::with("eth0", OLD_IP);
    let provider = ScriptedProvider::new();
    provider.add_record("rec-2", "example.com", "nas", "203.0.113.5");
    let (mut engine, _events) = engine_with(&source, &provider);

    let nas = BindingConfig::new("example.com", "nas", "eth0");
    let handle = tokio::spawn(async move {
        let result = engine.register_all(vec![home_binding(), nas]).await;
        (engine, result)
    });

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(provider.resolve_call_count(), 2, "only the first binding is attempted");

    provider.add_record("rec-1", "example.com", "home", "203.0.113.5");
    let (engine, result) = handle.await.unwrap();
    tokio_test::assert_ok!(result);

    let order: Vec<&str> = engine.registry().iter().map(|b| b.record_id()).collect();
    assert_eq!(order, vec!["rec-1", "rec-2"]);
}

#[tokio::test(start_paused = true)]
async fn incomplete_binding_is_not_retried() {
    let source = FakeInterfaces::with("eth0", OLD_IP);
    let provider = ScriptedProvider::new();
    let (mut engine, _events) = engine_with(&source, &provider);

    let incomplete = BindingConfig::new("example.com", "home", "");
    let err = tokio_test::assert_err!(engine.register_all(vec![incomplete]).await);

    assert!(err.is_fatal());
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(provider.resolve_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_registration_cancels_retries() {
    let source = FakeInterfaces::with("eth0", OLD_IP);
    let provider = ScriptedProvider::new();
    let (mut engine, _events) = engine_with(&source, &provider);

    let result = tokio::time::timeout(
        Duration::from_secs(35),
        engine.register_all(vec![home_binding()]),
    )
    .await;
    assert!(result.is_err(), "registration must still be retrying");
    let attempts = provider.resolve_call_count();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(provider.resolve_call_count(), attempts);
    assert!(engine.registry().is_empty());
}
