//! Reconciliation and service behaviour of [`PantryEngine`].

use pantry_core::{CountAction, EntityId};
use pantry_fetch::FetchError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BarcodeMode, PantryConfig};
use crate::engine::PantryEngine;
use crate::error::StoreError;
use crate::integration::PantryIntegration;
use crate::services::{CountChange, ServiceCall};
use crate::test_support::{Script, ScriptedSource, UpdateCall};

fn milk() -> EntityId {
    EntityId::new("sensor.product_milk")
}

fn dairy_with_milk() -> Script {
    Script::new(&["Dairy", "Produce"], json!([{"name": "Milk"}]), json!({}))
}

fn engine_with(script: Script) -> (Arc<ScriptedSource>, PantryEngine) {
    let source = Arc::new(ScriptedSource::new(script));
    let engine = PantryEngine::new(source.clone());
    (source, engine)
}

fn shared_barcode() -> Script {
    Script::new(
        &[],
        json!([
            {"name": "Milk", "barcode": "012345"},
            {"name": "Oat Milk", "barcode": "012345"},
            {"name": "Rice", "barcode": "999"}
        ]),
        json!({"sensor.product_milk": 4, "sensor.product_oat_milk": 1, "sensor.product_rice": 2}),
    )
}

async fn count_of(engine: &PantryEngine, id: &str) -> i64 {
    engine.sensor(&EntityId::new(id)).await.unwrap().state
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_first_tick_creates_projections() {
    let (_, engine) = engine_with(dairy_with_milk());

    let report = engine.tick().await.unwrap();

    assert_eq!(report.categories, 2);
    assert_eq!(report.added.len(), 1);
    assert_eq!(report.added[0].entity_id, milk());
    assert_eq!(report.added[0].name, "Product: Milk");
    assert_eq!(report.added[0].state, 0);

    let categories = engine.sensor(&EntityId::categories()).await.unwrap();
    assert_eq!(categories.state, 2);
    assert_eq!(categories.attributes["categories"], json!(["Dairy", "Produce"]));
    assert_eq!(engine.product_count().await, 1);
    assert!(engine.last_refresh().await.is_some());
}

#[tokio::test]
async fn test_product_disappearing_is_retired() {
    let (source, engine) = engine_with(dairy_with_milk());
    engine.tick().await.unwrap();

    source.set_script(dairy_with_milk().without_products());
    let report = engine.tick().await.unwrap();

    assert_eq!(report.removed, vec![milk()]);
    assert!(engine.sensor(&milk()).await.is_none());
    assert_eq!(report.failures.len(), 1);
    assert!(engine.sensor(&EntityId::categories()).await.is_some());
}

#[tokio::test]
async fn test_categories_failure_resets_aggregate_but_keeps_it() {
    let (source, engine) = engine_with(dairy_with_milk());
    engine.tick().await.unwrap();

    source.set_script(dairy_with_milk().without_categories());
    let report = engine.tick().await.unwrap();

    assert_eq!(report.categories, 0);
    assert!(engine.categories().await.is_empty());
    assert_eq!(engine.sensor(&EntityId::categories()).await.unwrap().state, 0);
    assert!(engine.sensor(&milk()).await.is_some());
}

#[tokio::test]
async fn test_repeated_snapshot_is_idempotent() {
    let script = Script::new(
        &["Dairy"],
        json!([{"name": "Milk", "barcode": "012345"}, {"name": "Eggs"}]),
        json!({"sensor.product_milk": 2}),
    );
    let (_, engine) = engine_with(script);

    let first = engine.tick().await.unwrap();
    let before = engine.sensors().await;
    let second = engine.tick().await.unwrap();
    let after = engine.sensors().await;

    assert_eq!(first.added.len(), 2);
    assert!(second.added.is_empty());
    assert!(second.removed.is_empty());
    assert!(!second.changed_membership());
    assert!(second.updated.contains(&milk()));
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_reappearing_product_keeps_its_projection() {
    let (source, engine) = engine_with(Script::new(
        &[],
        json!([{"name": "Milk", "barcode": "1", "url": "u1"}]),
        json!({}),
    ));
    engine.tick().await.unwrap();

    source.set_script(Script::new(
        &[],
        json!([{"name": "Milk", "url": "u2", "category": "Fridge"}]),
        json!({}),
    ));
    let report = engine.tick().await.unwrap();
    let updated = engine.sensor(&milk()).await.unwrap();

    assert!(report.added.is_empty());
    assert_eq!(updated.attributes["url"], json!("u2"));
    assert_eq!(updated.attributes["category"], json!("Fridge"));
    // Empty passthrough set does not wipe the barcode
    assert_eq!(updated.attributes["barcode"], json!("1"));
}

#[tokio::test]
async fn test_count_table_is_a_separate_pass() {
    let (source, engine) = engine_with(Script::new(
        &[],
        json!([{"name": "Milk", "count": 99}]),
        json!({"sensor.product_milk": 6}),
    ));
    engine.tick().await.unwrap();
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 6);

    source.set_script(Script::new(
        &[],
        json!([{"name": "Milk"}]),
        json!({"sensor.product_milk": 1}),
    ));
    engine.tick().await.unwrap();
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 1);

    // Counts endpoint failing leaves the last applied count
    source.set_script(Script {
        counts: None,
        ..Script::new(&[], json!([{"name": "Milk"}]), json!({}))
    });
    engine.tick().await.unwrap();
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 1);
}

#[tokio::test]
async fn test_subscribers_see_every_tick() {
    let (_, engine) = engine_with(dairy_with_milk());
    let mut rx = engine.subscribe();

    engine.tick().await.unwrap();
    rx.changed().await.unwrap();
    let first = *rx.borrow_and_update();

    engine.tick().await.unwrap();
    rx.changed().await.unwrap();
    assert!(*rx.borrow() > first);
}

// ============================================================================
// By-Identity Services
// ============================================================================

#[tokio::test]
async fn test_increase_by_id_uses_server_count() {
    let (source, engine) = engine_with(dairy_with_milk());
    engine.tick().await.unwrap();
    source.push_reply(Ok(5));

    let changes = engine.increase_by_id(&milk(), 3).await.unwrap();

    assert_eq!(
        changes,
        vec![CountChange {
            entity_id: milk(),
            previous: 0,
            count: 5
        }]
    );
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 5);
    assert_eq!(
        source.updates(),
        vec![UpdateCall {
            product_name: "Milk".into(),
            action: CountAction::Increase,
            amount: 3
        }]
    );
}

#[tokio::test]
async fn test_failed_write_leaves_count_unchanged() {
    let (source, engine) = engine_with(Script::new(
        &[],
        json!([{"name": "Milk"}]),
        json!({"sensor.product_milk": 4}),
    ));
    engine.tick().await.unwrap();
    source.push_reply(Err(FetchError::Rejected("out of stock".into())));

    let err = engine.decrease_by_id(&milk(), 1).await.unwrap_err();

    assert!(matches!(err, StoreError::Fetch(FetchError::Rejected(_))));
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 4);
}

#[tokio::test]
async fn test_unknown_or_aggregate_identity_is_not_found() {
    let (source, engine) = engine_with(dairy_with_milk());
    engine.tick().await.unwrap();

    let unknown = engine
        .increase_by_id(&EntityId::new("sensor.product_ghost"), 1)
        .await;
    let aggregate = engine.increase_by_id(&EntityId::categories(), 1).await;

    assert!(matches!(unknown, Err(StoreError::EntityNotFound(_))));
    assert!(matches!(aggregate, Err(StoreError::EntityNotFound(_))));
    assert!(source.updates().is_empty());
}

// ============================================================================
// By-Barcode Services
// ============================================================================

#[tokio::test]
async fn test_decrease_by_barcode_clamps_locally() {
    let (source, engine) = engine_with(shared_barcode());
    engine.tick().await.unwrap();

    let changes = engine.decrease_by_barcode("012345", 10).await.unwrap();

    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.count == 0));
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 0);
    assert_eq!(count_of(&engine, "sensor.product_oat_milk").await, 0);
    assert_eq!(count_of(&engine, "sensor.product_rice").await, 2);
    assert!(source.updates().is_empty());
}

#[tokio::test]
async fn test_increase_by_barcode_has_no_upper_bound() {
    let (_, engine) = engine_with(shared_barcode());
    engine.tick().await.unwrap();

    engine.increase_by_barcode("999", i64::MAX).await.unwrap();
    assert_eq!(count_of(&engine, "sensor.product_rice").await, i64::MAX);
}

#[tokio::test]
async fn test_negative_increase_by_barcode_clamps_at_zero() {
    let (_, engine) = engine_with(shared_barcode());
    engine.tick().await.unwrap();

    let changes = engine.increase_by_barcode("012345", -3).await.unwrap();

    assert_eq!(count_of(&engine, "sensor.product_milk").await, 1);
    assert_eq!(count_of(&engine, "sensor.product_oat_milk").await, 0);
    assert!(changes.iter().all(|c| c.count >= 0));
}

#[tokio::test]
async fn test_unknown_barcode_is_not_found() {
    let (_, engine) = engine_with(shared_barcode());
    engine.tick().await.unwrap();

    let result = engine.increase_by_barcode("000000", 1).await;
    assert!(matches!(result, Err(StoreError::EntityNotFound(_))));
}

#[tokio::test]
async fn test_remote_barcode_mode_confirms_each_product() {
    let source = Arc::new(ScriptedSource::new(shared_barcode()));
    let engine = PantryEngine::new(source.clone()).with_barcode_mode(BarcodeMode::Remote);
    engine.tick().await.unwrap();
    source.push_reply(Ok(7));
    source.push_reply(Err(FetchError::Closed));

    let err = engine.increase_by_barcode("012345", 1).await.unwrap_err();

    assert!(matches!(err, StoreError::Fetch(FetchError::Closed)));
    assert_eq!(source.updates().len(), 2);
    // Identity order: sensor.product_milk before sensor.product_oat_milk
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 7);
    assert_eq!(count_of(&engine, "sensor.product_oat_milk").await, 1);
}

#[tokio::test]
async fn test_call_dispatches_parsed_services() {
    let (source, engine) = engine_with(shared_barcode());
    engine.tick().await.unwrap();
    source.push_reply(Ok(10));

    let by_id = ServiceCall::from_data(
        "increase_count",
        &json!({"entity_id": "sensor.product_rice", "amount": "8"}),
    )
    .unwrap();
    let by_barcode =
        ServiceCall::from_data("decrease_count_by_barcode", &json!({"barcode": "012345"}))
            .unwrap();

    assert_eq!(engine.call(by_id).await.unwrap()[0].count, 10);
    let changes = engine.call(by_barcode).await.unwrap();
    assert_eq!(changes[0].count, 3);
    assert_eq!(changes[1].count, 0);
}

// ============================================================================
// Concurrency and Lifecycle
// ============================================================================

#[tokio::test]
async fn test_concurrent_ticks_are_serialized() {
    let (source, engine) = engine_with(dairy_with_milk());
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.tick().await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        created += handle.await.unwrap().unwrap().added.len();
    }

    assert_eq!(created, 1);
    assert_eq!(source.fetches(), 4);
    assert!(!engine.is_refreshing());
}

#[tokio::test]
async fn test_try_tick_refuses_while_busy() {
    let (_, engine) = engine_with(dairy_with_milk());
    let guard = engine.op_lock_for_test().await;

    assert!(matches!(
        engine.try_tick().await,
        Err(StoreError::RefreshInProgress)
    ));
    drop(guard);
    assert!(engine.try_tick().await.is_ok());
}

#[tokio::test]
async fn test_close_exactly_once_and_refuses_work() {
    let (source, engine) = engine_with(dairy_with_milk());
    engine.tick().await.unwrap();

    assert!(engine.close());
    assert!(!engine.close());
    assert!(engine.is_closed());
    assert_eq!(source.close_calls(), 1);

    assert!(matches!(engine.tick().await, Err(StoreError::Closed)));
    assert!(matches!(
        engine.increase_by_barcode("x", 1).await,
        Err(StoreError::Closed)
    ));
}

#[tokio::test]
async fn test_service_queued_behind_tick_refused_after_close() {
    let (source, engine) = engine_with(shared_barcode());
    let engine = Arc::new(engine);
    engine.tick().await.unwrap();

    let guard = engine.op_lock_for_test().await;
    let queued = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.decrease_by_barcode("012345", 1).await })
    };
    tokio::task::yield_now().await;
    assert!(engine.close());
    drop(guard);

    let result = queued.await.unwrap();
    assert!(matches!(result, Err(StoreError::Closed)));
    assert_eq!(count_of(&engine, "sensor.product_milk").await, 4);
    assert!(source.updates().is_empty());
}

#[tokio::test]
async fn test_every_tick_publishes_its_report() {
    let (source, engine) = engine_with(dairy_with_milk());
    let mut reports = engine.subscribe_reports();
    assert!(engine.last_report().await.is_none());

    engine.tick().await.unwrap();
    source.set_script(Script::new(&["Dairy"], json!([{"name": "Eggs"}]), json!({})));
    engine.tick().await.unwrap();

    let first = reports.recv().await.unwrap();
    let second = reports.recv().await.unwrap();
    assert_eq!(first.added[0].entity_id, milk());
    assert_eq!(second.added[0].entity_id, EntityId::new("sensor.product_eggs"));
    assert_eq!(second.removed, vec![milk()]);
    assert_eq!(engine.last_report().await, Some(second));
}

#[tokio::test]
async fn test_poller_tick_reports_reach_subscribers() {
    let source = Arc::new(ScriptedSource::new(dairy_with_milk()));
    let config = PantryConfig {
        update_interval: 1,
        ..PantryConfig::default()
    };
    let integration = PantryIntegration::setup_with_source(config, source.clone())
        .await
        .unwrap();
    let mut reports = integration.engine().subscribe_reports();

    source.set_script(Script::new(
        &["Dairy"],
        json!([{"name": "Milk"}, {"name": "Eggs"}]),
        json!({}),
    ));
    let report = tokio::time::timeout(Duration::from_secs(3), reports.recv())
        .await
        .unwrap()
        .unwrap();

    let added: Vec<_> = report.added.iter().map(|s| s.entity_id.clone()).collect();
    assert_eq!(added, vec![EntityId::new("sensor.product_eggs")]);
    assert!(integration.shutdown().await);
}

#[tokio::test]
async fn test_integration_setup_polls_and_shuts_down() {
    let source = Arc::new(ScriptedSource::new(dairy_with_milk()));
    let config = PantryConfig {
        update_interval: 1,
        ..PantryConfig::default()
    };

    let integration = PantryIntegration::setup_with_source(config, source.clone())
        .await
        .unwrap();
    assert_eq!(integration.initial_report().added.len(), 1);
    assert!(integration.is_polling());

    source.set_script(Script::new(
        &["Dairy"],
        json!([{"name": "Milk"}, {"name": "Eggs"}]),
        json!({}),
    ));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(integration.engine().product_count().await, 2);

    assert!(integration.shutdown().await);
    assert!(!integration.shutdown().await);
    assert!(!integration.is_polling());
    assert_eq!(source.close_calls(), 1);

    let fetches = source.fetches();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(source.fetches(), fetches);
}

#[tokio::test]
async fn test_integration_rejects_invalid_config() {
    let source = Arc::new(ScriptedSource::new(Script::default()));
    let config = PantryConfig {
        host: "http://pantry.local".into(),
        ..PantryConfig::default()
    };

    let result = PantryIntegration::setup_with_source(config, source.clone()).await;
    assert!(matches!(result, Err(StoreError::Config(_))));
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn test_integration_setup_fails_on_bad_api_key() {
    let config = PantryConfig {
        api_key: Some("bad\nkey".into()),
        ..PantryConfig::default()
    };

    let result = PantryIntegration::setup(config).await;
    assert!(matches!(
        result,
        Err(StoreError::Fetch(FetchError::InvalidConfig(_)))
    ));
}

#[test]
fn test_script_helpers() {
    let script = Script::new(&["A"], json!([]), json!({})).without_products();
    assert!(script.products.is_none());
    assert_eq!(script.categories, Some(vec!["A".to_string()]));
}
