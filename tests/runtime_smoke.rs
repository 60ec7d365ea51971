use std::time::Duration;

use serde_json::json;

use ridedesk::{
    core::store::{OptimisticStore, OptimisticUpdateOptions, RefreshPolicy, RollbackCause},
    op::OperationKind,
    runtime::{
        events::StoreEvent,
        handle::{spawn_collection, RuntimeConfig, RuntimeError},
    },
};

fn kind() -> OperationKind {
    OperationKind::Custom("TEST".to_string())
}

#[tokio::test]
async fn apply_confirm_events_ordered() {
    let handle = spawn_collection(OptimisticStore::new(vec![1u32]), RuntimeConfig::default());
    let mut sub = handle.subscribe();

    let id = handle
        .apply(vec![1, 2], kind(), json!({}), None)
        .await
        .expect("apply");
    let state = handle.state().await.expect("state");
    assert_eq!(state.data, vec![1, 2]);
    assert!(state.is_optimistic);

    assert!(handle
        .confirm(id.clone(), Some(vec![1, 2, 3]), OptimisticUpdateOptions::default())
        .await
        .expect("confirm"));

    let state = handle.state().await.expect("state");
    assert_eq!(state.data, vec![1, 2, 3]);
    assert!(!state.is_optimistic);

    assert_eq!(
        sub.recv().await.expect("event"),
        StoreEvent::Applied { id: id.clone(), kind: kind() }
    );
    assert_eq!(sub.recv().await.expect("event"), StoreEvent::Confirmed { id });

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn timeout_rolls_back_exactly_once() {
    let handle = spawn_collection(OptimisticStore::new(vec!["r1"]), RuntimeConfig::default());
    let mut sub = handle.subscribe();

    let id = handle
        .apply(vec![], kind(), json!({}), Some(Duration::from_millis(1000)))
        .await
        .expect("apply");

    tokio::time::sleep(Duration::from_millis(999)).await;
    assert!(handle.state().await.expect("state").is_optimistic);

    tokio::time::sleep(Duration::from_millis(2)).await;
    let state = handle.state().await.expect("state");
    assert_eq!(state.data, vec!["r1"]);
    assert!(!state.is_optimistic);
    assert_eq!(state.error, Some(RollbackCause::TimedOut));

    // The late network answer loses the race.
    let late = handle
        .confirm(id.clone(), Some(vec!["late"]), OptimisticUpdateOptions::default())
        .await
        .expect("confirm");
    assert!(!late);
    let late_rollback = handle
        .rollback(id.clone(), None, OptimisticUpdateOptions::default())
        .await
        .expect("rollback");
    assert!(!late_rollback);
    assert_eq!(handle.state().await.expect("state").data, vec!["r1"]);

    tokio::time::sleep(Duration::from_secs(5)).await;

    let mut timeouts = 0;
    while let Ok(evt) = sub.try_recv() {
        match evt {
            StoreEvent::TimedOut { id: expired } => {
                assert_eq!(expired, id);
                timeouts += 1;
            }
            StoreEvent::Confirmed { .. } | StoreEvent::RolledBack { .. } => {
                panic!("late resolution should not emit {evt:?}")
            }
            _ => {}
        }
    }
    assert_eq!(timeouts, 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn confirm_before_deadline_cancels_timer() {
    let handle = spawn_collection(OptimisticStore::new(0u32), RuntimeConfig::default());

    let id = handle
        .apply(1, kind(), json!({}), Some(Duration::from_millis(100)))
        .await
        .expect("apply");
    handle
        .confirm(id, None, OptimisticUpdateOptions::default())
        .await
        .expect("confirm");

    tokio::time::sleep(Duration::from_millis(500)).await;
    let state = handle.state().await.expect("state");
    assert_eq!(state.data, 1);
    assert!(state.error.is_none());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn apply_with_rejection_creates_no_operation() {
    let handle = spawn_collection(OptimisticStore::new(vec![1u32]), RuntimeConfig::default());

    let res = handle
        .apply_with(kind(), json!({}), None, |_: &Vec<u32>| Err(RuntimeError::ChannelClosed))
        .await;
    assert_eq!(res, Err(RuntimeError::ChannelClosed));

    let state = handle.state().await.expect("state");
    assert!(state.pending_operations.is_empty());
    assert_eq!(state.data, vec![1]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn rollback_all_and_deferred_refresh() {
    let store = OptimisticStore::with_policy(vec![0u32], RefreshPolicy::Defer);
    let handle = spawn_collection(store, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    handle.apply(vec![0, 1], kind(), json!({}), None).await.expect("apply");
    handle.apply(vec![0, 1, 2], kind(), json!({}), None).await.expect("apply");
    handle.update_server_data(vec![9]).await.expect("refresh");
    assert_eq!(handle.state().await.expect("state").data, vec![0, 1, 2]);

    let ids = handle.rollback_all().await.expect("rollback all");
    assert_eq!(ids.len(), 2);

    let state = handle.state().await.expect("state");
    assert_eq!(state.data, vec![9]);
    assert_eq!(state.error, Some(RollbackCause::Discarded));

    handle.clear_error().await.expect("clear");
    assert!(handle.state().await.expect("state").error.is_none());

    let mut saw_deferred = false;
    let mut saw_all = false;
    while let Ok(evt) = sub.try_recv() {
        match evt {
            StoreEvent::ServerData { deferred } => saw_deferred = deferred,
            StoreEvent::RolledBackAll { ids: all } => saw_all = all == ids,
            _ => {}
        }
    }
    assert!(saw_deferred);
    assert!(saw_all);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn huge_timeout_keeps_runtime_alive() {
    let handle = spawn_collection(OptimisticStore::new(0u32), RuntimeConfig::default());

    let id = handle
        .apply(1, kind(), json!({}), Some(Duration::MAX))
        .await
        .expect("apply");
    let other = handle
        .apply(2, kind(), json!({}), Some(Duration::from_millis(50)))
        .await
        .expect("apply");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let state = handle.state().await.expect("state");
    assert_eq!(state.data, 1);
    assert_eq!(state.pending_operations.len(), 1);
    assert_eq!(state.pending_operations[0].id, id);
    assert_eq!(state.error, Some(RollbackCause::TimedOut));
    assert!(!handle
        .confirm(other, None, OptimisticUpdateOptions::default())
        .await
        .expect("confirm"));

    assert!(handle
        .confirm(id, Some(7), OptimisticUpdateOptions::default())
        .await
        .expect("confirm"));
    assert_eq!(handle.state().await.expect("state").data, 7);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn commands_after_shutdown_report_closed() {
    let handle = spawn_collection(OptimisticStore::new(0u32), RuntimeConfig::default());
    handle.shutdown().await.expect("shutdown");
    tokio::task::yield_now().await;
    assert_eq!(handle.state().await, Err(RuntimeError::ChannelClosed));
}
