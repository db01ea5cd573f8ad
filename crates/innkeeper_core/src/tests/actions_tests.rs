use anyhow::anyhow;
use shared::error::{ApiException, ErrorCode};

use super::*;

#[tokio::test]
async fn run_records_success_and_clears_loading() {
    let tracker = ActionTracker::new();
    let mut events = tracker.subscribe();

    let value = tracker
        .run(ActionKind::ListTenants, async {
            assert!(tracker.is_loading().await);
            Ok(7)
        })
        .await
        .expect("run");
    assert_eq!(value, 7);

    let ConsoleEvent::ActionStarted { action, .. } = events.recv().await.expect("started") else {
        panic!("expected ActionStarted");
    };
    assert_eq!(
        tracker.status(action).await,
        Some(ActionStatus {
            id: action,
            kind: ActionKind::ListTenants,
            loading: false,
            error: None,
        })
    );
    assert!(!tracker.is_loading().await);
}

#[tokio::test]
async fn run_records_failure_before_returning_it() {
    let tracker = ActionTracker::new();
    let mut events = tracker.subscribe();

    let err = tracker
        .run::<(), _>(ActionKind::DenyReservation, async {
            Err(ApiException::from_status(404, "no such reservation").into())
        })
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("no such reservation"));

    let _started = events.recv().await.expect("started");
    let ConsoleEvent::ActionFailed {
        action,
        kind,
        error,
    } = events.recv().await.expect("failed")
    else {
        panic!("expected ActionFailed");
    };
    assert_eq!(kind, ActionKind::DenyReservation);
    assert_eq!(error.code, ErrorCode::NotFound);
    assert_eq!(
        tracker.status(action).await.and_then(|status| status.error),
        Some(error)
    );
}

#[test]
fn api_error_looks_through_context() {
    let err = anyhow::Error::from(ApiException::from_status(429, "slow down"))
        .context("approve reservation rejected by tenant api");
    let error = api_error_from(&err);
    assert_eq!(error.code, ErrorCode::RateLimited);
    assert!(error.message.contains("slow down"));
    assert!(error.message.starts_with("approve reservation rejected"));

    assert_eq!(api_error_from(&anyhow!("boom")).code, ErrorCode::Internal);
}

#[tokio::test]
async fn run_as_records_under_the_callers_id() {
    let tracker = ActionTracker::new();
    let id = ActionId::new();

    tracker
        .run_as::<(), _>(id, ActionKind::ApproveReservation, async {
            Err(ApiException::from_status(409, "already decided").into())
        })
        .await
        .expect_err("must fail");

    let status = tracker.status(id).await.expect("status under caller id");
    assert_eq!(status.id, id);
    assert_eq!(status.kind, ActionKind::ApproveReservation);
    assert!(!status.loading);
    assert_eq!(status.error.map(|error| error.code), Some(ErrorCode::Conflict));
}

#[tokio::test]
async fn settled_statuses_are_evicted_past_history_limit() {
    let tracker = ActionTracker::new();
    let pinned = ActionId::new();
    tracker.begin(pinned, ActionKind::ApproveReservation).await;

    let mut settled = Vec::new();
    for _ in 0..(ACTION_HISTORY_LIMIT + 8) {
        let id = ActionId::new();
        tracker.begin(id, ActionKind::ListReservations).await;
        tracker.finish(id, ActionKind::ListReservations, None).await;
        settled.push(id);
    }

    for evicted in &settled[..8] {
        assert!(tracker.status(*evicted).await.is_none());
    }
    for kept in &settled[8..] {
        assert!(tracker.status(*kept).await.is_some());
    }
    assert!(tracker.status(pinned).await.expect("in flight").loading);
    assert!(tracker.is_loading().await);
}

#[tokio::test]
async fn many_in_flight_actions_are_all_kept_until_they_settle() {
    let tracker = ActionTracker::new();
    let mut in_flight = Vec::new();
    for _ in 0..(ACTION_HISTORY_LIMIT + 4) {
        let id = ActionId::new();
        tracker.begin(id, ActionKind::ListTenants).await;
        in_flight.push(id);
    }
    for id in &in_flight {
        assert!(tracker.status(*id).await.expect("in flight").loading);
    }

    for id in &in_flight {
        tracker.finish(*id, ActionKind::ListTenants, None).await;
    }
    assert!(!tracker.is_loading().await);
    assert!(tracker.status(in_flight[0]).await.is_none());
    assert!(tracker.status(in_flight[4]).await.is_some());
}
