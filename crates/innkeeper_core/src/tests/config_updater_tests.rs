use std::sync::Arc;

use serde_json::json;
use shared::domain::{TenantConfig, TenantId};

use super::*;
use crate::{
    actions::{ActionKind, ConsoleEvent},
    test_support::{tenant, FakeTenantApi},
};

fn updater_with(
    api: FakeTenantApi,
) -> (
    TenantConfigUpdater,
    Arc<ReservationDirectory>,
    Arc<FakeTenantApi>,
    Arc<ActionTracker>,
) {
    let api = Arc::new(api);
    let actions = Arc::new(ActionTracker::new());
    let directory = Arc::new(ReservationDirectory::new(api.clone(), Arc::clone(&actions)));
    let updater =
        TenantConfigUpdater::new(api.clone(), Arc::clone(&actions), Arc::clone(&directory));
    (updater, directory, api, actions)
}

fn endorser_config() -> TenantConfig {
    TenantConfig::from_value(json!({
        "connect_to_endorser": [{ "endorser_alias": "bcovrin-test", "ledger_id": "bcovrin-test" }],
        "create_public_did": ["bcovrin-test"]
    }))
    .expect("object config")
}

#[tokio::test]
async fn update_refetches_tenants_once_after_update_resolves() {
    let (updater, directory, api, _actions) = updater_with(FakeTenantApi::default());
    *api.tenants.lock().await = vec![tenant("t-1", "acme")];

    updater
        .update_config(&TenantId::new("t-1"), &endorser_config())
        .await
        .expect("update");

    assert_eq!(
        api.calls().await,
        vec![
            "update_config:t-1".to_string(),
            "update_config_done:t-1".to_string(),
            "list_tenants".to_string(),
        ]
    );
    assert_eq!(api.configs.lock().await[0].1, endorser_config());
    assert_eq!(directory.tenants().await.len(), 1);
}

#[tokio::test]
async fn failed_update_skips_refetch_and_reraises() {
    let (updater, directory, api, actions) = updater_with(FakeTenantApi::failing_mutations(422));
    let mut events = actions.subscribe();

    updater
        .update_config(&TenantId::new("t-1"), &endorser_config())
        .await
        .expect_err("update must fail");

    assert_eq!(api.calls().await, vec!["update_config:t-1".to_string()]);
    assert!(directory.tenants().await.is_empty());

    let ConsoleEvent::ActionStarted { action, kind } = events.recv().await.expect("started") else {
        panic!("expected ActionStarted");
    };
    assert_eq!(kind, ActionKind::UpdateTenantConfig);
    let status = actions.status(action).await.expect("status");
    assert!(!status.loading);
    assert!(status.error.is_some());
    assert!(!actions.is_loading().await);
}

#[tokio::test]
async fn failed_refresh_after_update_fails_the_update() {
    let (updater, _directory, api, _actions) = updater_with(FakeTenantApi::default());
    *api.fail_lists_with.lock().await = Some(500);

    updater
        .update_config(&TenantId::new("t-1"), &endorser_config())
        .await
        .expect_err("refresh failure must surface");

    assert_eq!(api.configs.lock().await.len(), 1);
}
