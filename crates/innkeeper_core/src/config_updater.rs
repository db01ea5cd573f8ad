use std::sync::Arc;

use anyhow::Result;
use shared::domain::{TenantConfig, TenantId};
use tracing::info;

use crate::{
    actions::{ActionId, ActionKind, ActionTracker},
    api::TenantApi,
    directory::ReservationDirectory,
};

pub struct TenantConfigUpdater {
    api: Arc<dyn TenantApi>,
    actions: Arc<ActionTracker>,
    directory: Arc<ReservationDirectory>,
}

impl TenantConfigUpdater {
    pub fn new(
        api: Arc<dyn TenantApi>,
        actions: Arc<ActionTracker>,
        directory: Arc<ReservationDirectory>,
    ) -> Self {
        Self {
            api,
            actions,
            directory,
        }
    }

    pub async fn update_config(&self, tenant_id: &TenantId, config: &TenantConfig) -> Result<()> {
        self.update_config_as(ActionId::new(), tenant_id, config)
            .await
    }

    /// Pushes `config` and then re-reads the tenant list rather than patching
    /// the cached tenant, so backend-computed fields stay in sync. The re-read
    /// is tracked as its own list action.
    pub async fn update_config_as(
        &self,
        action: ActionId,
        tenant_id: &TenantId,
        config: &TenantConfig,
    ) -> Result<()> {
        self.actions
            .run_as(action, ActionKind::UpdateTenantConfig, async {
                self.api.update_tenant_config(tenant_id, config).await?;
                info!("tenants: config updated tenant_id={tenant_id}");
                self.directory.list_tenants().await
            })
            .await
    }
}

#[cfg(test)]
#[path = "tests/config_updater_tests.rs"]
mod tests;
