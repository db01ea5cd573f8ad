use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::{
    domain::{Reservation, ReservationId, Tenant, TenantConfig, TenantId},
    protocol::ReservationDecision,
};
use tokio::sync::broadcast;

pub mod actions;
pub mod api;
pub mod config_updater;
pub mod directory;
pub mod notifier;
pub mod settings;
pub mod workflow;

pub use actions::{ActionId, ActionKind, ActionStatus, ActionTracker, ConsoleEvent};
pub use api::{HttpTenantApi, TenantApi};
pub use config_updater::TenantConfigUpdater;
pub use directory::{partition_reservations, DirectorySnapshot, ReservationDirectory};
pub use notifier::{HttpStatusTransport, MissingStatusTransport, StatusNotifier, StatusTransport};
pub use settings::{load_settings, ConsoleSettings, SettingsError};
pub use workflow::{ApprovalResult, ReservationWorkflow, StatusLinks};

/// Console operations. Every mutating or fetching call has an `*_as` form
/// taking a caller-created [`ActionId`], whose status can then be read with
/// [`ConsoleHandle::action_status`]. The plain forms track under a fresh id.
#[async_trait]
pub trait ConsoleHandle: Send + Sync {
    async fn list_tenants_as(&self, action: ActionId) -> Result<()>;
    async fn list_reservations_as(&self, action: ActionId) -> Result<()>;
    async fn approve_reservation_as(
        &self,
        action: ActionId,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<ApprovalResult>;
    async fn deny_reservation_as(
        &self,
        action: ActionId,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<()>;
    async fn update_tenant_config_as(
        &self,
        action: ActionId,
        tenant_id: &TenantId,
        config: &TenantConfig,
    ) -> Result<()>;
    async fn tenants(&self) -> Vec<Tenant>;
    async fn current_reservations(&self) -> Vec<Reservation>;
    async fn reservation_history(&self) -> Vec<Reservation>;
    async fn action_status(&self, id: ActionId) -> Option<ActionStatus>;
    async fn is_loading(&self) -> bool;
    fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent>;

    async fn list_tenants(&self) -> Result<()> {
        self.list_tenants_as(ActionId::new()).await
    }

    async fn list_reservations(&self) -> Result<()> {
        self.list_reservations_as(ActionId::new()).await
    }

    async fn approve_reservation(
        &self,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<ApprovalResult> {
        self.approve_reservation_as(
            ActionId::new(),
            reservation_id,
            contact_email,
            contact_name,
            payload,
        )
        .await
    }

    async fn deny_reservation(
        &self,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<()> {
        self.deny_reservation_as(
            ActionId::new(),
            reservation_id,
            contact_email,
            contact_name,
            payload,
        )
        .await
    }

    async fn update_tenant_config(
        &self,
        tenant_id: &TenantId,
        config: &TenantConfig,
    ) -> Result<()> {
        self.update_tenant_config_as(ActionId::new(), tenant_id, config)
            .await
    }
}

/// The innkeeper tenant console: one tenant API and one notifier shared by
/// the directory, the reservation workflow and the config updater.
pub struct InnkeeperConsole {
    actions: Arc<ActionTracker>,
    directory: Arc<ReservationDirectory>,
    workflow: ReservationWorkflow,
    config_updater: TenantConfigUpdater,
    notifier: StatusNotifier,
}

impl InnkeeperConsole {
    /// Console without a status email backend; notifications are attempted
    /// and logged as failed.
    pub fn new(api: Arc<dyn TenantApi>, links: StatusLinks) -> Self {
        Self::new_with_dependencies(api, Arc::new(MissingStatusTransport), links)
    }

    pub fn new_with_dependencies(
        api: Arc<dyn TenantApi>,
        status_transport: Arc<dyn StatusTransport>,
        links: StatusLinks,
    ) -> Self {
        let actions = Arc::new(ActionTracker::new());
        let notifier = StatusNotifier::new(status_transport);
        let directory = Arc::new(ReservationDirectory::new(
            Arc::clone(&api),
            Arc::clone(&actions),
        ));
        let workflow = ReservationWorkflow::new(
            Arc::clone(&api),
            Arc::clone(&actions),
            notifier.clone(),
            links,
        );
        let config_updater =
            TenantConfigUpdater::new(api, Arc::clone(&actions), Arc::clone(&directory));
        Self {
            actions,
            directory,
            workflow,
            config_updater,
            notifier,
        }
    }

    /// Builds the HTTP-backed console. The UI origin and API path are read
    /// once here and fixed for the console's lifetime.
    pub fn from_settings(settings: &ConsoleSettings) -> Result<Self> {
        settings.validate().context("invalid console settings")?;
        let ui_origin = settings.ui_origin()?;

        let mut api = HttpTenantApi::new(&settings.tenant_api_url);
        if let Some(token) = &settings.tenant_api_token {
            api = api.with_bearer_token(token);
        }
        let status_transport = HttpStatusTransport::new(&ui_origin, &settings.frontend_api_path);
        let links = StatusLinks::new(&ui_origin, &settings.reservation_status_route);

        Ok(Self::new_with_dependencies(
            Arc::new(api),
            Arc::new(status_transport),
            links,
        ))
    }

    pub fn directory(&self) -> &Arc<ReservationDirectory> {
        &self.directory
    }

    pub fn workflow(&self) -> &ReservationWorkflow {
        &self.workflow
    }

    pub fn notifier(&self) -> &StatusNotifier {
        &self.notifier
    }
}

#[async_trait]
impl ConsoleHandle for InnkeeperConsole {
    async fn list_tenants_as(&self, action: ActionId) -> Result<()> {
        self.directory.list_tenants_as(action).await
    }

    async fn list_reservations_as(&self, action: ActionId) -> Result<()> {
        self.directory.list_reservations_as(action).await
    }

    async fn approve_reservation_as(
        &self,
        action: ActionId,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<ApprovalResult> {
        self.workflow
            .approve_as(
                action,
                reservation_id,
                contact_email,
                contact_name,
                payload,
            )
            .await
    }

    async fn deny_reservation_as(
        &self,
        action: ActionId,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<()> {
        self.workflow
            .deny_as(
                action,
                reservation_id,
                contact_email,
                contact_name,
                payload,
            )
            .await
    }

    async fn update_tenant_config_as(
        &self,
        action: ActionId,
        tenant_id: &TenantId,
        config: &TenantConfig,
    ) -> Result<()> {
        self.config_updater
            .update_config_as(action, tenant_id, config)
            .await
    }

    async fn tenants(&self) -> Vec<Tenant> {
        self.directory.tenants().await
    }

    async fn current_reservations(&self) -> Vec<Reservation> {
        self.directory.current_reservations().await
    }

    async fn reservation_history(&self) -> Vec<Reservation> {
        self.directory.reservation_history().await
    }

    async fn action_status(&self, id: ActionId) -> Option<ActionStatus> {
        self.actions.status(id).await
    }

    async fn is_loading(&self) -> bool {
        self.actions.is_loading().await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.actions.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
