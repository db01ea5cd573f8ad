use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Map;
use shared::{
    domain::{Reservation, ReservationId, ReservationState, Tenant, TenantConfig, TenantId},
    error::ApiException,
    protocol::{ApproveReservationResponse, ReservationDecision, StatusNotification},
    secret::ReservationPassword,
};
use tokio::sync::{mpsc, Mutex};

use crate::{api::TenantApi, notifier::StatusTransport, workflow::StatusLinks};

pub(crate) fn reservation(id: &str, state: ReservationState) -> Reservation {
    Reservation {
        reservation_id: ReservationId::new(id),
        contact_name: format!("contact {id}"),
        contact_email: format!("{id}@example.com"),
        state,
        tenant_name: Some(format!("tenant-{id}")),
        state_notes: None,
        created_at: None,
        updated_at: None,
        metadata: Map::new(),
    }
}

pub(crate) fn tenant(id: &str, name: &str) -> Tenant {
    Tenant {
        tenant_id: TenantId::new(id),
        tenant_name: Some(name.to_string()),
        wallet_id: format!("wallet-{id}"),
        wallet_key: Some(format!("key-{id}")),
        config: None,
        metadata: Map::new(),
    }
}

pub(crate) fn links() -> StatusLinks {
    StatusLinks::new("https://console.example", "reservation-status")
}

/// In-memory tenant API. Every call is appended to `calls` in order.
#[derive(Default)]
pub(crate) struct FakeTenantApi {
    pub tenants: Mutex<Vec<Tenant>>,
    pub reservations: Mutex<Vec<Reservation>>,
    pub approve_password: Option<String>,
    pub fail_mutations_with: Option<u16>,
    pub fail_lists_with: Mutex<Option<u16>>,
    pub mutation_delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
    pub decisions: Mutex<Vec<ReservationDecision>>,
    pub configs: Mutex<Vec<(TenantId, TenantConfig)>>,
}

impl FakeTenantApi {
    pub(crate) fn with_password(password: &str) -> Self {
        Self {
            approve_password: Some(password.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn failing_mutations(status: u16) -> Self {
        Self {
            fail_mutations_with: Some(status),
            ..Self::default()
        }
    }

    pub(crate) async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }

    async fn mutation_outcome(&self) -> Result<()> {
        if let Some(delay) = self.mutation_delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_mutations_with {
            Some(status) => Err(ApiException::from_status(status, "rejected by fake").into()),
            None => Ok(()),
        }
    }

    async fn list_outcome(&self) -> Result<()> {
        match *self.fail_lists_with.lock().await {
            Some(status) => Err(ApiException::from_status(status, "listing failed").into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TenantApi for FakeTenantApi {
    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        self.record("list_tenants".into()).await;
        self.list_outcome().await?;
        Ok(self.tenants.lock().await.clone())
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        self.record("list_reservations".into()).await;
        self.list_outcome().await?;
        Ok(self.reservations.lock().await.clone())
    }

    async fn approve_reservation(
        &self,
        reservation_id: &ReservationId,
        payload: &ReservationDecision,
    ) -> Result<ApproveReservationResponse> {
        self.record(format!("approve:{reservation_id}")).await;
        self.decisions.lock().await.push(payload.clone());
        self.mutation_outcome().await?;
        Ok(ApproveReservationResponse {
            reservation_pwd: self.approve_password.as_deref().map(ReservationPassword::new),
            metadata: Map::new(),
        })
    }

    async fn deny_reservation(
        &self,
        reservation_id: &ReservationId,
        payload: &ReservationDecision,
    ) -> Result<()> {
        self.record(format!("deny:{reservation_id}")).await;
        self.decisions.lock().await.push(payload.clone());
        self.mutation_outcome().await
    }

    async fn update_tenant_config(
        &self,
        tenant_id: &TenantId,
        config: &TenantConfig,
    ) -> Result<()> {
        self.record(format!("update_config:{tenant_id}")).await;
        self.mutation_outcome().await?;
        self.configs
            .lock()
            .await
            .push((tenant_id.clone(), config.clone()));
        self.record(format!("update_config_done:{tenant_id}")).await;
        Ok(())
    }
}

/// Status transport that hands every notification to the test.
pub(crate) struct RecordingTransport {
    tx: mpsc::UnboundedSender<StatusNotification>,
    fail: bool,
}

impl RecordingTransport {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<StatusNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: false }, rx)
    }

    pub(crate) fn failing() -> (Self, mpsc::UnboundedReceiver<StatusNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: true }, rx)
    }
}

#[async_trait]
impl StatusTransport for RecordingTransport {
    async fn send_status(&self, notification: &StatusNotification) -> Result<()> {
        let _ = self.tx.send(notification.clone());
        if self.fail {
            return Err(anyhow!("status endpoint returned 500"));
        }
        Ok(())
    }
}

pub(crate) fn drain_recorded(
    rx: &mut mpsc::UnboundedReceiver<StatusNotification>,
) -> Vec<StatusNotification> {
    let mut recorded = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        recorded.push(notification);
    }
    recorded
}
