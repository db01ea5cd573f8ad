use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{ReservationId, ReservationState},
    protocol::{ApproveReservationResponse, ReservationDecision, StatusNotification},
};
use tracing::info;

use crate::{
    actions::{ActionId, ActionKind, ActionTracker},
    api::TenantApi,
    notifier::StatusNotifier,
};

pub type ApprovalResult = ApproveReservationResponse;

/// Links embedded in status emails so the contact can find their way back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLinks {
    pub server_url: String,
    pub status_route_url: String,
}

impl StatusLinks {
    pub fn new(ui_origin: &str, status_route: &str) -> Self {
        let server_url = ui_origin.trim_end_matches('/').to_string();
        let status_route_url = format!("{server_url}/{}", status_route.trim_start_matches('/'));
        Self {
            server_url,
            status_route_url,
        }
    }
}

/// Approve/deny transitions. The backend decides whether a transition is
/// legal; this side only issues it and reports how the request went.
pub struct ReservationWorkflow {
    api: Arc<dyn TenantApi>,
    actions: Arc<ActionTracker>,
    notifier: StatusNotifier,
    links: StatusLinks,
}

impl ReservationWorkflow {
    pub fn new(
        api: Arc<dyn TenantApi>,
        actions: Arc<ActionTracker>,
        notifier: StatusNotifier,
        links: StatusLinks,
    ) -> Self {
        Self {
            api,
            actions,
            notifier,
            links,
        }
    }

    pub fn links(&self) -> &StatusLinks {
        &self.links
    }

    pub async fn approve(
        &self,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<ApprovalResult> {
        self.approve_as(
            ActionId::new(),
            reservation_id,
            contact_email,
            contact_name,
            payload,
        )
        .await
    }

    pub async fn approve_as(
        &self,
        action: ActionId,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<ApprovalResult> {
        info!("reservations: approve start reservation_id={reservation_id} action={action}");
        let payload = payload.unwrap_or_default();
        let response = self
            .actions
            .run_as(
                action,
                ActionKind::ApproveReservation,
                self.api.approve_reservation(reservation_id, &payload),
            )
            .await?;
        info!(
            "reservations: approve ok reservation_id={reservation_id} password_issued={}",
            response.reservation_pwd.is_some()
        );

        self.notifier.notify(StatusNotification {
            state: ReservationState::Approved,
            contact_email: contact_email.to_string(),
            reservation_id: reservation_id.clone(),
            reservation_password: response.reservation_pwd.clone(),
            server_url: self.links.server_url.clone(),
            server_url_status_route: Some(self.links.status_route_url.clone()),
            contact_name: contact_name.to_string(),
            state_notes: None,
        });

        Ok(response)
    }

    pub async fn deny(
        &self,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<()> {
        self.deny_as(
            ActionId::new(),
            reservation_id,
            contact_email,
            contact_name,
            payload,
        )
        .await
    }

    pub async fn deny_as(
        &self,
        action: ActionId,
        reservation_id: &ReservationId,
        contact_email: &str,
        contact_name: &str,
        payload: Option<ReservationDecision>,
    ) -> Result<()> {
        info!("reservations: deny start reservation_id={reservation_id} action={action}");
        let payload = payload.unwrap_or_default();
        self.actions
            .run_as(
                action,
                ActionKind::DenyReservation,
                self.api.deny_reservation(reservation_id, &payload),
            )
            .await?;
        info!("reservations: deny ok reservation_id={reservation_id}");

        self.notifier.notify(StatusNotification {
            state: ReservationState::Denied,
            contact_email: contact_email.to_string(),
            reservation_id: reservation_id.clone(),
            reservation_password: None,
            server_url: self.links.server_url.clone(),
            server_url_status_route: None,
            contact_name: contact_name.to_string(),
            state_notes: payload.state_notes,
        });

        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
