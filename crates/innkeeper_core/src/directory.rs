use std::sync::Arc;

use anyhow::Result;
use shared::domain::{Reservation, ReservationId, Tenant};
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    actions::{ActionId, ActionKind, ActionTracker, ConsoleEvent},
    api::TenantApi,
};

/// Last fetched tenants and reservations. Each refresh replaces a list
/// wholesale.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub tenants: Vec<Tenant>,
    pub reservations: Vec<Reservation>,
}

impl DirectorySnapshot {
    pub fn current_reservations(&self) -> Vec<Reservation> {
        partition_reservations(&self.reservations).0
    }

    pub fn reservation_history(&self) -> Vec<Reservation> {
        partition_reservations(&self.reservations).1
    }
}

/// Splits reservations into those still awaiting a decision and the rest.
/// Input order is kept on both sides.
pub fn partition_reservations(
    reservations: &[Reservation],
) -> (Vec<Reservation>, Vec<Reservation>) {
    reservations
        .iter()
        .cloned()
        .partition(|reservation| reservation.state.is_pending())
}

pub struct ReservationDirectory {
    api: Arc<dyn TenantApi>,
    actions: Arc<ActionTracker>,
    snapshot: RwLock<DirectorySnapshot>,
}

impl ReservationDirectory {
    pub fn new(api: Arc<dyn TenantApi>, actions: Arc<ActionTracker>) -> Self {
        Self {
            api,
            actions,
            snapshot: RwLock::new(DirectorySnapshot::default()),
        }
    }

    pub async fn list_tenants(&self) -> Result<()> {
        self.list_tenants_as(ActionId::new()).await
    }

    pub async fn list_tenants_as(&self, action: ActionId) -> Result<()> {
        let tenants = self
            .actions
            .run_as(action, ActionKind::ListTenants, self.api.list_tenants())
            .await?;
        let count = tenants.len();
        self.snapshot.write().await.tenants = tenants;
        info!("directory: tenants refreshed count={count}");
        self.actions.emit(ConsoleEvent::TenantsUpdated { count });
        Ok(())
    }

    pub async fn list_reservations(&self) -> Result<()> {
        self.list_reservations_as(ActionId::new()).await
    }

    pub async fn list_reservations_as(&self, action: ActionId) -> Result<()> {
        let reservations = self
            .actions
            .run_as(
                action,
                ActionKind::ListReservations,
                self.api.list_reservations(),
            )
            .await?;
        let (current, history) = partition_reservations(&reservations);
        self.snapshot.write().await.reservations = reservations;
        info!(
            "directory: reservations refreshed current={} history={}",
            current.len(),
            history.len()
        );
        self.actions.emit(ConsoleEvent::ReservationsUpdated {
            current: current.len(),
            history: history.len(),
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn tenants(&self) -> Vec<Tenant> {
        self.snapshot.read().await.tenants.clone()
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.snapshot.read().await.reservations.clone()
    }

    pub async fn current_reservations(&self) -> Vec<Reservation> {
        self.snapshot.read().await.current_reservations()
    }

    pub async fn reservation_history(&self) -> Vec<Reservation> {
        self.snapshot.read().await.reservation_history()
    }

    pub async fn find_reservation(&self, reservation_id: &ReservationId) -> Option<Reservation> {
        self.snapshot
            .read()
            .await
            .reservations
            .iter()
            .find(|reservation| &reservation.reservation_id == reservation_id)
            .cloned()
    }
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
