use std::{
    collections::{HashMap, VecDeque},
    fmt,
    future::Future,
};

use anyhow::Result;
use shared::error::{ApiError, ApiException, ErrorCode};
use tokio::sync::{broadcast, Mutex};
use tracing::warn;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Settled statuses kept for lookup. In-flight statuses are never evicted;
/// there is one per outstanding call.
const ACTION_HISTORY_LIMIT: usize = 128;

/// Handle on one action invocation. Callers that want to follow their own
/// call create one up front and pass it to the `*_as` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ListTenants,
    ListReservations,
    ApproveReservation,
    DenyReservation,
    UpdateTenantConfig,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListTenants => "list_tenants",
            Self::ListReservations => "list_reservations",
            Self::ApproveReservation => "approve_reservation",
            Self::DenyReservation => "deny_reservation",
            Self::UpdateTenantConfig => "update_tenant_config",
        }
    }
}

/// Loading/error state of one action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStatus {
    pub id: ActionId,
    pub kind: ActionKind,
    pub loading: bool,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    ActionStarted {
        action: ActionId,
        kind: ActionKind,
    },
    ActionSucceeded {
        action: ActionId,
        kind: ActionKind,
    },
    ActionFailed {
        action: ActionId,
        kind: ActionKind,
        error: ApiError,
    },
    TenantsUpdated {
        count: usize,
    },
    ReservationsUpdated {
        current: usize,
        history: usize,
    },
}

#[derive(Default)]
struct ActionLog {
    settled: VecDeque<ActionId>,
    statuses: HashMap<ActionId, ActionStatus>,
}

impl ActionLog {
    fn settle(&mut self, id: ActionId) {
        self.settled.push_back(id);
        while self.settled.len() > ACTION_HISTORY_LIMIT {
            let Some(oldest) = self.settled.pop_front() else {
                return;
            };
            // A reused id may be running again; only drop it once settled.
            if self.statuses.get(&oldest).is_some_and(|s| !s.loading) {
                self.statuses.remove(&oldest);
            }
        }
    }
}

/// Per-invocation status bookkeeping plus the event side channel that
/// passive observers subscribe to.
pub struct ActionTracker {
    log: Mutex<ActionLog>,
    events: broadcast::Sender<ConsoleEvent>,
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTracker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            log: Mutex::new(ActionLog::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: ConsoleEvent) {
        let _ = self.events.send(event);
    }

    pub async fn run<T, F>(&self, kind: ActionKind, action: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.run_as(ActionId::new(), kind, action).await
    }

    /// Runs `action` under the status entry `id`. A failure is recorded on
    /// that entry and broadcast before being handed back to the caller.
    pub async fn run_as<T, F>(&self, id: ActionId, kind: ActionKind, action: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.begin(id, kind).await;
        let outcome = action.await;
        match &outcome {
            Ok(_) => self.finish(id, kind, None).await,
            Err(err) => self.finish(id, kind, Some(api_error_from(err))).await,
        }
        outcome
    }

    pub async fn begin(&self, id: ActionId, kind: ActionKind) {
        self.log.lock().await.statuses.insert(
            id,
            ActionStatus {
                id,
                kind,
                loading: true,
                error: None,
            },
        );
        self.emit(ConsoleEvent::ActionStarted { action: id, kind });
    }

    pub async fn finish(&self, id: ActionId, kind: ActionKind, error: Option<ApiError>) {
        {
            let mut log = self.log.lock().await;
            if let Some(status) = log.statuses.get_mut(&id) {
                status.loading = false;
                status.error = error.clone();
                log.settle(id);
            }
        }

        match error {
            None => self.emit(ConsoleEvent::ActionSucceeded { action: id, kind }),
            Some(error) => {
                warn!(
                    "console: action failed action={id} kind={} code={:?} message={}",
                    kind.as_str(),
                    error.code,
                    error.message
                );
                self.emit(ConsoleEvent::ActionFailed {
                    action: id,
                    kind,
                    error,
                });
            }
        }
    }

    pub async fn status(&self, id: ActionId) -> Option<ActionStatus> {
        self.log.lock().await.statuses.get(&id).cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.log
            .lock()
            .await
            .statuses
            .values()
            .any(|status| status.loading)
    }
}

/// Flattens any failure into the serializable form recorded on a status.
pub fn api_error_from(err: &anyhow::Error) -> ApiError {
    let message = format!("{err:#}");
    for cause in err.chain() {
        if let Some(exception) = cause.downcast_ref::<ApiException>() {
            return ApiError::new(exception.code, message);
        }
        if let Some(http_err) = cause.downcast_ref::<reqwest::Error>() {
            let code = match http_err.status() {
                Some(status) => ErrorCode::from_http_status(status.as_u16()),
                None if http_err.is_connect() || http_err.is_timeout() => ErrorCode::Unavailable,
                None => ErrorCode::Internal,
            };
            return ApiError::new(code, message);
        }
    }
    ApiError::new(ErrorCode::Internal, message)
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
