use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::StatusNotification;
use tokio::sync::Notify;
use tracing::{error, info};

const EMAIL_STATUS_PATH: &str = "email/status";

/// Side channel that delivers reservation status notifications.
#[async_trait]
pub trait StatusTransport: Send + Sync {
    async fn send_status(&self, notification: &StatusNotification) -> Result<()>;
}

pub struct MissingStatusTransport;

#[async_trait]
impl StatusTransport for MissingStatusTransport {
    async fn send_status(&self, _notification: &StatusNotification) -> Result<()> {
        Err(anyhow!("status notification backend is unavailable"))
    }
}

/// Posts notifications to the console UI's own backend, which is served from
/// a different base path than the tenant API.
pub struct HttpStatusTransport {
    http: Client,
    endpoint: String,
}

impl HttpStatusTransport {
    pub fn new(ui_origin: &str, api_path: &str) -> Self {
        Self::with_client(Client::new(), ui_origin, api_path)
    }

    pub fn with_client(http: Client, ui_origin: &str, api_path: &str) -> Self {
        let origin = ui_origin.trim_end_matches('/');
        let api_path = api_path.trim_matches('/');
        let endpoint = if api_path.is_empty() {
            format!("{origin}/{EMAIL_STATUS_PATH}")
        } else {
            format!("{origin}/{api_path}/{EMAIL_STATUS_PATH}")
        };
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StatusTransport for HttpStatusTransport {
    async fn send_status(&self, notification: &StatusNotification) -> Result<()> {
        self.http
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .context("failed to send status email request")?
            .error_for_status()
            .context("status email endpoint rejected the request")?;
        Ok(())
    }
}

#[derive(Default)]
struct PendingDispatches {
    count: AtomicUsize,
    idle: Notify,
}

/// Fire-and-forget dispatcher: every notification runs on its own detached
/// task and its outcome is only logged.
#[derive(Clone)]
pub struct StatusNotifier {
    transport: Arc<dyn StatusTransport>,
    pending: Arc<PendingDispatches>,
}

impl StatusNotifier {
    pub fn new(transport: Arc<dyn StatusTransport>) -> Self {
        Self {
            transport,
            pending: Arc::new(PendingDispatches::default()),
        }
    }

    pub fn notify(&self, notification: StatusNotification) {
        self.pending.count.fetch_add(1, Ordering::SeqCst);
        let transport = Arc::clone(&self.transport);
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            let reservation_id = notification.reservation_id.clone();
            let state = notification.state;
            match transport.send_status(&notification).await {
                Ok(()) => info!(
                    "reservations: status email sent reservation_id={reservation_id} state={state}"
                ),
                Err(err) => error!(
                    "reservations: status email failed reservation_id={reservation_id} \
                     state={state} err={err:#}"
                ),
            }
            drop(notification);
            if pending.count.fetch_sub(1, Ordering::SeqCst) == 1 {
                pending.idle.notify_waiters();
            }
        });
    }

    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Waits up to `timeout` for in-flight notifications. Returns `false` if
    /// some were still running when the timeout hit.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let idle = self.pending.idle.notified();
                if self.pending() == 0 {
                    return;
                }
                idle.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

#[cfg(test)]
#[path = "tests/notifier_tests.rs"]
mod tests;
