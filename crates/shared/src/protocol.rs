use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{ReservationId, ReservationState},
    secret::ReservationPassword,
};

/// List envelope used by the tenant API. Some deployments return a bare
/// array instead, so callers decode into [`ListPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Envelope(ListResponse<T>),
    Bare(Vec<T>),
}

impl<T> ListPayload<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Envelope(envelope) => envelope.results,
            Self::Bare(items) => items,
        }
    }
}

/// Optional body for approve/deny. Unknown keys are forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationDecision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReservationDecision {
    pub fn with_notes(notes: impl Into<String>) -> Self {
        Self {
            state_notes: Some(notes.into()),
            extra: Map::new(),
        }
    }
}

/// Approve response. The one-time password is pulled out; everything else the
/// backend returns is kept in `metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveReservationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_pwd: Option<ReservationPassword>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Payload posted to the UI backend's `email/status` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotification {
    pub state: ReservationState,
    pub contact_email: String,
    pub reservation_id: ReservationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_password: Option<ReservationPassword>,
    pub server_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url_status_route: Option<String>,
    pub contact_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_notes: Option<String>,
}
