use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Reservation, ReservationId, Tenant, TenantConfig, TenantId},
    error::ApiException,
    protocol::{ApproveReservationResponse, ListPayload, ReservationDecision},
};
use tracing::{debug, warn};
use url::Url;

const TENANTS_PATH: [&str; 2] = ["innkeeper", "tenants"];
const RESERVATIONS_PATH: [&str; 2] = ["innkeeper", "reservations"];

/// Tenant-management backend. The console only ever talks to it through this
/// trait; authentication and transport live in the implementation.
#[async_trait]
pub trait TenantApi: Send + Sync {
    async fn list_tenants(&self) -> Result<Vec<Tenant>>;
    async fn list_reservations(&self) -> Result<Vec<Reservation>>;
    async fn approve_reservation(
        &self,
        reservation_id: &ReservationId,
        payload: &ReservationDecision,
    ) -> Result<ApproveReservationResponse>;
    async fn deny_reservation(
        &self,
        reservation_id: &ReservationId,
        payload: &ReservationDecision,
    ) -> Result<()>;
    async fn update_tenant_config(&self, tenant_id: &TenantId, config: &TenantConfig)
        -> Result<()>;
}

pub struct HttpTenantApi {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTenantApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Reuse an already configured client (proxies, TLS roots, default headers).
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Appends `segments` to the base url. Each segment is percent-encoded,
    /// so an id can never step into a sibling route or add a query.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid tenant api url {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("tenant api url {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let request = match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .with_context(|| format!("failed to send {what} request"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body
            };
            return Err(ApiException::from_status(status.as_u16(), message))
                .with_context(|| format!("{what} rejected by tenant api"));
        }
        Ok(response)
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &[&str], what: &str) -> Result<Vec<T>> {
        let response = self.send(self.http.get(self.url(path)?), what).await?;
        let payload: ListPayload<T> = response
            .json()
            .await
            .with_context(|| format!("failed to decode {what} response"))?;
        let items = payload.into_items();
        debug!("tenant api: {what} returned count={}", items.len());
        Ok(items)
    }
}

#[async_trait]
impl TenantApi for HttpTenantApi {
    async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        self.fetch_list(&TENANTS_PATH, "list tenants").await
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        self.fetch_list(&RESERVATIONS_PATH, "list reservations").await
    }

    async fn approve_reservation(
        &self,
        reservation_id: &ReservationId,
        payload: &ReservationDecision,
    ) -> Result<ApproveReservationResponse> {
        let [root, collection] = RESERVATIONS_PATH;
        let url = self.url(&[root, collection, reservation_id.as_str(), "approve"])?;
        let response = self
            .send(self.http.put(url).json(payload), "approve reservation")
            .await?;

        // The transition already happened once the backend answered 2xx, so
        // an unreadable body only means no password came back.
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    "tenant api: approve body unreadable reservation_id={reservation_id} err={err}"
                );
                return Ok(ApproveReservationResponse::default());
            }
        };
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApproveReservationResponse::default());
        }
        match serde_json::from_slice(&body) {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(
                    "tenant api: approve body not json reservation_id={reservation_id} err={err}"
                );
                Ok(ApproveReservationResponse::default())
            }
        }
    }

    async fn deny_reservation(
        &self,
        reservation_id: &ReservationId,
        payload: &ReservationDecision,
    ) -> Result<()> {
        let [root, collection] = RESERVATIONS_PATH;
        let url = self.url(&[root, collection, reservation_id.as_str(), "deny"])?;
        self.send(self.http.put(url).json(payload), "deny reservation")
            .await?;
        Ok(())
    }

    async fn update_tenant_config(
        &self,
        tenant_id: &TenantId,
        config: &TenantConfig,
    ) -> Result<()> {
        let [root, collection] = TENANTS_PATH;
        let url = self.url(&[root, collection, tenant_id.as_str(), "config"])?;
        self.send(self.http.put(url).json(config), "update tenant config")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
