// Async HTTP client for the Mycomize backend IoT API.
//
// Base path: `{base_url}/iot-gateways/`
// Auth: `Authorization: Bearer <session token>`

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{
    BulkEntityCreate, BulkEntityIds, EntityCreate, EntityRecord, EntityUpdate, GatewayRecord,
    GatewayWrite, LinkRequest,
};
use crate::auth::bearer_headers;
use crate::error::Error;
use crate::response;
use crate::transport::TransportConfig;

/// Async client for the backend's gateway, entity and link endpoints.
///
/// A 401 from any method surfaces as [`Error::Authentication`] so callers
/// can treat the session as expired.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    // ── Constructors ─────────────────────────────────────────────────

    pub fn from_token(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client_with_headers(bearer_headers(token)?)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw.trim())?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        response::decode(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        response::decode(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        response::decode(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        response::decode(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        response::expect_empty(resp).await
    }

    async fn delete_with_response<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        response::decode(resp).await
    }

    async fn delete_with_body<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).json(body).send().await?;
        response::expect_empty(resp).await
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Gateways ─────────────────────────────────────────────────────

    pub async fn list_gateways(&self, skip: u32, limit: u32) -> Result<Vec<GatewayRecord>, Error> {
        self.get_with_params(
            "iot-gateways/",
            &[("skip", skip.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn get_gateway(&self, gateway_id: i64) -> Result<GatewayRecord, Error> {
        self.get(&format!("iot-gateways/{gateway_id}")).await
    }

    pub async fn create_gateway(&self, body: &GatewayWrite) -> Result<GatewayRecord, Error> {
        self.post("iot-gateways/", body).await
    }

    pub async fn update_gateway(
        &self,
        gateway_id: i64,
        body: &GatewayWrite,
    ) -> Result<GatewayRecord, Error> {
        self.put(&format!("iot-gateways/{gateway_id}"), body).await
    }

    pub async fn delete_gateway(&self, gateway_id: i64) -> Result<(), Error> {
        self.delete(&format!("iot-gateways/{gateway_id}")).await
    }

    // ── Entities ─────────────────────────────────────────────────────

    pub async fn list_entities(&self, gateway_id: i64) -> Result<Vec<EntityRecord>, Error> {
        self.get(&format!("iot-gateways/{gateway_id}/entities"))
            .await
    }

    pub async fn create_entity(
        &self,
        gateway_id: i64,
        body: &EntityCreate,
    ) -> Result<EntityRecord, Error> {
        self.post(&format!("iot-gateways/{gateway_id}/entities"), body)
            .await
    }

    pub async fn bulk_create_entities(
        &self,
        gateway_id: i64,
        entities: Vec<EntityCreate>,
    ) -> Result<Vec<EntityRecord>, Error> {
        self.post(
            &format!("iot-gateways/{gateway_id}/entities/bulk-create"),
            &BulkEntityCreate { entities },
        )
        .await
    }

    pub async fn update_entity(
        &self,
        gateway_id: i64,
        entity_id: i64,
        body: &EntityUpdate,
    ) -> Result<EntityRecord, Error> {
        self.put(
            &format!("iot-gateways/{gateway_id}/entities/{entity_id}"),
            body,
        )
        .await
    }

    pub async fn delete_entity(&self, gateway_id: i64, entity_id: i64) -> Result<(), Error> {
        self.delete(&format!("iot-gateways/{gateway_id}/entities/{entity_id}"))
            .await
    }

    pub async fn bulk_delete_entities(
        &self,
        gateway_id: i64,
        entity_ids: Vec<i64>,
    ) -> Result<(), Error> {
        self.delete_with_body(
            &format!("iot-gateways/{gateway_id}/entities/bulk-delete"),
            &BulkEntityIds { entity_ids },
        )
        .await
    }

    // ── Links ────────────────────────────────────────────────────────

    /// `PUT /iot-gateways/{gw}/entities/{id}/link` -- replaces any prior link.
    pub async fn link_entity(
        &self,
        gateway_id: i64,
        entity_id: i64,
        body: &LinkRequest,
    ) -> Result<EntityRecord, Error> {
        self.put(
            &format!("iot-gateways/{gateway_id}/entities/{entity_id}/link"),
            body,
        )
        .await
    }

    /// `DELETE /iot-gateways/{gw}/entities/{id}/unlink`
    pub async fn unlink_entity(
        &self,
        gateway_id: i64,
        entity_id: i64,
    ) -> Result<EntityRecord, Error> {
        self.delete_with_response(&format!(
            "iot-gateways/{gateway_id}/entities/{entity_id}/unlink"
        ))
        .await
    }
}
