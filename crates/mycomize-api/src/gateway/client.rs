// Async HTTP client for a Home-Assistant-compatible gateway.
//
// Auth: `Authorization: Bearer <long-lived access token>`
// Base path: `{base_url}/api/`

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{ApiStatus, RawState};
use crate::auth::bearer_headers;
use crate::error::Error;
use crate::response;
use crate::transport::TransportConfig;

/// Raw HTTP client for one gateway.
///
/// Stateless apart from the connection pool: every method is a single
/// request, no retries, no caching. Caching and status tracking live in
/// `mycomize-core`.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GatewayClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and access token.
    ///
    /// Injects `Authorization: Bearer …` as a default header on every request.
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

    /// Ensure the base URL ends with `/api/` so relative joins work.
    ///
    /// Accepts `http://hass.local:8123`, `http://hass.local:8123/` and
    /// `http://hass.local:8123/api` alike.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw.trim())?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }
        Ok(url)
    }

    /// The normalized `/api/` root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
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

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// `GET /api/` -- cheapest authenticated request; used as a health check.
    pub async fn api_status(&self) -> Result<ApiStatus, Error> {
        // The root path is the base URL itself.
        self.get("").await
    }

    /// `GET /api/states` -- every entity the gateway knows about.
    pub async fn states(&self) -> Result<Vec<RawState>, Error> {
        self.get("states").await
    }

    /// `GET /api/states/{entity_id}`
    pub async fn state(&self, entity_id: &str) -> Result<RawState, Error> {
        self.get(&format!("states/{entity_id}")).await
    }

    /// `POST /api/services/{domain}/{service}` -- returns the states that
    /// changed as a result of the call.
    pub async fn call_service<B: Serialize + Sync>(
        &self,
        domain: &str,
        service: &str,
        body: &B,
    ) -> Result<Vec<RawState>, Error> {
        self.post(&format!("services/{domain}/{service}"), body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayClient;

    #[test]
    fn base_url_gains_api_suffix() {
        let client =
            GatewayClient::from_reqwest("http://hass.local:8123", reqwest::Client::new())
                .expect("valid url");
        assert_eq!(client.base_url().as_str(), "http://hass.local:8123/api/");
    }

    #[test]
    fn base_url_keeps_existing_api_suffix() {
        let client =
            GatewayClient::from_reqwest("http://hass.local:8123/api/", reqwest::Client::new())
                .expect("valid url");
        assert_eq!(client.base_url().as_str(), "http://hass.local:8123/api/");
    }

    #[test]
    fn base_url_with_prefix_path() {
        let client =
            GatewayClient::from_reqwest("https://proxy.example/hass/", reqwest::Client::new())
                .expect("valid url");
        assert_eq!(client.base_url().as_str(), "https://proxy.example/hass/api/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(GatewayClient::from_reqwest("not a url", reqwest::Client::new()).is_err());
    }
}
