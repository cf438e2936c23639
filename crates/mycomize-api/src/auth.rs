use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kind of automation gateway behind a base URL.
///
/// Determines which REST dialect the gateway speaks. Only Home Assistant
/// compatible gateways exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GatewayKind {
    /// Home-Assistant-compatible REST API (`/api/`, `/api/states`).
    #[default]
    #[serde(rename = "home_assistant")]
    HomeAssistant,
}

impl GatewayKind {
    /// Wire name used by the backend's `type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HomeAssistant => "home_assistant",
        }
    }
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GatewayKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home_assistant" | "hass" => Ok(Self::HomeAssistant),
            other => Err(Error::Api {
                status: 0,
                message: format!("unsupported gateway kind '{other}'"),
            }),
        }
    }
}

/// Build the default header map carrying `Authorization: Bearer <token>`.
///
/// The header value is marked sensitive so it never shows up in
/// `reqwest`'s debug output.
pub(crate) fn bearer_headers(token: &SecretString) -> Result<HeaderMap, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| Error::InvalidToken(e.to_string()))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
