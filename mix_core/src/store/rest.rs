//! HTTP/JSON client for the persistence service.
//!
//! ## Endpoints
//!
//! | Operation            | Request                                         |
//! |----------------------|-------------------------------------------------|
//! | list configs         | `GET    /api/aba-material-configs`              |
//! | get config           | `GET    /api/aba-material-configs/{id}`         |
//! | default config       | `GET    /api/aba-material-configs/default`      |
//! | create config        | `POST   /api/aba-material-configs`              |
//! | set default          | `POST   /api/aba-material-configs/{id}/set-default` |
//! | list formulas        | `GET    /api/aba-formulas`                      |
//! | create formula       | `POST   /api/aba-formulas`                      |
//! | update formula       | `PUT    /api/aba-formulas/{id}`                 |
//! | delete formula       | `DELETE /api/aba-formulas/{id}`                 |
//! | list raw materials   | `GET    /api/raw-materials`                     |
//!
//! Non-2xx responses become [`CalcError::Transport`] carrying the status code,
//! except a 404 on a single-item lookup, which becomes [`CalcError::NotFound`]
//! (or `None` for the default config).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{MixStore, RawMaterial};
use crate::config::{AbaMaterialConfig, NewAbaMaterialConfig};
use crate::errors::{CalcError, CalcResult};
use crate::formula::AbaFormula;
use crate::settings::Settings;

const CONFIGS_PATH: &str = "/api/aba-material-configs";
const FORMULAS_PATH: &str = "/api/aba-formulas";
const RAW_MATERIALS_PATH: &str = "/api/raw-materials";

/// Client application identifier sent with every request
const USER_AGENT: &str = concat!("abamix/", env!("CARGO_PKG_VERSION"));

/// [`MixStore`] backed by the persistence service's REST API.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    /// Create a client for the service at `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> CalcResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CalcError::missing_field("api_base_url"));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CalcError::transport("build client", None, e.to_string()))?;

        Ok(RestStore { client, base_url })
    }

    pub fn from_settings(settings: &Settings) -> CalcResult<Self> {
        RestStore::new(&settings.api_base_url, Duration::from_secs(settings.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, operation: &str, request: RequestBuilder) -> CalcResult<Response> {
        debug!(operation, "sending request to persistence service");
        request.send().await.map_err(|e| {
            warn!(operation, error = %e, "persistence service unreachable");
            CalcError::transport(operation, None, e.to_string())
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> CalcResult<T> {
        let response = self.execute(operation, self.client.get(self.url(path))).await?;
        decode(operation, expect_success(operation, response).await?).await
    }
}

async fn expect_success(operation: &str, response: Response) -> CalcResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(operation, status = status.as_u16(), "persistence service returned an error");
    Err(CalcError::transport(operation, Some(status.as_u16()), error_reason(status, &body)))
}

async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> CalcResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| CalcError::serialization(format!("Invalid response to {}: {}", operation, e)))
}

/// Prefer the service's own `message` field when the body carries one.
fn error_reason(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));
    match message {
        Some(message) => format!("{}: {}", status, message),
        None if body.trim().is_empty() => status.to_string(),
        None => format!("{}: {}", status, body.trim()),
    }
}

#[async_trait]
impl MixStore for RestStore {
    async fn list_configs(&self) -> CalcResult<Vec<AbaMaterialConfig>> {
        self.get_json("list configs", CONFIGS_PATH).await
    }

    async fn get_config(&self, id: i64) -> CalcResult<AbaMaterialConfig> {
        let operation = "get config";
        let path = format!("{}/{}", CONFIGS_PATH, id);
        let response = self.execute(operation, self.client.get(self.url(&path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CalcError::not_found("ABA material config", id));
        }
        decode(operation, expect_success(operation, response).await?).await
    }

    async fn get_default_config(&self) -> CalcResult<Option<AbaMaterialConfig>> {
        let operation = "get default config";
        let path = format!("{}/default", CONFIGS_PATH);
        let response = self.execute(operation, self.client.get(self.url(&path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(operation, expect_success(operation, response).await?).await
    }

    async fn create_config(&self, config: &NewAbaMaterialConfig) -> CalcResult<AbaMaterialConfig> {
        let operation = "create config";
        let request = self.client.post(self.url(CONFIGS_PATH)).json(config);
        let response = self.execute(operation, request).await?;
        decode(operation, expect_success(operation, response).await?).await
    }

    async fn set_default_config(&self, id: i64) -> CalcResult<()> {
        let operation = "set default config";
        let path = format!("{}/{}/set-default", CONFIGS_PATH, id);
        let response = self.execute(operation, self.client.post(self.url(&path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CalcError::not_found("ABA material config", id));
        }
        expect_success(operation, response).await?;
        Ok(())
    }

    async fn list_formulas(&self) -> CalcResult<Vec<AbaFormula>> {
        self.get_json("list formulas", FORMULAS_PATH).await
    }

    async fn create_formula(&self, formula: &AbaFormula) -> CalcResult<AbaFormula> {
        let operation = "create formula";
        let request = self.client.post(self.url(FORMULAS_PATH)).json(formula);
        let response = self.execute(operation, request).await?;
        decode(operation, expect_success(operation, response).await?).await
    }

    async fn update_formula(&self, id: i64, formula: &AbaFormula) -> CalcResult<AbaFormula> {
        let operation = "update formula";
        let path = format!("{}/{}", FORMULAS_PATH, id);
        let response = self.execute(operation, self.client.put(self.url(&path)).json(formula)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CalcError::not_found("ABA formula", id));
        }
        decode(operation, expect_success(operation, response).await?).await
    }

    async fn delete_formula(&self, id: i64) -> CalcResult<()> {
        let operation = "delete formula";
        let path = format!("{}/{}", FORMULAS_PATH, id);
        let response = self.execute(operation, self.client.delete(self.url(&path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CalcError::not_found("ABA formula", id));
        }
        expect_success(operation, response).await?;
        Ok(())
    }

    async fn list_raw_materials(&self) -> CalcResult<Vec<RawMaterial>> {
        self.get_json("list raw materials", RAW_MATERIALS_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let store = RestStore::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(store.base_url(), "http://localhost:5000");
        assert_eq!(store.url(CONFIGS_PATH), "http://localhost:5000/api/aba-material-configs");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let err = RestStore::new("", Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_error_reason() {
        assert_eq!(
            error_reason(StatusCode::BAD_REQUEST, r#"{"message":"name is required"}"#),
            "400 Bad Request: name is required"
        );
        assert_eq!(error_reason(StatusCode::INTERNAL_SERVER_ERROR, ""), "500 Internal Server Error");
        assert_eq!(error_reason(StatusCode::BAD_GATEWAY, "upstream down\n"), "502 Bad Gateway: upstream down");
    }
}
