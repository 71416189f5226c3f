//! Common utilities for the SoftLayer API client
//!
//! Provides the authenticated HTTP wrapper shared by every service module.

pub mod query;

use crate::error::SoftLayerError;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use query::{ObjectMask, Query, filter_eq, filter_operation, merge_filters};

/// Fault body returned by the REST endpoint on error
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FaultBody {
    error: String,
    code: String,
}

/// Build a service path such as `SoftLayer_Virtual_Guest/42/getObject`
pub fn service_path(service: &str, id: Option<u64>, method: &str) -> String {
    match id {
        Some(id) => format!("{}/{}/{}", service, id, method),
        None => format!("{}/{}", service, method),
    }
}

/// HTTP client wrapper with basic authentication
pub struct HttpClient {
    client: Client,
    base_url: String,
    username: String,
    api_key: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, username: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            api_key,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Username the client authenticates as
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Build a full `.json` URL from a service path and query
    pub fn build_url(&self, path: &str, query: &Query) -> String {
        let query_string = query.to_query_string();
        if query_string.is_empty() {
            format!("{}/{}.json", self.base_url, path)
        } else {
            format!("{}/{}.json?{}", self.base_url, path, query_string)
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
    ) -> Result<T, SoftLayerError> {
        let url = self.build_url(path, query);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(SoftLayerError::Http)?;

        Self::decode(path, response).await
    }

    /// Make a POST request with a `{"parameters": [...]}` envelope
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        parameters: Vec<serde_json::Value>,
    ) -> Result<T, SoftLayerError> {
        let url = self.build_url(path, &Query::default());
        debug!("{}", post_summary(&url, &parameters));
        let body = serde_json::json!({ "parameters": parameters });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.api_key))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(SoftLayerError::Http)?;

        Self::decode(path, response).await
    }

    /// Make a DELETE request against `{service}/{id}`
    pub async fn delete(&self, path: &str) -> Result<bool, SoftLayerError> {
        let url = self.build_url(path, &Query::default());
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .basic_auth(&self.username, Some(&self.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(SoftLayerError::Http)?;

        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: Response,
    ) -> Result<T, SoftLayerError> {
        let status = response.status();
        let body = response.text().await.map_err(SoftLayerError::Http)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                SoftLayerError::InvalidRequest(format!(
                    "error decoding response body for {}: {} - Response (first 500 chars): {}",
                    path,
                    e,
                    body.chars().take(500).collect::<String>()
                ))
            });
        }

        let fault: FaultBody = serde_json::from_str(&body).unwrap_or_default();
        let message = if fault.error.is_empty() {
            body
        } else {
            fault.error
        };

        if status == 404 {
            return Err(SoftLayerError::NotFound(format!("{} - {}", path, message)));
        }
        if status == 401 || status == 403 {
            return Err(SoftLayerError::Authentication(message));
        }

        Err(SoftLayerError::Api {
            status: status.as_u16(),
            code: fault.code,
            message,
        })
    }
}

/// Log line for a POST; parameters can carry passwords, so only their count is logged
fn post_summary(url: &str, parameters: &[serde_json::Value]) -> String {
    format!("POST {} with {} parameter(s)", url, parameters.len())
}
