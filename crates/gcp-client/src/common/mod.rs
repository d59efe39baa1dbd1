//! Common utilities for the Google Cloud REST clients
//!
//! Provides the authenticated HTTP wrapper and endpoint table shared by every API surface.

use crate::error::GcpError;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Base URLs of the Google APIs used by the provisioner.
///
/// Every URL can be overridden to point at an emulator or a recording proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub compute: String,
    pub kms: String,
    pub container: String,
    pub resource_manager: String,
    pub service_usage: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com/compute/v1".to_string(),
            kms: "https://cloudkms.googleapis.com/v1".to_string(),
            container: "https://container.googleapis.com/v1".to_string(),
            resource_manager: "https://cloudresourcemanager.googleapis.com/v3".to_string(),
            service_usage: "https://serviceusage.googleapis.com/v1".to_string(),
        }
    }
}

/// Error envelope returned by every Google JSON API
#[derive(Debug, Clone, Deserialize, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Extract a readable message from an error response body.
///
/// Falls back to the raw body when it is not a Google error envelope.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if envelope.error.status.is_empty() => envelope.error.message,
        Ok(envelope) => format!("{} ({})", envelope.error.message, envelope.error.status),
        Err(_) => body.chars().take(500).collect(),
    }
}

/// HTTP client wrapper with bearer authentication
pub struct HttpClient {
    client: Client,
    token: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, token: String) -> Self {
        Self { client, token }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, GcpError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json");
        if let Some(body) = body {
            debug!("{} {} with body: {}", method, url, body);
            request = request.json(body);
        } else {
            debug!("{} {}", method, url);
        }

        let response = request.send().await.map_err(GcpError::Http)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text);
        Err(match status {
            StatusCode::NOT_FOUND => GcpError::NotFound(format!("{} {}: {}", method, url, message)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                GcpError::Authentication(format!("{} {} failed: {} - {}", method, url, status, message))
            }
            _ => GcpError::Api {
                status: status.as_u16(),
                message: format!("{} {} failed: {}", method, url, message),
            },
        })
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, GcpError> {
        let text = response.text().await?;
        // DELETE and some KMS calls answer with an empty body
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(GcpError::Serialization)
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, GcpError> {
        let response = self.send(Method::GET, url, None).await?;
        Self::decode(response).await
    }

    /// Make a POST request
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, GcpError> {
        let response = self.send(Method::POST, url, Some(body)).await?;
        Self::decode(response).await
    }

    /// Make a PATCH request
    pub async fn patch<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, GcpError> {
        let response = self.send(Method::PATCH, url, Some(body)).await?;
        Self::decode(response).await
    }

    /// Make a PUT request
    pub async fn put<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, GcpError> {
        let response = self.send(Method::PUT, url, Some(body)).await?;
        Self::decode(response).await
    }

    /// Make a DELETE request
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, GcpError> {
        let response = self.send(Method::DELETE, url, None).await?;
        Self::decode(response).await
    }

    /// Build query string from parameters
    pub fn build_query_string(params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error": {"code": 409, "message": "The resource 'demo' already exists", "status": "ALREADY_EXISTS"}}"#;
        assert_eq!(
            error_message(body),
            "The resource 'demo' already exists (ALREADY_EXISTS)"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("upstream connect error"), "upstream connect error");
    }

    #[test]
    fn test_build_query_string_encodes() {
        let query = HttpClient::build_query_string(&[("updateMask", "state"), ("filter", "a b")]);
        assert_eq!(query, "updateMask=state&filter=a%20b");
    }
}
