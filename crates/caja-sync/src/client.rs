//! # Store Server HTTP Client
//!
//! Thin typed wrapper over `reqwest` for the sync endpoints. Every call
//! carries the configured timeout, attaches the bearer token when one is
//! set, and turns non-2xx responses into [`SyncError::HttpStatus`].

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};
use url::Url;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    ChangeRequest, ChangeResponse, PushRequest, PushResponse, CHANGES_PATH, HEALTH_PATH,
    PING_PATH, PUSH_PATH, STATISTICS_PATH,
};

#[derive(Debug, Clone)]
pub struct SyncHttpClient {
    client: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl SyncHttpClient {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client setup failed: {}", e)))?;

        Ok(SyncHttpClient {
            client,
            base_url: config.base_url()?,
            token: Arc::new(RwLock::new(
                config.server.api_token.clone().filter(|t| !t.is_empty()),
            )),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Replaces the bearer token used by subsequent requests.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token.filter(|t| !t.is_empty());
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// `GET /api/sync/ping`
    pub async fn ping(&self) -> SyncResult<()> {
        self.send(self.request(Method::GET, PING_PATH).await?, PING_PATH)
            .await?;
        Ok(())
    }

    /// `POST /api/sync/cambios`
    pub async fn fetch_changes(&self, request: &ChangeRequest) -> SyncResult<ChangeResponse> {
        self.post_json(CHANGES_PATH, request).await
    }

    /// `POST /api/sync/recibir-cambios`
    pub async fn push_changes(&self, request: &PushRequest) -> SyncResult<PushResponse> {
        self.post_json(PUSH_PATH, request).await
    }

    /// `GET /api/sync/estadisticas`
    pub async fn statistics(&self) -> SyncResult<serde_json::Value> {
        self.get_json(STATISTICS_PATH).await
    }

    /// `GET /api/sync/health`
    pub async fn health(&self) -> SyncResult<serde_json::Value> {
        self.get_json(HEALTH_PATH).await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    async fn request(&self, method: Method, path: &str) -> SyncResult<RequestBuilder> {
        let url = self.base_url.join(path)?;
        let builder = self.client.request(method, url);

        Ok(match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> SyncResult<Response> {
        let response = builder.send().await.map_err(|e| {
            error!(endpoint = path, error = %e, "Sync request failed");
            SyncError::from(e)
        })?;

        let status = response.status();
        debug!(endpoint = path, status = status.as_u16(), "Sync response");

        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }
        Ok(response)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> SyncResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).await?.json(body);
        let response = self.send(builder, path).await?;
        decode(response, path).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        let builder = self.request(Method::GET, path).await?;
        let response = self.send(builder, path).await?;
        decode(response, path).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> SyncResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(endpoint = path, error = %e, "Unexpected response body");
        SyncError::DeserializationFailed(format!("{}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_is_normalised() {
        let mut config = SyncConfig::default();
        config.server.api_token = Some("abc".into());

        let client = SyncHttpClient::new(&config).unwrap();
        assert!(client.has_token().await);

        client.set_token(Some(String::new())).await;
        assert!(!client.has_token().await);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connectivity_error() {
        // Grab a free port, then close it so nothing is listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let mut config = SyncConfig::default();
        config.server.port = port;
        config.sync.request_timeout_secs = 2;

        let client = SyncHttpClient::new(&config).unwrap();
        let err = client.ping().await.unwrap_err();
        assert!(err.is_connectivity(), "unexpected error: {err:?}");
    }
}
