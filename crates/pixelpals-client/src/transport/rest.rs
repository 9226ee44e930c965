//! REST snapshot and command requests.

use pixelpals_core::AuthToken;

use super::{TransportConfig, TransportError};
use crate::{FetchError, Method, Request, Response};

/// Executes [`Request`]s against the REST API with the bearer token.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_url: String,
    token: AuthToken,
}

impl RestClient {
    /// Build a client for `token`.
    pub fn new(config: &TransportConfig, token: AuthToken) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self { http, api_url: config.api_url.trim_end_matches('/').to_string(), token })
    }

    /// Absolute URL of `request`.
    pub fn url(&self, request: &Request) -> String {
        format!("{}{}", self.api_url, request.path())
    }

    /// Execute `request` and decode its response.
    ///
    /// # Errors
    ///
    /// - `FetchError::Unauthorized` for 401/403
    /// - `FetchError::Status` for other non-success statuses
    /// - `FetchError::Transport` for connection failures and timeouts
    /// - `FetchError::Decode` if the body does not fit the endpoint
    pub async fn execute(&self, request: &Request) -> Result<Response, FetchError> {
        let url = self.url(request);
        let builder = match request.method() {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };

        let response = builder
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "request rejected");
            return Err(FetchError::from_status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| FetchError::Transport(e.to_string()))?;
        request.decode_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let config = TransportConfig {
            api_url: "http://backend:8080/api/".into(),
            ..TransportConfig::default()
        };
        let client = RestClient::new(&config, AuthToken::new("t"));

        assert!(matches!(
            client.map(|c| c.url(&Request::UnreadTotal)).as_deref(),
            Ok("http://backend:8080/api/messages/unread/total")
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let config = TransportConfig {
            api_url: "http://127.0.0.1:1/api".into(),
            ..TransportConfig::default()
        };
        let Ok(client) = RestClient::new(&config, AuthToken::new("t")) else {
            return;
        };

        let result = client.execute(&Request::FriendStatus).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
