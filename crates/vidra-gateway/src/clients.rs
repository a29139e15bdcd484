//! RPC clients for the backend services.
//!
//! The gateway relays bodies and status codes as-is; it never
//! rewrites service responses. Read calls carry a 5-second deadline,
//! the upload relay is bounded only by client liveness.

use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use log::error;
use reqwest::Client;
use serde_json::{json, Value};

use vidra_commons::rpc::UploadMetadata;

/// Deadline for read relays.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A relayed response: status code plus JSON body.
pub type Relayed = (u16, Value);

/// A relayed raw response: status, content type, body bytes.
pub type RelayedRaw = (u16, String, Bytes);

/// Thin HTTP client for one backend service.
#[derive(Clone)]
pub struct RpcClient {
    http: Client,
    base_url: String,
}

impl RpcClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    /// POST a JSON body, 5 s deadline.
    pub async fn post_json(&self, path: &str, body: &Value) -> Relayed {
        let result = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .timeout(READ_TIMEOUT)
            .json(body)
            .send()
            .await;
        Self::relay_json(result).await
    }

    /// GET with query pairs, 5 s deadline.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Relayed {
        let result = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .timeout(READ_TIMEOUT)
            .query(query)
            .send()
            .await;
        Self::relay_json(result).await
    }

    /// GET returning raw bytes (playlists, segments), 5 s deadline.
    pub async fn get_raw(&self, path: &str) -> RelayedRaw {
        let result = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .timeout(READ_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                match resp.bytes().await {
                    Ok(bytes) => (status, content_type, bytes),
                    Err(e) => {
                        error!("reading relay body failed: {e}");
                        backend_unavailable()
                    }
                }
            }
            Err(e) => {
                error!("relay request failed: {e}");
                backend_unavailable()
            }
        }
    }

    /// POST the framed upload stream: one metadata line, then raw
    /// chunks. No deadline.
    pub async fn post_upload<S>(&self, path: &str, metadata: &UploadMetadata, chunks: S) -> Relayed
    where
        S: futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        let mut frame = match serde_json::to_vec(metadata) {
            Ok(frame) => frame,
            Err(e) => {
                return (
                    500,
                    json!({ "success": false, "message": format!("metadata encoding failed: {e}") }),
                )
            }
        };
        frame.push(b'\n');

        let body = futures_util::stream::once(async move {
            Ok::<_, std::io::Error>(Bytes::from(frame))
        })
        .chain(chunks);

        let result = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await;
        Self::relay_json(result).await
    }

    async fn relay_json(result: Result<reqwest::Response, reqwest::Error>) -> Relayed {
        match result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.json::<Value>().await.unwrap_or_else(
                    |e| json!({ "success": false, "message": format!("unreadable response: {e}") }),
                );
                (status, body)
            }
            Err(e) => {
                error!("relay request failed: {e}");
                (
                    500,
                    json!({ "success": false, "message": "backend unavailable" }),
                )
            }
        }
    }
}

fn backend_unavailable() -> RelayedRaw {
    (
        500,
        "application/json".to_string(),
        Bytes::from_static(br#"{"success":false,"message":"backend unavailable"}"#),
    )
}

/// Clients for the two backend services.
#[derive(Clone)]
pub struct BackendClients {
    pub member: RpcClient,
    pub streaming: RpcClient,
}

impl BackendClients {
    pub fn new(member_url: &str, streaming_url: &str) -> Self {
        let http = Client::new();
        Self {
            member: RpcClient::new(http.clone(), member_url),
            streaming: RpcClient::new(http, streaming_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = RpcClient::new(Client::new(), "http://member:8081///");
        assert_eq!(client.base_url, "http://member:8081");
    }
}
