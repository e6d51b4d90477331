use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{remote::tdjson::JsonTransport, Error, Result};

/// JSON-over-HTTP bridge to the chat backend.
///
/// Each request is POSTed as-is to a single endpoint; the response body is the
/// tagged JSON result (or a tagged `error` object).
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn send(&self, payload: Value) -> Result<Value> {
        let method = payload
            .get("@type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(%method, "bridge request");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::backend(0, format!("bridge unreachable ({method}): {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::backend(
                i32::from(status.as_u16()),
                format!("bridge returned {status} for {method}: {body}"),
            ));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| Error::backend(0, format!("invalid bridge response for {method}: {e}")))
    }
}
