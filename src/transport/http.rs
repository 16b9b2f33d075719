use super::{build_url, Operation, Transport, TransportError};
use crate::model::ClientConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

/// Stateless HTTP client for the agent backend.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        operation: Operation,
        params: &[(&'static str, String)],
    ) -> Result<serde_json::Value, TransportError> {
        let url = build_url(&self.base_url, operation, params);
        tracing::debug!(%operation, %url, "calling backend");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::network(operation, format!("timed out: {e}"))
            } else {
                TransportError::network(operation, e)
            }
        })?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::network(operation, e))?;
        tracing::trace!(%operation, status, body = %body, "raw response");

        decode_response(operation, status, content_type.as_deref(), body)
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Classify a completed HTTP exchange into a JSON value or a `TransportError`.
pub(crate) fn decode_response(
    operation: Operation,
    status: u16,
    content_type: Option<&str>,
    body: String,
) -> Result<serde_json::Value, TransportError> {
    if !(200..300).contains(&status) {
        return Err(TransportError::from_envelope(operation, status, &body)
            .unwrap_or(TransportError::Status {
                operation,
                status,
                body,
            }));
    }

    if !content_type.is_some_and(is_json_content_type) {
        return Err(TransportError::NotJson {
            operation,
            content_type: content_type.map(str::to_string),
            body,
        });
    }

    let value: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return Err(TransportError::MalformedJson {
                operation,
                reason: e.to_string(),
                body,
            })
        }
    };

    // A forwarding layer may wrap failures as a lone `{"error": ...}` even on 2xx.
    if value.as_object().is_some_and(|m| m.len() == 1) {
        if let Some(err) = TransportError::from_envelope(operation, status, &body) {
            return Err(err);
        }
    }

    Ok(value)
}
