use std::time::Duration;

use reqwest::{Client, Method};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{GatewayError, upstream_message};

/// RetryPolicy
///
/// `max_retries` is the total number of attempts. The delay after failed attempt
/// `n` (0-based) is `base_delay * 2^n`; no delay follows the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// ApiClient
///
/// Backend client for the gateway's own calls (session lookups and the like).
/// Unlike proxy routes it retries with exponential backoff.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, policy))
    }

    pub fn with_client(http: Client, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// fetch_with_retry
    ///
    /// Sends `method path` with an optional bearer token and JSON body, returning
    /// the decoded JSON (`Value::Null` for empty bodies). Every failure, any non-2xx
    /// included, is attempted again until `max_retries` attempts are used up; the
    /// final error names the path, attempt count and last cause.
    pub async fn fetch_with_retry(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        self.fetch_with_retry_when(method, path, token, body, |_| true)
            .await
    }

    /// Like `fetch_with_retry`, but a failure `retry` rejects is returned at once
    /// instead of spending the remaining attempts.
    pub async fn fetch_with_retry_when(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
        retry: fn(&GatewayError) -> bool,
    ) -> Result<Value, GatewayError> {
        let attempts = self.policy.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.send_once(method.clone(), path, token, body).await {
                Ok(value) => return Ok(value),
                Err(err) if retry(&err) => {
                    tracing::warn!(
                        "{} {} failed on attempt {} of {}: {}",
                        method,
                        path,
                        attempt + 1,
                        attempts,
                        err
                    );
                    last_error = Some(err);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        tracing::error!("{} {} failed after {} attempts", method, path, attempts);
        Err(GatewayError::RetriesExhausted {
            path: path.to_string(),
            attempts,
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, GatewayError> {
        let value = self.fetch_with_retry(Method::GET, path, token, None).await?;
        serde_json::from_value(value).map_err(|e| GatewayError::Upstream {
            status: reqwest::StatusCode::BAD_GATEWAY,
            message: format!("Unexpected response from {path}: {e}"),
        })
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, GatewayError> {
        let body = serde_json::to_value(body)
            .map_err(|e| GatewayError::InvalidBody(e.to_string()))?;
        let value = self
            .fetch_with_retry(Method::POST, path, token, Some(&body))
            .await?;
        serde_json::from_value(value).map_err(|e| GatewayError::Upstream {
            status: reqwest::StatusCode::BAD_GATEWAY,
            message: format!("Unexpected response from {path}: {e}"),
        })
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        if status.is_success() {
            Ok(value)
        } else {
            Err(GatewayError::Upstream {
                status,
                message: upstream_message(&value)
                    .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16())),
            })
        }
    }
}
