//! reqwest-backed implementation of the `Transport` port.
//!
//! Params travel in the query string for GET/DELETE and as the JSON body for
//! POST/PUT/PATCH. A 2xx response body is decoded as JSON (empty bodies and
//! 204/205 become `null`); anything else is reported as a raw status failure
//! for the classifier.

use std::time::Duration;

use async_trait::async_trait;
use netrelay_core::{RawFailure, Transport, TransportOutcome};
use netrelay_domain::{ClientConfig, Headers, HttpMethod, NetRelayError, Operation, Params, Result};
use reqwest::{Client as ReqwestClient, Method, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::errors::{InfraError, IntoRawFailure};

/// HTTP transport resolving operation paths against a base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Transport for `config.base_url` identifying itself as
    /// `config.client_id`.
    ///
    /// # Errors
    /// Returns `NetRelayError::Config` for an unparsable base URL.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::builder().base_url(config.base_url.clone()).user_agent(config.client_id.clone()).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined =
            format!("{}/{}", url.path().trim_end_matches('/'), path.trim_start_matches('/'));
        url.set_path(&joined);
        url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform_request(
        &self,
        operation: &Operation,
        params: &Params,
        headers: &Headers,
        deadline: Duration,
    ) -> TransportOutcome {
        let url = self.endpoint(&operation.path);
        let mut builder = self.client.request(method(operation.method), url.clone()).timeout(deadline);

        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if operation.method.has_body() {
            builder = builder.json(params);
        } else if !params.is_empty() {
            builder = builder.query(&query_pairs(params));
        }

        debug!(method = %operation.method, %url, "sending HTTP request");
        let response =
            builder.send().await.map_err(|err| err.into_raw_failure(deadline))?;

        let status = response.status();
        debug!(method = %operation.method, %url, %status, "received HTTP response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RawFailure::Status { code: status.as_u16(), body });
        }

        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Ok(Value::Null);
        }

        let bytes = response.bytes().await.map_err(|err| err.into_raw_failure(deadline))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|err| RawFailure::Decode(err.to_string()))
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Flatten params into query pairs; strings are sent unquoted.
fn query_pairs(params: &Params) -> Vec<(&str, String)> {
    params
        .iter()
        .map(|(name, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name.as_str(), rendered)
        })
        .collect()
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    base_url: Option<String>,
    user_agent: Option<String>,
    connect_timeout: Duration,
    pool_idle_timeout: Option<Duration>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: None,
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Some(Duration::from_secs(90)),
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// # Errors
    /// - `NetRelayError::Config` if no base URL was set or it does not parse
    /// - `NetRelayError::Transport` if the underlying client cannot be built
    pub fn build(self) -> Result<ReqwestTransport> {
        let raw = self
            .base_url
            .ok_or_else(|| NetRelayError::Config("transport base URL is required".into()))?;
        let base_url = Url::parse(&raw)
            .map_err(|err| NetRelayError::Config(format!("invalid base URL {raw}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(NetRelayError::Config(format!("base URL {raw} cannot be a base")));
        }

        let mut builder = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.pool_idle_timeout)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| NetRelayError::from(InfraError::from(err)))?;

        Ok(ReqwestTransport { client, base_url })
    }
}
