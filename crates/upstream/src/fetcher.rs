//! External data fetcher: one HTTP call per request, parsed JSON body back.
//!
//! Failure classes:
//! - non-2xx status → `AppError::Upstream` with status and body text
//! - send/timeout failure → `AppError::Transport`
//! - 2xx with an unparsable body → `AppError::Decode`
//!
//! Subjects are validated by the caller before a request is ever built.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use assure_common::error::AppError;
use assure_common::types::{Secret, SourceKind};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Where an upstream expects its credential.
#[derive(Debug, Clone)]
pub enum Credential {
    Query { name: &'static str, secret: Secret },
    Header { name: &'static str, secret: Secret },
}

/// Description of a single upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub source: SourceKind,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub credential: Option<Credential>,
}

impl UpstreamRequest {
    pub fn get(source: SourceKind, url: impl Into<String>) -> Self {
        Self {
            source,
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            credential: None,
        }
    }

    pub fn post(source: SourceKind, url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(source, url)
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }
}

/// Performs upstream calls. Implemented over HTTP in production and by
/// [`crate::mock::MockFetcher`] in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value, AppError>;
}

/// `reqwest`-backed fetcher with a per-call timeout and a retry policy.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, retry))
    }

    pub fn with_client(client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    async fn fetch_once(&self, request: &UpstreamRequest) -> Result<Value, AppError> {
        let source_name = request.source.to_string();

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match &request.credential {
            Some(Credential::Query { name, secret }) => {
                builder = builder.query(&[(*name, secret.expose())]);
            }
            Some(Credential::Header { name, secret }) => {
                builder = builder.header(*name, secret.expose());
            }
            None => {}
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            source = %request.source,
            method = ?request.method,
            url = %request.url,
            "Calling upstream"
        );

        // URLs may carry credentials in the query string; keep them out of errors.
        let response = builder.send().await.map_err(|e| AppError::Transport {
            source_name: source_name.clone(),
            message: e.without_url().to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(source = %request.source, status = status.as_u16(), "Upstream returned error status");
            return Err(AppError::Upstream {
                source_name,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| AppError::Transport {
            source_name: source_name.clone(),
            message: e.without_url().to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| AppError::Decode {
            source_name,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value, AppError> {
        self.retry
            .run(request.source.as_str(), || self.fetch_once(request))
            .await
    }
}
