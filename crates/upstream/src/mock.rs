//! In-memory upstream doubles for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use assure_common::error::AppError;
use assure_common::types::SourceKind;

use crate::fetcher::{Fetcher, UpstreamRequest};
use crate::generator::{GenerationParams, TextGenerator};

/// Canned answer for one source.
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    Status(u16, String),
    Unreachable,
}

impl MockReply {
    fn to_result(&self, source: SourceKind) -> Result<Value, AppError> {
        match self {
            MockReply::Json(value) => Ok(value.clone()),
            MockReply::Status(status, body) => Err(AppError::Upstream {
                source_name: source.to_string(),
                status: *status,
                body: body.clone(),
            }),
            MockReply::Unreachable => Err(AppError::Transport {
                source_name: source.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

/// Fetcher answering from a per-source table and recording every request.
#[derive(Default)]
pub struct MockFetcher {
    replies: HashMap<SourceKind, MockReply>,
    requests: Mutex<Vec<UpstreamRequest>>,
    call_count: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, source: SourceKind, value: Value) -> Self {
        self.with_reply(source, MockReply::Json(value))
    }

    pub fn with_status(self, source: SourceKind, status: u16, body: &str) -> Self {
        self.with_reply(source, MockReply::Status(status, body.to_string()))
    }

    pub fn with_reply(mut self, source: SourceKind, reply: MockReply) -> Self {
        self.replies.insert(source, reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, source: SourceKind) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.source == source)
            .count()
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value, AppError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.replies.get(&request.source) {
            Some(reply) => reply.to_result(request.source),
            None => Err(AppError::Upstream {
                source_name: request.source.to_string(),
                status: 404,
                body: "no mock reply configured".to_string(),
            }),
        }
    }
}

/// Generator returning a fixed text, or failing, and recording prompts.
pub struct MockGenerator {
    response: Option<String>,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockGenerator {
    pub fn responding(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, AppError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        self.response
            .clone()
            .ok_or_else(|| AppError::Generation("mock generator configured to fail".to_string()))
    }
}
