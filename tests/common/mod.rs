#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_adapter::error::ChatError;
use chat_adapter::http::{
    DynHttpTransport, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};
use futures_util::stream;
use serde_json::Value;

/// In-memory transport answering every request with one canned status and body.
///
/// Streaming responses deliver the body in `chunks` pieces of roughly equal size so the
/// SSE decoder sees events split across reads.
pub struct MockTransport {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    chunks: usize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
            chunks: 3,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn json(status: u16, body: Value) -> Arc<Self> {
        Self::new(status, body.to_string())
    }

    pub fn with_header(status: u16, body: Value, name: &str, value: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            headers: HashMap::from([(name.to_string(), value.to_string())]),
            body: body.to_string().into_bytes(),
            chunks: 1,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }

    pub fn last_body(&self) -> Value {
        serde_json::from_slice(&self.last_request().body).expect("request body is JSON")
    }

    fn record(&self, request: HttpRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

pub fn dyn_transport(mock: &Arc<MockTransport>) -> DynHttpTransport {
    mock.clone()
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ChatError> {
        self.record(request);
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, ChatError> {
        self.record(request);
        let size = self.body.len().div_ceil(self.chunks).max(1);
        let pieces: Vec<Result<Vec<u8>, ChatError>> =
            self.body.chunks(size).map(|piece| Ok(piece.to_vec())).collect();
        Ok(HttpStreamResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: Box::pin(stream::iter(pieces)),
        })
    }
}

/// Transport whose every call fails before reaching a server.
pub struct UnreachableTransport;

#[async_trait]
impl HttpTransport for UnreachableTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ChatError> {
        Err(ChatError::transport("connection refused"))
    }

    async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, ChatError> {
        Err(ChatError::transport("connection refused"))
    }
}

/// Joins `data:` payloads into one SSE body.
pub fn sse(events: &[&str]) -> String {
    events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .collect()
}
