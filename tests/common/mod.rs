#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kotoba_session::error::LLMError;
use kotoba_session::http::{HttpRequest, HttpResponse, HttpTransport};

pub const OPENAI_ANSWER: &str = "pong from openai";
pub const CLAUDE_ANSWER: &str = "pong from claude";
pub const GEMINI_ANSWER: &str = "pong from gemini";

/// In-memory transport that records every request and answers by endpoint.
///
/// Responses pushed with [`RecordingTransport::push_response`] are served first, in
/// order; after that each vendor endpoint gets a canned success body.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    queued: Mutex<VecDeque<HttpResponse>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_response(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        self.queued.lock().unwrap().push_back(HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> serde_json::Value {
        self.requests()
            .last()
            .and_then(HttpRequest::json_body)
            .expect("at least one JSON request")
    }

    fn canned(url: &str) -> HttpResponse {
        let body = if url.ends_with("/chat/completions") {
            format!(
                r#"{{"model":"gpt-4","choices":[{{"index":0,"message":{{"role":"assistant","content":"{OPENAI_ANSWER}"}},"finish_reason":"stop"}}],"usage":{{"prompt_tokens":10,"completion_tokens":3,"total_tokens":13}}}}"#
            )
        } else if url.ends_with("/messages") {
            format!(
                r#"{{"model":"claude-3-opus-20240229","content":[{{"type":"text","text":"{CLAUDE_ANSWER}"}}],"stop_reason":"end_turn","usage":{{"input_tokens":10,"output_tokens":3}}}}"#
            )
        } else if url.ends_with(":generateContent") {
            format!(
                r#"{{"candidates":[{{"content":{{"role":"model","parts":[{{"text":"{GEMINI_ANSWER}"}}]}},"finishReason":"STOP"}}]}}"#
            )
        } else {
            return HttpResponse {
                status: 404,
                headers: HashMap::new(),
                body: b"unknown endpoint".to_vec(),
            };
        };
        HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: body.into_bytes(),
        }
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        if let Some(response) = self.queued.lock().unwrap().pop_front() {
            return Ok(response);
        }
        Ok(Self::canned(&url))
    }
}
