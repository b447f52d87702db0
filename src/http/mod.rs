//! Transport seam between provider adapters and the network.
//!
//! Every vendor call in this crate is a JSON POST that waits for the complete body, so
//! the abstraction is exactly that and nothing more. Tests swap in an in-memory
//! [`HttpTransport`]; production uses [`reqwest::ReqwestTransport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::LLMError;

pub mod reqwest;

/// Outgoing JSON POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Request with `Content-Type: application/json` and no other headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_session::http::HttpRequest;
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.header("content-type"), Some("application/json"));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
        }
    }

    /// Merges `headers` over the current ones.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Parses the body back into JSON; mostly useful for transport doubles.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Numeric `Retry-After` in seconds. HTTP-date values are ignored because vendors
    /// send the numeric form.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Body text of a 2xx response.
    ///
    /// Any other status is handed to `classify` together with the body text and the
    /// `Retry-After` hint, so each vendor can map its own error envelope.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Transport`] for a non-UTF-8 body, otherwise whatever
    /// `classify` produces.
    pub fn into_success_text<F>(self, classify: F) -> Result<String, LLMError>
    where
        F: FnOnce(u16, &str, Option<Duration>) -> LLMError,
    {
        let retry_after = self.retry_after();
        let status = self.status;
        let success = self.is_success();
        let text = String::from_utf8(self.body).map_err(|err| LLMError::transport(err.to_string()))?;
        if success {
            Ok(text)
        } else {
            Err(classify(status, &text, retry_after))
        }
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Sends a request and resolves once the whole response body has arrived.
///
/// # Examples
///
/// ```
/// # use async_trait::async_trait;
/// # use kotoba_session::http::{HttpTransport, HttpRequest, HttpResponse};
/// # use kotoba_session::error::LLMError;
/// struct Echo;
///
/// #[async_trait]
/// impl HttpTransport for Echo {
///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
///         Ok(HttpResponse { status: 200, headers: request.headers, body: request.body })
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let response = Echo
///     .send(HttpRequest::post_json("https://example.com", br#"{"a":1}"#.to_vec()))
///     .await
///     .unwrap();
/// assert_eq!(response.into_success_text(|_, _, _| unreachable!()).unwrap(), r#"{"a":1}"#);
/// # });
/// ```
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Network failures map to [`LLMError::Transport`]; non-2xx statuses are not errors
    /// at this level.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Serializes `body` and posts it with `headers`.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] if serialization fails, before anything is sent.
pub async fn post_json_with_headers<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
) -> Result<HttpResponse, LLMError> {
    let payload = serde_json::to_vec(body).map_err(|err| LLMError::Validation {
        message: format!("failed to serialize request: {err}"),
    })?;
    let request = HttpRequest::post_json(url, payload).with_headers(headers);
    transport.send(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser;

    struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
            panic!("send should not be called");
        }
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            Err(ser::Error::custom("refused"))
        }
    }

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn serialization_failure_never_reaches_the_wire() {
        let result = post_json_with_headers(
            &PanicTransport,
            "http://example.com",
            HashMap::new(),
            &Unserializable,
        )
        .await;

        match result {
            Err(LLMError::Validation { message }) => assert!(message.contains("refused")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn extra_headers_are_merged_over_content_type() {
        let request = HttpRequest::post_json("http://example.com", Vec::new()).with_headers(
            HashMap::from([("x-api-key".to_string(), "k".to_string())]),
        );
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("X-API-KEY"), Some("k"));
    }

    #[test]
    fn retry_after_accepts_seconds_only() {
        let seconds = response(429, &[("Retry-After", " 7 ")], "");
        assert_eq!(seconds.retry_after(), Some(Duration::from_secs(7)));

        let date = response(429, &[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")], "");
        assert_eq!(date.retry_after(), None);
    }

    #[test]
    fn error_statuses_are_classified_with_body_and_hint() {
        let text = response(200, &[], "ok")
            .into_success_text(|_, _, _| LLMError::transport("unused"))
            .expect("success");
        assert_eq!(text, "ok");

        let err = response(503, &[("retry-after", "2")], "busy")
            .into_success_text(|status, body, retry_after| {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
                LLMError::provider("test", body)
            })
            .expect_err("503");
        assert!(matches!(err, LLMError::Provider { .. }));
    }
}
