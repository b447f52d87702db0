use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::LLMError;

use super::{DynHttpTransport, HttpRequest, HttpResponse, HttpTransport};

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Transport with reqwest's default client settings.
    pub fn default_client() -> Result<Self, LLMError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| LLMError::transport(format!("failed to create reqwest client: {err}")))
    }

    fn header_map(headers: HashMap<String, String>) -> Result<HeaderMap, LLMError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| LLMError::transport(format!("invalid header name {name}: {err}")))?;
            // Values carry API keys, so they never appear in the error text.
            let value = HeaderValue::from_str(&value)
                .map_err(|err| LLMError::transport(format!("invalid value for header {name}: {err}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    fn plain_headers(headers: &HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let HttpRequest { url, headers, body } = request;
        let response = self
            .client
            .post(&url)
            .headers(Self::header_map(headers)?)
            .body(body)
            .send()
            .await
            .map_err(|err| LLMError::transport(format!("POST {url} failed: {err}")))?;

        let status = response.status().as_u16();
        let headers = Self::plain_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| LLMError::transport(format!("reading response from {url} failed: {err}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Shareable reqwest transport with default settings.
pub fn default_dyn_transport() -> Result<DynHttpTransport, LLMError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}
