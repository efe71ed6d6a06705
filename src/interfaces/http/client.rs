use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::domain::ports::TokenProvider;
use crate::error::{PaymentError, Result};

/// A fixed token handed in through configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Shared HTTP plumbing for every portal endpoint.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Builds a client with the configured base URL and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base: config.base_url.clone(),
            tokens,
        })
    }

    /// Resolves `segments` under the base URL, percent-encoding each one.
    pub fn endpoint<I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| PaymentError::Config(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request with the JSON content type and bearer token attached.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json");
        match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends `builder`, failing on transport errors and non-2xx statuses.
    pub async fn send(&self, builder: RequestBuilder, failure: &str) -> Result<Response> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(map_status_error(status, failure, &body))
    }

    /// Sends `builder` and decodes a JSON body.
    ///
    /// A 2xx response whose body is not the expected shape is reported as
    /// [`PaymentError::RemoteRejected`].
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        failure: &str,
    ) -> Result<T> {
        let response = self.send(builder, failure).await?;
        let body = response.bytes().await.map_err(map_transport_error)?;
        decode(&body)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        PaymentError::RemoteRejected(format!(
            "unexpected response payload ({e}): {}",
            body_preview(body)
        ))
    })
}

fn map_transport_error(error: reqwest::Error) -> PaymentError {
    if error.is_timeout() {
        PaymentError::network(format!("request timed out: {error}"))
    } else {
        PaymentError::network(error.to_string())
    }
}

fn map_status_error(status: StatusCode, failure: &str, body: &[u8]) -> PaymentError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        failure.to_string()
    } else {
        format!("{failure}: {preview}")
    };
    PaymentError::http_status(status.as_u16(), message)
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
