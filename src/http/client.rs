use crate::config::ServiceConfig;
use crate::errors::{MsgenError, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, Span};

/// Per-attempt timeout for every request
pub const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(20);

/// Header carrying the Microsoft Genomics access key
pub const ACCESS_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

pub fn user_agent() -> String {
    format!("msgenctl/{}", env!("CARGO_PKG_VERSION"))
}

/// HTTP client for the Microsoft Genomics REST API.
///
/// Every request carries the JSON content type, the msgenctl user agent and
/// the subscription key. Transient failures are retried inside a single call
/// according to the configured [`RetryConfig`](crate::http::RetryConfig).
/// Only HTTP 200 counts as success; any other status is turned into
/// [`MsgenError::UnexpectedResponse`] carrying a dump of the response.
#[derive(Clone)]
pub struct ServiceClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    span: Span,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers(&config.access_key)?)
            .build()?;

        let http_client = ClientBuilder::new(http_client)
            .with(config.retry.middleware())
            .build();

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            span: Span::current(),
        })
    }

    /// Emit this client's events under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        self.send(Method::GET, endpoint, None).await
    }

    pub async fn post<T>(&self, endpoint: &str, data: &T) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(data).map_err(MsgenError::Encode)?;

        debug!(
            parent: &self.span,
            payload = %String::from_utf8_lossy(&payload),
            "POST request payload"
        );

        self.send(Method::POST, endpoint, Some(payload)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Response> {
        self.send(Method::DELETE, endpoint, None).await
    }

    pub async fn get_json<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R> {
        let response = self.get(endpoint).await?;
        decode_json(response, endpoint).await
    }

    pub async fn post_json<T, R>(&self, endpoint: &str, data: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.post(endpoint, data).await?;
        decode_json(response, endpoint).await
    }

    pub async fn delete_json<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R> {
        let response = self.delete(endpoint).await?;
        decode_json(response, endpoint).await
    }

    async fn send(&self, method: Method, endpoint: &str, body: Option<Vec<u8>>) -> Result<Response> {
        let url = self.build_url(endpoint);

        info!(parent: &self.span, method = %method, url = %url, "request");

        let mut request = self.http_client.request(method, &url);

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let status_line = format!("{:?} {}", response.version(), status);

        if status == StatusCode::OK {
            info!(parent: &self.span, url = %url, "{status_line}");
            Ok(response)
        } else {
            error!(parent: &self.span, url = %url, "{status_line}");
            Err(MsgenError::UnexpectedResponse {
                status,
                response: dump_response(response).await,
            })
        }
    }
}

fn default_headers(access_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let user_agent = HeaderValue::from_str(&user_agent()).map_err(|e| MsgenError::InvalidSetting {
        key: "user_agent".to_string(),
        reason: e.to_string(),
    })?;
    headers.insert(USER_AGENT, user_agent);

    let mut access_key = HeaderValue::from_str(access_key).map_err(|e| MsgenError::InvalidSetting {
        key: "service.access_key".to_string(),
        reason: e.to_string(),
    })?;
    access_key.set_sensitive(true);
    headers.insert(ACCESS_KEY_HEADER, access_key);

    Ok(headers)
}

/// Render status line, headers and body for diagnostics.
///
/// Consumes the response so the connection is released here.
async fn dump_response(response: Response) -> String {
    let mut dump = format!("{:?} {}\r\n", response.version(), response.status());

    for (name, value) in response.headers() {
        dump.push_str(&format!(
            "{}: {}\r\n",
            name,
            value.to_str().unwrap_or("<non-ascii>")
        ));
    }

    dump.push_str("\r\n");

    match response.text().await {
        Ok(body) => dump.push_str(&body),
        Err(e) => dump.push_str(&format!("<failed to read body: {e}>")),
    }

    dump
}

/// Read the whole body and decode it as JSON
pub async fn decode_json<R: DeserializeOwned>(response: Response, endpoint: &str) -> Result<R> {
    let body = response.bytes().await?;

    serde_json::from_slice(&body).map_err(|source| MsgenError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}
