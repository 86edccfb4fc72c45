use std::{
    future::Future,
    pin::Pin,
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::Client as ReqwestClient;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use sonic_rs::from_slice;
use thiserror::Error;

pub use reqwest::Method;

pub type RestBytes = Bytes;
pub type RestFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
pub type RestResult<T> = Result<T, RestError>;

/// Every request carries a timeout; the probe never waits longer than this
/// unless the caller overrides it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Coarse transport state observable through the mock adapter's snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestTransportState {
    Idle,
    Busy,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestErrorKind {
    Connect,
    Send,
    Receive,
    Timeout,
    Rejected,
    Parse,
    Internal,
}

/// Transport-level failure. `retryable` is advisory only; nothing in this
/// crate retries.
#[derive(Clone, Debug, Error)]
#[error("rest error {kind:?} status={status:?} retryable={retryable} {message}")]
pub struct RestError {
    kind: RestErrorKind,
    status: Option<u16>,
    message: String,
    retryable: bool,
}

impl RestError {
    pub fn new(
        kind: RestErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            retryable,
        }
    }

    pub fn connect(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Connect, status, message, retryable)
    }

    pub fn send(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Send, status, message, retryable)
    }

    pub fn receive(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Receive, status, message, retryable)
    }

    pub fn timeout(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Timeout, status, message, retryable)
    }

    pub fn rejected(status: u16, message: impl Into<String>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Rejected, Some(status), message, retryable)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RestErrorKind::Internal, None, message, false)
    }

    fn from_reqwest(kind: RestErrorKind, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            RestErrorKind::Timeout
        } else if err.is_connect() {
            RestErrorKind::Connect
        } else {
            kind
        };
        let status = err.status().map(|s| s.as_u16());
        let retryable = err.is_timeout() || err.is_connect() || err.is_request();
        Self::new(kind, status, err.to_string(), retryable)
    }

    pub fn kind(&self) -> RestErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<sonic_rs::Error> for RestError {
    fn from(err: sonic_rs::Error) -> Self {
        Self::new(RestErrorKind::Parse, None, err.to_string(), false)
    }
}

#[derive(Clone, Debug)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, RestBytes)>,
    pub body: Option<RestBytes>,
    pub timeout: Duration,
}

impl RestRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<RestBytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<RestBytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// First header value for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_ref())
    }
}

#[derive(Clone, Debug)]
pub struct RestResponse {
    pub status: u16,
    pub headers: Vec<(String, RestBytes)>,
    pub body: RestBytes,
    pub elapsed: Duration,
}

impl RestResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> RestResult<T> {
        from_slice(&self.body).map_err(RestError::from)
    }
}

pub trait RestTransport: Send + Sync {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>>;
}

pub type SharedRestTransport = dyn RestTransport + Send + Sync;

/// Facade over a transport. Production callers use `Client::new`; tests swap
/// in `MockRestAdapter` through `with_transport`.
#[derive(Clone)]
pub struct Client {
    transport: std::sync::Arc<SharedRestTransport>,
}

impl Client {
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    pub fn with_transport<T>(transport: T) -> Self
    where
        T: RestTransport + 'static,
    {
        Self {
            transport: std::sync::Arc::new(transport),
        }
    }

    pub async fn execute(&self, request: RestRequest) -> RestResult<RestResponse> {
        self.transport.execute(request).await
    }

    pub async fn execute_json<T>(&self, request: RestRequest) -> RestResult<T>
    where
        T: DeserializeOwned,
    {
        self.execute(request).await?.json::<T>()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: ReqwestClient::new(),
        }
    }

    pub fn with_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTransport for ReqwestTransport {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let client = self.client.clone();
        Box::pin(async move {
            let start = Instant::now();
            let mut req = client
                .request(request.method.clone(), &request.url)
                .timeout(request.timeout);

            for (key, value) in request.headers {
                let value = HeaderValue::from_bytes(value.as_ref())
                    .map_err(|err| RestError::internal(err.to_string()))?;
                req = req.header(key, value);
            }

            if let Some(body) = request.body {
                req = req.body(body);
            }

            let resp = req
                .send()
                .await
                .map_err(|err| RestError::from_reqwest(RestErrorKind::Send, err))?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(name, value)| (name.to_string(), Bytes::copy_from_slice(value.as_ref())))
                .collect();
            let body = resp
                .bytes()
                .await
                .map_err(|err| RestError::from_reqwest(RestErrorKind::Receive, err))?;
            let elapsed = start.elapsed();

            Ok(RestResponse {
                status,
                headers,
                body,
                elapsed,
            })
        })
    }
}
