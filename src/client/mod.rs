//! Signed HTTP client for the OVHcloud REST API.
//!
//! The client is deliberately thin: it signs requests, routes API v1 and v2
//! paths, and turns non-success responses into [`ClientError::Api`] values
//! that carry the failing endpoint and parameters. Resource handlers build
//! on the generic `get`/`post`/`put`/`delete` helpers.

mod error;
mod signature;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::OvhConfig;
use signature::{SignatureInput, sign};

pub use error::{ApiErrorBody, ApiFailure, ClientError};

const API_V1_SUFFIX: &str = "/1.0";
const API_V2_PREFIX: &str = "/v2/";
const AUTH_TIME_PATH: &str = "/auth/time";
const QUERY_ID_HEADER: &str = "X-Ovh-QueryID";

/// Credentials of an OVHcloud API application.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Credentials {
    /// Application key (`X-Ovh-Application`).
    pub application_key: String,
    /// Application secret used to sign requests.
    pub application_secret: String,
    /// Consumer key (`X-Ovh-Consumer`). Requests are sent unsigned when empty.
    pub consumer_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("application_key", &self.application_key)
            .field("application_secret", &"<redacted>")
            .field("consumer_key", &"<redacted>")
            .finish()
    }
}

/// Percent-encodes a single path segment taken from user data.
#[must_use]
pub fn escape(segment: &str) -> Cow<'_, str> {
    urlencoding::encode(segment)
}

/// Authenticated OVHcloud API client shared by every resource handler.
///
/// Cloning is cheap: the underlying connection pool and the cached server
/// clock delta are shared between clones.
#[derive(Clone, Debug)]
pub struct OvhClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    time_delta: Arc<OnceCell<i64>>,
}

impl OvhClient {
    /// Builds a client for `base_url` (for example
    /// `https://eu.api.ovh.com/1.0`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidEndpoint`] when the URL cannot be a
    /// base, and [`ClientError::Build`] when the HTTP stack fails to
    /// initialise.
    pub fn new(
        base_url: &Url,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidEndpoint {
                endpoint: base_url.to_string(),
                message: String::from("URL cannot be used as an API base"),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
            credentials,
            time_delta: Arc::new(OnceCell::new()),
        })
    }

    /// Builds a client from validated provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidEndpoint`] when the endpoint cannot be
    /// resolved, or any error from [`Self::new`].
    pub fn from_config(config: &OvhConfig) -> Result<Self, ClientError> {
        let base_url = config
            .base_url()
            .map_err(|err| ClientError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                message: err.to_string(),
            })?;
        let credentials = Credentials {
            application_key: config.application_key.clone(),
            application_secret: config.application_secret.clone(),
            consumer_key: config.consumer_key.clone(),
        };
        Self::new(&base_url, credentials, config.request_timeout())
    }

    /// Seeds the server clock delta instead of querying `/auth/time`.
    #[must_use]
    pub fn with_time_delta(mut self, delta: i64) -> Self {
        self.time_delta = Arc::new(OnceCell::from(delta));
        self
    }

    /// Returns the API v1 base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves an API path to an absolute URL. Paths under `/v2/` are
    /// routed to the API v2 root.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with(API_V2_PREFIX) {
            let root = self
                .base_url
                .strip_suffix(API_V1_SUFFIX)
                .unwrap_or(&self.base_url);
            return format!("{root}{path}");
        }
        format!("{}{path}", self.base_url)
    }

    /// Issues a `GET` and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decoding failures.
    pub async fn get<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let body = self.send(Method::GET, path, None).await?;
        decode(&Method::GET, path, &body)
    }

    /// Issues a `POST` with a JSON body and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on encoding, transport, API, or decoding
    /// failures.
    pub async fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let encoded = encode(&Method::POST, path, payload)?;
        let body = self.send(Method::POST, path, Some(encoded)).await?;
        decode(&Method::POST, path, &body)
    }

    /// Issues a `POST` and ignores the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on encoding, transport, or API failures.
    pub async fn post_unit<B>(&self, path: &str, payload: &B) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let encoded = encode(&Method::POST, path, payload)?;
        self.send(Method::POST, path, Some(encoded)).await?;
        Ok(())
    }

    /// Issues a `PUT` with a JSON body and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on encoding, transport, API, or decoding
    /// failures.
    pub async fn put<B, T>(&self, path: &str, payload: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let encoded = encode(&Method::PUT, path, payload)?;
        let body = self.send(Method::PUT, path, Some(encoded)).await?;
        decode(&Method::PUT, path, &body)
    }

    /// Issues a `PUT` and ignores the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on encoding, transport, or API failures.
    pub async fn put_unit<B>(&self, path: &str, payload: &B) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let encoded = encode(&Method::PUT, path, payload)?;
        self.send(Method::PUT, path, Some(encoded)).await?;
        Ok(())
    }

    /// Issues a `DELETE` and decodes the JSON response (typically a task).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decoding failures.
    pub async fn delete<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let body = self.send(Method::DELETE, path, None).await?;
        decode(&Method::DELETE, path, &body)
    }

    /// Issues a `DELETE` and ignores the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or API failures.
    pub async fn delete_unit(&self, path: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<String>,
    ) -> Result<String, ClientError> {
        let url = self.url_for(path);
        debug!(method = %method, path, "calling OVHcloud API");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("Accept", "application/json")
            .header("X-Ovh-Application", &self.credentials.application_key);

        if !self.credentials.consumer_key.is_empty() {
            let timestamp = self.timestamp().await?;
            let signature = sign(&SignatureInput {
                application_secret: &self.credentials.application_secret,
                consumer_key: &self.credentials.consumer_key,
                method: method.as_str(),
                url: &url,
                body: payload.as_deref().unwrap_or(""),
                timestamp,
            });
            request = request
                .header("X-Ovh-Consumer", &self.credentials.consumer_key)
                .header("X-Ovh-Timestamp", timestamp.to_string())
                .header("X-Ovh-Signature", signature);
        }

        if let Some(encoded) = payload.as_ref() {
            request = request
                .header("Content-Type", "application/json")
                .body(encoded.clone());
        }

        execute(request, &method, path, payload).await
    }

    async fn timestamp(&self) -> Result<i64, ClientError> {
        let delta = self
            .time_delta
            .get_or_try_init(|| self.fetch_time_delta())
            .await?;
        Ok(unix_now().saturating_add(*delta))
    }

    async fn fetch_time_delta(&self) -> Result<i64, ClientError> {
        let request = self.http.get(self.url_for(AUTH_TIME_PATH));
        let body = execute(request, &Method::GET, AUTH_TIME_PATH, None).await?;
        let server_time =
            body.trim()
                .parse::<i64>()
                .map_err(|err| ClientError::Decode {
                    method: Method::GET.to_string(),
                    path: AUTH_TIME_PATH.to_owned(),
                    message: err.to_string(),
                })?;
        let delta = server_time.saturating_sub(unix_now());
        debug!(delta, "computed OVHcloud clock delta");
        Ok(delta)
    }
}

async fn execute(
    request: RequestBuilder,
    method: &Method,
    path: &str,
    params: Option<String>,
) -> Result<String, ClientError> {
    let transport = |err: reqwest::Error| ClientError::Transport {
        method: method.to_string(),
        path: path.to_owned(),
        message: err.to_string(),
    };

    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    let query_id = response
        .headers()
        .get(QUERY_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let text = response.text().await.map_err(transport)?;

    if status.is_success() {
        return Ok(text);
    }

    let body = serde_json::from_str::<ApiErrorBody>(&text).unwrap_or_else(|_| ApiErrorBody {
        class: None,
        message: text.clone(),
    });
    Err(ClientError::Api(Box::new(ApiFailure {
        status: status.as_u16(),
        method: method.to_string(),
        path: path.to_owned(),
        params,
        body,
        query_id,
    })))
}

fn encode<B>(method: &Method, path: &str, payload: &B) -> Result<String, ClientError>
where
    B: Serialize + ?Sized,
{
    serde_json::to_string(payload).map_err(|err| ClientError::Encode {
        method: method.to_string(),
        path: path.to_owned(),
        message: err.to_string(),
    })
}

fn decode<T>(method: &Method, path: &str, body: &str) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).map_err(|err| ClientError::Decode {
        method: method.to_string(),
        path: path.to_owned(),
        message: err.to_string(),
    })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

#[cfg(test)]
mod tests;
