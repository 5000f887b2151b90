//! Error types for the OVHcloud REST client.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Error envelope returned by the OVHcloud API on non-2xx responses.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ApiErrorBody {
    /// Error class such as `Client::NotFound`.
    #[serde(default)]
    pub class: Option<String>,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

/// Details of a failed API call, rendered with the endpoint and parameters
/// so that diagnostics point at the exact request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiFailure {
    /// HTTP status code.
    pub status: u16,
    /// HTTP method of the failing call.
    pub method: String,
    /// API path of the failing call.
    pub path: String,
    /// JSON request body, when one was sent.
    pub params: Option<String>,
    /// Decoded error envelope.
    pub body: ApiErrorBody,
    /// Value of the `X-Ovh-QueryID` response header.
    pub query_id: Option<String>,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "calling {} {}", self.method, self.path)?;
        if let Some(params) = &self.params {
            write!(f, " with params {params}")?;
        }
        write!(f, ": OVHcloud API error (status code {})", self.status)?;
        if let Some(class) = &self.body.class {
            write!(f, ": {class}")?;
        }
        write!(f, ": {:?}", self.body.message)?;
        if let Some(query_id) = &self.query_id {
            write!(f, " (X-OVH-Query-Id: {query_id})")?;
        }
        Ok(())
    }
}

/// Errors raised by [`super::OvhClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Raised when the configured base URL cannot host API paths.
    #[error("invalid API endpoint {endpoint}: {message}")]
    InvalidEndpoint {
        /// Endpoint that was rejected.
        endpoint: String,
        /// Reason for the rejection.
        message: String,
    },
    /// Raised when the HTTP client cannot be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
    /// The API answered with a non-success status.
    #[error("{0}")]
    Api(Box<ApiFailure>),
    /// The request never produced an HTTP response.
    #[error("transport error calling {method} {path}: {message}")]
    Transport {
        /// HTTP method of the failing call.
        method: String,
        /// API path of the failing call.
        path: String,
        /// Message reported by the HTTP stack.
        message: String,
    },
    /// The request body could not be serialised.
    #[error("failed to encode request for {method} {path}: {message}")]
    Encode {
        /// HTTP method of the failing call.
        method: String,
        /// API path of the failing call.
        path: String,
        /// Serializer message.
        message: String,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode response of {method} {path}: {message}")]
    Decode {
        /// HTTP method of the failing call.
        method: String,
        /// API path of the failing call.
        path: String,
        /// Deserializer message.
        message: String,
    },
}

impl ClientError {
    /// Returns the HTTP status code for API failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(failure) => Some(failure.status),
            _ => None,
        }
    }

    /// Returns true for `404 Not Found`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true when the remote object is busy with another operation.
    ///
    /// OVHcloud answers `403` or `409` while a cluster or service is locked
    /// by a running task. A `409` reporting that the object already exists
    /// is a permanent conflict, not a lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self.status(), Some(403 | 409)) && !self.is_already_exists()
    }

    /// Returns true for a `409` stating that the object already exists.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        let Self::Api(failure) = self else {
            return false;
        };
        if failure.status != 409 {
            return false;
        }
        let class_says_so = failure
            .body
            .class
            .as_deref()
            .is_some_and(|class| class.ends_with("AlreadyExists"));
        class_says_so
            || failure
                .body
                .message
                .to_ascii_lowercase()
                .contains("already exist")
    }

    /// Returns true for failures worth retrying unconditionally: transport
    /// errors, rate limiting, and server-side errors.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Api(failure) => failure.status == 429 || failure.status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn api_error(status: u16) -> ClientError {
        ClientError::Api(Box::new(ApiFailure {
            status,
            method: String::from("POST"),
            path: String::from("/cloud/project/abc/database/postgresql"),
            params: Some(String::from("{\"plan\":\"essential\"}")),
            body: ApiErrorBody {
                class: Some(String::from("Client::BadRequest")),
                message: String::from("Invalid plan"),
            },
            query_id: Some(String::from("EU.ext-1.abc")),
        }))
    }

    #[rstest]
    #[case(404, true, false, false)]
    #[case(403, false, true, false)]
    #[case(409, false, true, false)]
    #[case(429, false, false, true)]
    #[case(503, false, false, true)]
    #[case(400, false, false, false)]
    fn classifies_status_codes(
        #[case] status: u16,
        #[case] not_found: bool,
        #[case] locked: bool,
        #[case] transient: bool,
    ) {
        let err = api_error(status);
        assert_eq!(err.is_not_found(), not_found);
        assert_eq!(err.is_locked(), locked);
        assert_eq!(err.is_transient(), transient);
    }

    #[test]
    fn transport_errors_are_transient() {
        let err = ClientError::Transport {
            method: String::from("GET"),
            path: String::from("/me"),
            message: String::from("connection reset"),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn api_error_display_names_endpoint_and_params() {
        let rendered = api_error(400).to_string();
        assert_eq!(
            rendered,
            "calling POST /cloud/project/abc/database/postgresql with params \
             {\"plan\":\"essential\"}: OVHcloud API error (status code 400): \
             Client::BadRequest: \"Invalid plan\" (X-OVH-Query-Id: EU.ext-1.abc)"
        );
    }
}
