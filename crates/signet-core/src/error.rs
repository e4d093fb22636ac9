//! Error types for the Signet core library
//!
//! Defines the closed failure taxonomy for signed API invocations, using
//! thiserror for ergonomic error definitions and anyhow for flexible
//! error sources.

use thiserror::Error;

/// Main error type for Signet operations
#[derive(Error, Debug)]
pub enum Error {
    /// Connection, read, or timeout failure from the underlying network layer
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Non-2xx response from the remote service, built by a FailureHandler
    #[error("Service error: {service} returned status {status}: {message}")]
    Service {
        /// Logical service name, annotated by the invocation pipeline
        service: String,
        status: u16,
        /// Service-specific error code, if the failure handler extracted one
        code: Option<String>,
        message: String,
    },

    /// Signing, encoding, or handler error, or any unrecognized lower-level
    /// failure wrapped for uniformity
    #[error("Client error: {message}")]
    Client {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Invalid client or pool configuration, detected at construction time
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The retry budget is spent; carries the last captured failure
    #[error("Retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Check if this is a service failure (non-2xx response)
    pub fn is_service(&self) -> bool {
        matches!(self, Error::Service { .. })
    }

    /// HTTP status code, if this failure carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Service { status, .. } => Some(*status),
            Error::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Annotate a service failure with the logical service name.
    ///
    /// Failure handlers are payload-format specific and do not know which
    /// service they are parsing for; the pipeline always stamps the name on,
    /// replacing anything the handler may have put there.
    pub fn with_service_name(self, name: &str) -> Self {
        match self {
            Error::Service {
                status,
                code,
                message,
                ..
            } => Error::Service {
                service: name.to_string(),
                status,
                code,
                message,
            },
            other => other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            Error::Transport {
                message: err.to_string(),
                source: Some(anyhow::Error::new(err)),
            }
        } else {
            Error::Client {
                message: err.to_string(),
                source: Some(anyhow::Error::new(err)),
            }
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Client {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
