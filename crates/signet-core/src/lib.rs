//! Signet Core - signed asynchronous API invocation
//!
//! This crate executes signed HTTP requests against a remote API with
//! automatic retry/backoff and per-destination connection reuse.
//!
//! # Main Components
//!
//! - **Error Handling**: closed failure taxonomy using `thiserror`
//! - **Request Signing**: SigV4-style canonical-request/HMAC chain
//! - **Retry Scheduling**: attempt budget with pluggable backoff/condition
//! - **Connection Pooling**: one reusable client per (protocol, host)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use signet_core::Result;
//! use signet_core::http::{ClientConfig, RetryPolicy, ServiceClient, StaticProvider};
//!
//! fn example() -> Result<()> {
//!     let provider = Arc::new(StaticProvider::new("AKIDEXAMPLE", "secret"));
//!     let _client = ServiceClient::new(
//!         "ec2.us-east-1.amazonaws.com",
//!         ClientConfig::default(),
//!         provider,
//!         RetryPolicy::default(),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;
pub mod types;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use http::{
    ClientConfig, ConnectionPool, Credentials, CredentialsProvider, FailureHandler,
    RequestSigner, RetryPolicy, RetryScheduler, ServiceClient, SuccessHandler,
};
pub use types::{OriginalRequest, Protocol, Request, ResponseOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::Configuration {
            message: "test error".to_string(),
        };
        assert!(err.to_string().contains("test error"));
    }
}
