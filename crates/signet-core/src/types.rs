//! Core data types for signed API invocations
//!
//! Defines the outbound request model, its immutable original-request
//! descriptor, the wire protocol selector, and response classification.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::http::auth::Credentials;

/// Wire protocol for the destination endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Plaintext HTTP (port 80)
    Http,
    /// TLS-secured HTTPS (port 443)
    Https,
}

impl Protocol {
    /// URL scheme for this protocol
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    /// Default port for this protocol
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(Error::Configuration {
                message: format!("unknown protocol: {other}"),
            }),
        }
    }
}

/// Immutable descriptor of the caller's original request.
///
/// Carries the parameters and headers the caller attached before the
/// pipeline took over, plus an optional request-level credentials override.
/// Merged into the outbound [`Request`] once per invocation, never per
/// attempt.
#[derive(Debug, Clone, Default)]
pub struct OriginalRequest {
    /// Private parameters merged into the request's parameter set
    pub private_parameters: BTreeMap<String, String>,
    /// Custom headers overlaid onto the request's header set
    pub custom_headers: BTreeMap<String, String>,
    /// Request-level credentials; takes precedence over the provider
    pub credentials: Option<Credentials>,
}

impl OriginalRequest {
    /// Create an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a private parameter
    pub fn with_private_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.private_parameters.insert(name.into(), value.into());
        self
    }

    /// Add a custom header
    pub fn with_custom_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    /// Set request-level credentials overriding the provider
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// An outbound API request prior to signing.
///
/// Parameters live in a `BTreeMap` so the canonical query string is always
/// produced in lexicographic parameter-name order; the signer itself never
/// reorders anything.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Resource path; empty means "/"
    pub resource_path: String,
    /// Query parameters in lexicographic name order
    pub parameters: BTreeMap<String, String>,
    /// Caller-supplied headers, overlaid onto the signed header set
    pub headers: BTreeMap<String, String>,
    /// Optional request body
    pub body: Option<Vec<u8>>,
    /// Logical service name, e.g. "AmazonEC2"
    pub service_name: String,
    /// Immutable original-request descriptor
    pub original: OriginalRequest,
}

impl Request {
    /// Create a new request for a service
    pub fn new(
        method: Method,
        resource_path: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            method,
            resource_path: resource_path.into(),
            parameters: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            service_name: service_name.into(),
            original: OriginalRequest::default(),
        }
    }

    /// Add a query parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach the original-request descriptor
    pub fn with_original(mut self, original: OriginalRequest) -> Self {
        self.original = original;
        self
    }
}

/// Classification of a raw HTTP response by status class.
///
/// 2xx is a success; everything else is a service failure. Handlers turn
/// the captured body into a typed result or a typed service error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// 2xx response
    Success { status: u16, body: Vec<u8> },
    /// Any non-2xx response
    ServiceFailure { status: u16, body: Vec<u8> },
}

impl ResponseOutcome {
    /// Classify a response solely by its status code class
    pub fn classify(status: u16, body: Vec<u8>) -> Self {
        if (200..300).contains(&status) {
            ResponseOutcome::Success { status, body }
        } else {
            ResponseOutcome::ServiceFailure { status, body }
        }
    }

    /// HTTP status code of this outcome
    pub fn status(&self) -> u16 {
        match self {
            ResponseOutcome::Success { status, .. } => *status,
            ResponseOutcome::ServiceFailure { status, .. } => *status,
        }
    }
}
