//! Client configuration for pooled HTTP clients
//!
//! Carried into client creation by the connection pool: protocol, timeouts,
//! connection limits, idle expiry, and certificate validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Protocol;

/// Configuration applied to every pooled client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Wire protocol for the destination
    pub protocol: Protocol,
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Time allowed between response body chunks
    pub read_timeout: Duration,
    /// Maximum idle connections kept per host
    pub max_connections: usize,
    /// Idle connections older than this are dropped
    pub idle_connection_timeout: Duration,
    /// Whether to validate TLS certificates. Defaults to true; disabling it
    /// is an explicit opt-out for test endpoints only.
    pub validate_certificates: bool,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Https,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_connections: 50,
            idle_connection_timeout: Duration::from_secs(60),
            validate_certificates: true,
            user_agent: format!("signet-core/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Set the wire protocol
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the per-host connection limit
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the idle-connection expiry
    pub fn with_idle_connection_timeout(mut self, timeout: Duration) -> Self {
        self.idle_connection_timeout = timeout;
        self
    }

    /// Opt out of TLS certificate validation (test endpoints only)
    pub fn with_certificate_validation(mut self, validate: bool) -> Self {
        self.validate_certificates = validate;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::Configuration {
                message: "connect timeout cannot be zero".to_string(),
            });
        }
        if self.read_timeout.is_zero() {
            return Err(Error::Configuration {
                message: "read timeout cannot be zero".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(Error::Configuration {
                message: "max connections cannot be zero".to_string(),
            });
        }
        Ok(())
    }
}
