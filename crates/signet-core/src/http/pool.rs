//! Connection pool caching one reusable client per (protocol, host)
//!
//! Pooled clients are created lazily on first use of a key and live for the
//! process's lifetime; there is no eviction or teardown. Creation happens
//! under the map lock, so concurrent first requests for the same key
//! observe exactly one client creation. Lookups afterwards clone the cached
//! client, which shares its internal connection state.

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::redirect;
use reqwest::Client;

use crate::error::{Error, Result};
use crate::http::config::ClientConfig;
use crate::types::Protocol;

/// Cache key: one client per (protocol, host) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub protocol: Protocol,
    pub host: String,
}

/// Process-wide cache of pooled HTTP clients
#[derive(Debug)]
pub struct ConnectionPool {
    config: ClientConfig,
    clients: Mutex<HashMap<PoolKey, Client>>,
}

impl ConnectionPool {
    /// Create a pool applying the given configuration to every client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the client for a (protocol, host) key.
    ///
    /// Guarded insert-if-absent: the client for a key is created exactly
    /// once and all callers receive handles to the same instance.
    pub fn get(&self, protocol: Protocol, host: &str) -> Result<Client> {
        let key = PoolKey {
            protocol,
            host: host.to_string(),
        };

        let mut clients = self.clients.lock().map_err(|_| Error::Client {
            message: "connection pool lock poisoned".to_string(),
            source: None,
        })?;

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = self.build_client(protocol)?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Number of distinct pooled clients created so far
    pub fn len(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether no client has been created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build_client(&self, protocol: Protocol) -> Result<Client> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::limited(10))
            .connect_timeout(self.config.connect_timeout)
            .read_timeout(self.config.read_timeout)
            .pool_max_idle_per_host(self.config.max_connections)
            .pool_idle_timeout(self.config.idle_connection_timeout)
            .gzip(true)
            .user_agent(&self.config.user_agent);

        if protocol == Protocol::Https && !self.config.validate_certificates {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(|e| Error::Configuration {
            message: format!("failed to build pooled client: {e}"),
        })
    }
}
