//! The invocation pipeline: sign, dispatch, classify, retry
//!
//! One logical call runs as a sequence of attempts driven by the retry
//! scheduler. Each attempt re-signs with a fresh timestamp, dispatches via
//! the pooled client, and classifies the response by status class. Attempts
//! are strictly sequential within an invocation; independent invocations
//! share only the connection pool.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::http::auth::{Credentials, CredentialsProvider};
use crate::http::config::ClientConfig;
use crate::http::pool::ConnectionPool;
use crate::http::retry::{RetryDecision, RetryPolicy, RetryScheduler};
use crate::http::signer::RequestSigner;
use crate::types::{Request, ResponseOutcome};

/// Turns a raw 2xx response body into a typed result.
///
/// Implementations are payload-format specific (XML, JSON, ...); the
/// pipeline is agnostic to which one is plugged in.
pub trait SuccessHandler<T>: Send + Sync {
    /// Extract the typed result from a successful response
    fn handle(&self, status: u16, body: &[u8]) -> Result<T>;
}

/// Turns a raw non-2xx response body into a typed service failure.
///
/// The returned error should be [`Error::Service`]; the pipeline annotates
/// it with the logical service name.
pub trait FailureHandler: Send + Sync {
    /// Build the service failure for an error response
    fn handle(&self, status: u16, body: &[u8]) -> Error;
}

/// Client executing signed, retried invocations against one endpoint host
pub struct ServiceClient {
    pool: Arc<ConnectionPool>,
    credentials_provider: Arc<dyn CredentialsProvider>,
    retry_policy: RetryPolicy,
    config: ClientConfig,
    endpoint_host: String,
}

impl ServiceClient {
    /// Create a client for an endpoint host.
    ///
    /// Validates the configuration up front; an invalid protocol or zero
    /// timeout is a configuration error here, not at dispatch time.
    pub fn new(
        endpoint_host: impl Into<String>,
        config: ClientConfig,
        credentials_provider: Arc<dyn CredentialsProvider>,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: Arc::new(ConnectionPool::new(config.clone())),
            credentials_provider,
            retry_policy,
            config,
            endpoint_host: endpoint_host.into(),
        })
    }

    /// Share an existing pool instead of creating a private one
    pub fn with_pool(mut self, pool: Arc<ConnectionPool>) -> Self {
        self.pool = pool;
        self
    }

    /// The connection pool backing this client
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Destination host
    pub fn endpoint_host(&self) -> &str {
        &self.endpoint_host
    }

    /// Execute one logical invocation.
    ///
    /// Setup (parameter merge, credential resolution, header overlay) runs
    /// once; signing and dispatch run per attempt. The result is the first
    /// success, or the last failure once the retry scheduler forbids
    /// further attempts. Dropping the returned future cancels the
    /// invocation: a pending backoff sleep or in-flight call is aborted and
    /// no further attempt starts.
    pub async fn invoke<T>(
        &self,
        mut request: Request,
        success_handler: &dyn SuccessHandler<T>,
        failure_handler: &dyn FailureHandler,
    ) -> Result<T> {
        // Private parameters overwrite request parameters.
        for (name, value) in &request.original.private_parameters {
            request.parameters.insert(name.clone(), value.clone());
        }
        for (name, value) in &request.original.custom_headers {
            request.headers.insert(name.clone(), value.clone());
        }

        let credentials = match &request.original.credentials {
            Some(credentials) => credentials.clone(),
            None => self.credentials_provider.credentials()?,
        };

        let signer = RequestSigner::new(&self.endpoint_host, &request.service_name);
        let mut scheduler = RetryScheduler::new(self.retry_policy.clone());

        loop {
            log::debug!(
                "{} attempt {} to {}",
                request.service_name,
                scheduler.attempts() + 1,
                self.endpoint_host
            );
            let outcome = self
                .attempt(&request, &credentials, &signer, success_handler, failure_handler)
                .await;

            let failure = match outcome {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            match scheduler.register_failure(&request, failure) {
                RetryDecision::Retry { delay } => {
                    log::warn!(
                        "{} attempt {} failed, retrying after {:?}",
                        request.service_name,
                        scheduler.attempts(),
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                RetryDecision::Exhausted(error) => {
                    log::error!(
                        "{} failed after {} attempt(s): {}",
                        request.service_name,
                        scheduler.attempts(),
                        error
                    );
                    return Err(error);
                }
            }
        }
    }

    /// Run a single attempt: sign with a fresh timestamp, dispatch, and
    /// classify the response.
    async fn attempt<T>(
        &self,
        request: &Request,
        credentials: &Credentials,
        signer: &RequestSigner,
        success_handler: &dyn SuccessHandler<T>,
        failure_handler: &dyn FailureHandler,
    ) -> Result<T> {
        let signed = signer.sign(request, credentials, Utc::now())?;

        let client = self.pool.get(self.config.protocol, &self.endpoint_host)?;
        let url = format!(
            "{}://{}{}",
            self.config.protocol.scheme(),
            self.endpoint_host,
            signed.path_and_query
        );

        let mut builder = client.request(request.method.clone(), url);
        builder = builder.header("authorization", &signed.authorization);
        for (name, value) in &signed.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(Error::from)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Error::from)?;

        match ResponseOutcome::classify(status, body.to_vec()) {
            ResponseOutcome::Success { status, body } => success_handler.handle(status, &body),
            ResponseOutcome::ServiceFailure { status, body } => Err(failure_handler
                .handle(status, &body)
                .with_service_name(&request.service_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::auth::StaticProvider;
    use crate::types::Protocol;

    #[test]
    fn test_client_creation() {
        let provider = Arc::new(StaticProvider::new("AKID", "secret"));
        let client = ServiceClient::new(
            "ec2.us-east-1.amazonaws.com",
            ClientConfig::default(),
            provider,
            RetryPolicy::default(),
        )
        .unwrap();

        assert_eq!(client.endpoint_host(), "ec2.us-east-1.amazonaws.com");
        assert!(client.pool().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let provider = Arc::new(StaticProvider::new("AKID", "secret"));
        let config = ClientConfig::default().with_max_connections(0);
        let result = ServiceClient::new(
            "ec2.us-east-1.amazonaws.com",
            config,
            provider,
            RetryPolicy::default(),
        );
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_shared_pool() {
        let pool = Arc::new(ConnectionPool::new(
            ClientConfig::default().with_protocol(Protocol::Http),
        ));
        let provider = Arc::new(StaticProvider::new("AKID", "secret"));
        let client = ServiceClient::new(
            "localhost:8080",
            ClientConfig::default().with_protocol(Protocol::Http),
            provider,
            RetryPolicy::default(),
        )
        .unwrap()
        .with_pool(Arc::clone(&pool));

        assert!(Arc::ptr_eq(client.pool(), &pool));
    }
}
