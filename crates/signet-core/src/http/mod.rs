//! Signed HTTP invocation pipeline
//!
//! This module provides the invocation core:
//! - SigV4-style request signing (canonical request + HMAC-SHA256 chain)
//! - Retry scheduling with caller-supplied backoff and condition
//! - A connection pool caching one reusable client per (protocol, host)
//! - The pipeline that signs each attempt, dispatches it via the pool,
//!   classifies the response, and consults the retry scheduler

pub mod auth;
pub mod client;
pub mod config;
pub mod pool;
pub mod retry;
pub mod signer;


pub use auth::{Credentials, CredentialsProvider, EnvProvider, StaticProvider};
pub use client::{FailureHandler, ServiceClient, SuccessHandler};
pub use config::ClientConfig;
pub use pool::{ConnectionPool, PoolKey};
pub use retry::{
    BackoffStrategy, DefaultRetryCondition, ExponentialBackoff, RetryCondition, RetryDecision,
    RetryPolicy, RetryScheduler,
};
pub use signer::{RequestSigner, SignedRequest, EMPTY_PAYLOAD_HASH};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
