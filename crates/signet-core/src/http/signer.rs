//! SigV4-style request signing
//!
//! Implements the canonical-request / HMAC-SHA256 signing chain:
//!
//! 1. Create a canonical request
//! 2. Create the string to sign
//! 3. Derive the signing key
//! 4. Render the Authorization header
//!
//! Signing is a pure function of (credentials, canonical request,
//! timestamp). The pipeline recomputes it fresh on every attempt because
//! the timestamp differs between attempts; nothing is cached here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::http::auth::Credentials;
use crate::types::Request;

type HmacSha256 = Hmac<Sha256>;

/// The signing algorithm name carried in the Authorization header
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Hex SHA-256 of the empty payload
pub const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Signs requests for one (host, service) destination.
///
/// Region and service code are derived once at construction; the signer
/// itself is stateless and side-effect free.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    host: String,
    region: String,
    service_code: String,
}

/// Output of [`RequestSigner::sign`]: the Authorization header value, the
/// full outbound header set, and the canonical path + query to dispatch.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Rendered Authorization header value
    pub authorization: String,
    /// Headers to send, keyed by lowercase name
    pub headers: BTreeMap<String, String>,
    /// Resource path plus canonical query string
    pub path_and_query: String,
}

impl RequestSigner {
    /// Create a signer for a destination host and logical service name
    pub fn new(host: &str, service_name: &str) -> Self {
        let service_code = derive_service_code(service_name);
        let region = derive_region(host);
        Self {
            host: host.to_string(),
            region,
            service_code,
        }
    }

    /// Region derived from the destination host
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Service code derived from the logical service name
    pub fn service_code(&self) -> &str {
        &self.service_code
    }

    /// Sign a request with the given credentials and timestamp.
    ///
    /// Deterministic: identical inputs always produce an identical
    /// signature. The header set always carries `accept-encoding`, `host`,
    /// and `x-amz-date`; `x-amz-security-token` when the credentials hold a
    /// session token; and the caller's headers overlaid last.
    pub fn sign(
        &self,
        request: &Request,
        credentials: &Credentials,
        timestamp: DateTime<Utc>,
    ) -> Result<SignedRequest> {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        let canonical_query = canonical_query_string(&request.parameters);
        let payload_hash = match &request.body {
            Some(body) => sha256_hex(body),
            None => EMPTY_PAYLOAD_HASH.to_string(),
        };

        // Header names are lowercased on insert so the BTreeMap iterates in
        // canonical (sorted, lowercase) order without a second pass.
        let mut headers = BTreeMap::new();
        headers.insert("accept-encoding".to_string(), "gzip".to_string());
        headers.insert("host".to_string(), self.host.clone());
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(token) = &credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }
        for (name, value) in &request.headers {
            headers.insert(name.to_lowercase(), value.clone());
        }

        let canonical_uri = if request.resource_path.is_empty() {
            "/"
        } else {
            request.resource_path.as_str()
        };

        let canonical_headers = canonical_header_block(&headers);
        let signed_headers = signed_header_names(&headers);

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method, canonical_uri, canonical_query, canonical_headers, signed_headers,
            payload_hash
        );

        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service_code
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &credentials.secret_access_key,
            &date_stamp,
            &self.region,
            &self.service_code,
        )?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key_id, credential_scope, signed_headers, signature
        );

        let path_and_query = if canonical_query.is_empty() {
            canonical_uri.to_string()
        } else {
            format!("{}?{}", canonical_uri, canonical_query)
        };

        Ok(SignedRequest {
            authorization,
            headers,
            path_and_query,
        })
    }
}

/// Build the canonical query string.
///
/// Values are URL-encoded; pairs are joined in the order the map supplies
/// them (the request model keeps parameters in lexicographic name order).
pub fn canonical_query_string(parameters: &BTreeMap<String, String>) -> String {
    parameters
        .iter()
        .map(|(name, value)| format!("{}={}", name, uri_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical header block: `lowercase-name:value\n` per header, sorted by
/// name. Keys are already lowercase here.
fn canonical_header_block(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}

/// Signed-header list: sorted lowercase names joined by `;`
fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

/// Derive the request-scoped signing key.
///
/// kSecret  = "AWS4" + secret
/// kDate    = HMAC-SHA256(kSecret, date)
/// kRegion  = HMAC-SHA256(kDate, region)
/// kService = HMAC-SHA256(kRegion, service)
/// kSigning = HMAC-SHA256(kService, "aws4_request")
fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Compute SHA-256 and return the lowercase hex digest
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256.
///
/// Primitive initialization failure is a client-side configuration defect,
/// surfaced rather than swallowed; it is never retryable.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| Error::Client {
        message: format!("failed to initialize HMAC-SHA256: {e}"),
        source: None,
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// URL-encode a query value per the SigV4 encode set (RFC 3986 unreserved
/// characters pass through)
pub fn uri_encode(input: &str) -> String {
    use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

    const SIGV4_ENCODE_SET: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'"')
        .add(b'#')
        .add(b'$')
        .add(b'%')
        .add(b'&')
        .add(b'\'')
        .add(b'(')
        .add(b')')
        .add(b'*')
        .add(b'+')
        .add(b',')
        .add(b'/')
        .add(b':')
        .add(b';')
        .add(b'<')
        .add(b'=')
        .add(b'>')
        .add(b'?')
        .add(b'@')
        .add(b'[')
        .add(b'\\')
        .add(b']')
        .add(b'^')
        .add(b'`')
        .add(b'{')
        .add(b'|')
        .add(b'}');

    utf8_percent_encode(input, SIGV4_ENCODE_SET).to_string()
}

/// Derive the service code from a logical service name.
///
/// "AmazonEC2" becomes "ec2"; a trailing "v2" is dropped, matching the
/// naming convention of the generated service clients.
fn derive_service_code(service_name: &str) -> String {
    let stripped = service_name
        .strip_prefix("Amazon")
        .or_else(|| service_name.strip_prefix("AWS"))
        .unwrap_or(service_name);
    let mut code = stripped.to_lowercase();
    if let Some(base) = code.strip_suffix("v2") {
        code = base.to_string();
    }
    code
}

/// Derive the region from a destination host such as
/// `ec2.us-west-2.amazonaws.com`. Falls back to `us-east-1` when the host
/// carries no region label.
fn derive_region(host: &str) -> String {
    let host = host.split(':').next().unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 3 && labels[1].contains('-') {
        labels[1].to_string()
    } else {
        "us-east-1".to_string()
    }
}
