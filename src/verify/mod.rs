//! Inbound request verification.
//!
//! The platform signs every webhook delivery; the relay refuses to do any
//! database or LLM work for a request it cannot attribute. The cryptography
//! is deliberately thin: a key-ring lookup by key id plus a digest compare.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::SigningConfig;
use crate::error::{RelayError, Result};

/// Header carrying the caller identity token.
pub const IDENTITY_HEADER: &str = "x-relay-identity";
/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-relay-signature";
/// Header naming the signing key.
pub const KEY_ID_HEADER: &str = "x-relay-key-id";

/// The authentication material extracted from inbound headers.
///
/// All fields are optional at this layer; the verifier decides what is
/// required.
#[derive(Debug, Clone, Default)]
pub struct InboundAuth {
    /// Caller identity token.
    pub identity: Option<String>,
    /// Request signature (base64).
    pub signature: Option<String>,
    /// Signing key identifier.
    pub key_id: Option<String>,
}

/// Trait for inbound request verifiers.
pub trait RequestVerifier: Send + Sync {
    /// Verifies the request, returning the caller identity on success.
    fn verify(&self, auth: &InboundAuth, body: &[u8]) -> Result<String>;
}

/// Verifier backed by a configured key ring.
///
/// The expected signature is `base64(sha256(secret "." identity "." body))`
/// with the secret selected by the key id header.
pub struct KeyRingVerifier {
    keys: HashMap<String, String>,
}

impl KeyRingVerifier {
    /// Creates a verifier over the given key ring.
    pub fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }

    /// Creates a verifier from the signing configuration.
    ///
    /// An empty key ring is a configuration error: the operator must either
    /// provision keys or explicitly allow unsigned requests.
    pub fn from_config(config: &SigningConfig) -> Result<Self> {
        if config.keys.is_empty() {
            return Err(RelayError::config(
                "no signing keys configured; set [signing.keys] or signing.allow_unsigned",
            ));
        }
        Ok(Self::new(config.keys.clone()))
    }

    fn expected_signature(secret: &str, identity: &str, body: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.update(b".");
        hasher.update(identity.as_bytes());
        hasher.update(b".");
        hasher.update(body);
        BASE64.encode(hasher.finalize())
    }
}

impl RequestVerifier for KeyRingVerifier {
    fn verify(&self, auth: &InboundAuth, body: &[u8]) -> Result<String> {
        let identity = auth
            .identity
            .as_deref()
            .ok_or_else(|| RelayError::verification("missing identity token"))?;

        let signature = auth
            .signature
            .as_deref()
            .ok_or_else(|| RelayError::verification("missing signature"))?;

        let key_id = auth
            .key_id
            .as_deref()
            .ok_or_else(|| RelayError::verification("missing signature key id"))?;

        let secret = self
            .keys
            .get(key_id)
            .ok_or_else(|| RelayError::verification(format!("unknown signature key id: {key_id}")))?;

        let expected = Self::expected_signature(secret, identity, body);
        if expected != signature {
            return Err(RelayError::verification("signature mismatch"));
        }

        debug!(identity, key_id, "Request verified");
        Ok(identity.to_string())
    }
}

/// Verifier that accepts every request (development only).
///
/// Requests without an identity token are attributed to "anonymous".
pub struct AllowAllVerifier;

impl RequestVerifier for AllowAllVerifier {
    fn verify(&self, auth: &InboundAuth, _body: &[u8]) -> Result<String> {
        Ok(auth
            .identity
            .clone()
            .unwrap_or_else(|| "anonymous".to_string()))
    }
}

/// Computes a valid signature for a request.
///
/// Exposed so tests and client tooling can sign deliveries.
pub fn sign_request(secret: &str, identity: &str, body: &[u8]) -> String {
    KeyRingVerifier::expected_signature(secret, identity, body)
}
