//! Process-lifetime admin credential and its rotation.
//!
//! A credential is a random path segment plus a random header token. Both are
//! drawn from the OS CSPRNG; if that source fails, generation fails and there
//! is no fallback. The active pair lives behind a single `ArcSwap`, so a
//! reader always sees one complete pair, never a new path with an old token.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::config::SurfaceConfig;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("secure random source unavailable: {0}")]
    Entropy(#[from] rand::Error),
}

/// Fill `buf` from the OS random source.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), CredentialError> {
    OsRng.try_fill_bytes(buf)?;
    Ok(())
}

fn random_token(len: usize) -> Result<String, CredentialError> {
    let mut raw = vec![0u8; len];
    fill_random(&mut raw)?;
    let encoded = URL_SAFE_NO_PAD.encode(&raw);
    raw.zeroize();
    Ok(encoded)
}

/// The active secret path and access token.
pub struct AdminCredential {
    secret_path: String,
    access_token: String,
    issued_at: DateTime<Utc>,
}

impl AdminCredential {
    fn generate(path_bytes: usize, token_bytes: usize) -> Result<Self, CredentialError> {
        Ok(Self {
            secret_path: random_token(path_bytes)?,
            access_token: random_token(token_bytes)?,
            issued_at: Utc::now(),
        })
    }

    pub fn secret_path(&self) -> &str {
        &self.secret_path
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential")
            .field("secret_path", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl Drop for AdminCredential {
    fn drop(&mut self) {
        self.secret_path.zeroize();
        self.access_token.zeroize();
    }
}

/// Owner of the single active [`AdminCredential`].
pub struct SecretRotationManager {
    current: ArcSwap<AdminCredential>,
    path_bytes: usize,
    token_bytes: usize,
}

impl SecretRotationManager {
    /// Generate the first credential. Fails only if the CSPRNG is unavailable.
    pub fn new(path_bytes: usize, token_bytes: usize) -> Result<Self, CredentialError> {
        let first = AdminCredential::generate(path_bytes, token_bytes)?;
        Ok(Self {
            current: ArcSwap::from_pointee(first),
            path_bytes,
            token_bytes,
        })
    }

    pub fn from_config(config: &SurfaceConfig) -> Result<Self, CredentialError> {
        Self::new(config.path_bytes, config.token_bytes)
    }

    pub fn current_credential(&self) -> Arc<AdminCredential> {
        self.current.load_full()
    }

    /// Replace the active pair. The previous pair stops validating as soon
    /// as this returns; on error the previous pair stays active.
    pub fn rotate(&self) -> Result<Arc<AdminCredential>, CredentialError> {
        let next = Arc::new(AdminCredential::generate(self.path_bytes, self.token_bytes)?);
        self.current.store(Arc::clone(&next));
        metrics::record_rotation();
        tracing::info!(issued_at = %next.issued_at(), "Admin credential rotated");
        Ok(next)
    }
}

impl fmt::Debug for SecretRotationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRotationManager")
            .field("current", &self.current.load_full())
            .finish_non_exhaustive()
    }
}

/// Hand a credential to the operator out-of-band.
///
/// Written straight to stderr, not through `tracing`, so log shippers never
/// see it.
pub fn announce_credential(credential: &AdminCredential, namespace: &str, token_header: &str) {
    eprintln!();
    eprintln!("  admin credential issued at {}", credential.issued_at().to_rfc3339());
    eprintln!("    GET  {namespace}/{}/access", credential.secret_path());
    eprintln!("    POST {namespace}/{}/rotate", credential.secret_path());
    eprintln!("    {token_header}: {}", credential.access_token());
    eprintln!();
}
