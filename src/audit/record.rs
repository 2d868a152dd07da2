//! Audit record types and masking helpers.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::admin::credential::{fill_random, CredentialError};

/// Outcome of one pass through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Allowed,
    DeniedOrigin,
    DeniedCredential,
    DeniedRateLimited,
    HoneypotTriggered,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::DeniedOrigin => "denied-origin",
            Decision::DeniedCredential => "denied-credential",
            Decision::DeniedRateLimited => "denied-rate-limited",
            Decision::HoneypotTriggered => "honeypot-triggered",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable audit entry.
///
/// The path is stored masked and the description never carries secret
/// material, so records can be shipped to external collectors as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    timestamp: DateTime<Utc>,
    request_id: Option<String>,
    origin: Option<IpAddr>,
    method: String,
    path: String,
    decision: Decision,
    description: String,
}

impl AuditRecord {
    pub fn new(
        request_id: Option<String>,
        origin: Option<IpAddr>,
        method: impl Into<String>,
        path: impl Into<String>,
        decision: Decision,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id,
            origin,
            method: method.into(),
            path: path.into(),
            decision,
            description: description.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn origin(&self) -> Option<IpAddr> {
        self.origin
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

const FINGERPRINT_HEX_LEN: usize = 12;

/// Keyed, non-reversible fingerprints for secrets that must not be logged.
///
/// The key is random per process, so fingerprints correlate repeated guesses
/// within one run but cannot be brute-forced offline from the audit trail.
pub struct Fingerprinter {
    key: [u8; 32],
}

impl Fingerprinter {
    pub fn generate() -> Result<Self, CredentialError> {
        let mut key = [0u8; 32];
        fill_random(&mut key)?;
        Ok(Self { key })
    }

    pub fn fingerprint(&self, secret: &[u8]) -> String {
        let hash = blake3::keyed_hash(&self.key, secret);
        hash.to_hex().as_str()[..FINGERPRINT_HEX_LEN].to_string()
    }

    /// Replace every segment under `namespace` with its fingerprint, except
    /// a trailing action name.
    ///
    /// `/hidden/<secret>/access` becomes `/hidden/~1a2b3c4d5e6f/access`, and
    /// stray slashes (`/hidden//<secret>/access`) do not change that. Paths
    /// outside the namespace are returned unchanged.
    pub fn mask_path(&self, namespace: &str, path: &str) -> String {
        let Some(rest) = path.strip_prefix(namespace).and_then(|r| r.strip_prefix('/')) else {
            return path.to_string();
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let last = segments.len() - 1;
        let masked: Vec<String> = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| match *segment {
                "" => String::new(),
                "access" | "rotate" if i == last && i > 0 => segment.to_string(),
                _ => format!("~{}", self.fingerprint(segment.as_bytes())),
            })
            .collect();
        format!("{namespace}/{}", masked.join("/"))
    }
}

impl fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprinter").finish_non_exhaustive()
    }
}

impl Drop for Fingerprinter {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
