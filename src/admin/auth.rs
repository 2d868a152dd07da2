//! Credential checks for the hidden admin path.
//!
//! Both the path segment and the header token are compared in constant time
//! and the results are combined without short-circuiting, so the time taken
//! does not reveal which half was wrong.

use std::fmt;

use axum::http::Method;
use subtle::{Choice, ConstantTimeEq};

use crate::admin::credential::AdminCredential;

/// Operations reachable behind the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    /// `GET {namespace}/{secret}/access`
    Access,
    /// `POST {namespace}/{secret}/rotate`
    Rotate,
}

impl AdminAction {
    pub fn from_request(method: &Method, action: &str) -> Option<Self> {
        match (method, action) {
            (&Method::GET, "access") => Some(AdminAction::Access),
            (&Method::POST, "rotate") => Some(AdminAction::Rotate),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminAction::Access => "access",
            AdminAction::Rotate => "rotate",
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `{namespace}/{segment}/{action}` into its segment and action.
///
/// Anything else under the namespace (missing parts, extra parts, empty
/// parts) yields `None`.
pub fn split_admin_path<'a>(namespace: &str, path: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = path.strip_prefix(namespace)?.strip_prefix('/')?;
    let (segment, action) = rest.split_once('/')?;
    if segment.is_empty() || action.is_empty() || action.contains('/') {
        return None;
    }
    Some((segment, action))
}

/// Constant-time check of a presented segment and token.
pub fn credential_matches(credential: &AdminCredential, segment: &[u8], token: Option<&[u8]>) -> bool {
    let path_ok = credential.secret_path().as_bytes().ct_eq(segment);
    let token_ok = credential.access_token().as_bytes().ct_eq(token.unwrap_or_default());
    let present = Choice::from(u8::from(token.is_some()));
    (path_ok & token_ok & present).into()
}
