//! The admin access gate.
//!
//! Every request touching the admin surface walks the same fixed sequence:
//!
//! ```text
//! RECEIVED
//!   → ORIGIN_CHECKED      resolve origin, allowlist          → denied-origin
//!   → (decoy path?)       consume a rate slot, then stop     → honeypot-triggered
//!   → RATE_CHECKED        fixed-window budget                → denied-rate-limited
//!   → CREDENTIAL_CHECKED  constant-time path + token check   → denied-credential
//!   → DECIDED                                                → allowed
//! ```
//!
//! The origin check always precedes any credential comparison. Every outcome
//! is audited; callers only ever see the payload or the generic not-found
//! response.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::header::InvalidHeaderName;
use axum::http::{HeaderMap, HeaderName, Method};

use crate::admin::auth::{self, AdminAction};
use crate::admin::credential::{announce_credential, AdminCredential, CredentialError, SecretRotationManager};
use crate::audit::{AuditLogger, AuditRecord, Decision, Fingerprinter};
use crate::config::GateConfig;
use crate::security::allowlist::parse_network;
use crate::security::{AddressAllowlist, AllowlistError, HoneypotDetector, OriginResolver, RateLimiter};

/// Why a request was refused. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("origin not allowed")]
    OriginDenied,
    #[error("rate limited for another {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("credential invalid")]
    CredentialInvalid,
    #[error("honeypot path requested")]
    HoneypotTriggered,
}

impl Denial {
    pub fn decision(&self) -> Decision {
        match self {
            Denial::OriginDenied => Decision::DeniedOrigin,
            Denial::RateLimited { .. } => Decision::DeniedRateLimited,
            Denial::CredentialInvalid => Decision::DeniedCredential,
            Denial::HoneypotTriggered => Decision::HoneypotTriggered,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateInitError {
    #[error(transparent)]
    Allowlist(#[from] AllowlistError),
    #[error("invalid token header: {0}")]
    TokenHeader(#[from] InvalidHeaderName),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// The parts of the configuration that can be swapped at runtime.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub allowlist: AddressAllowlist,
    pub honeypot: HoneypotDetector,
    pub resolver: OriginResolver,
}

impl AccessPolicy {
    pub fn from_config(config: &GateConfig) -> Result<Self, AllowlistError> {
        let proxies = config
            .allowlist
            .trusted_proxies
            .iter()
            .map(|p| parse_network(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allowlist: AddressAllowlist::from_entries(&config.allowlist.origins)?,
            honeypot: HoneypotDetector::from_config(&config.honeypot),
            resolver: OriginResolver::new(proxies),
        })
    }
}

/// Request facts the gate decides on.
#[derive(Debug)]
pub struct GateRequest<'a> {
    pub peer: Option<SocketAddr>,
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub request_id: Option<&'a str>,
}

/// A request that passed every check.
#[derive(Debug)]
pub struct Admission {
    pub origin: IpAddr,
    pub action: AdminAction,
    pub credential: Arc<AdminCredential>,
    pub request_id: Option<String>,
}

pub struct AdminAccessGate {
    policy: ArcSwap<AccessPolicy>,
    limiter: RateLimiter,
    credentials: Arc<SecretRotationManager>,
    audit: Arc<AuditLogger>,
    fingerprints: Fingerprinter,
    namespace: String,
    token_header: HeaderName,
}

impl AdminAccessGate {
    pub fn new(
        config: &GateConfig,
        credentials: Arc<SecretRotationManager>,
        audit: Arc<AuditLogger>,
    ) -> Result<Self, GateInitError> {
        Ok(Self {
            policy: ArcSwap::from_pointee(AccessPolicy::from_config(config)?),
            limiter: RateLimiter::from_config(&config.rate_limit),
            credentials,
            audit,
            fingerprints: Fingerprinter::generate()?,
            namespace: config.gate.namespace.clone(),
            token_header: HeaderName::from_bytes(config.gate.token_header.as_bytes())?,
        })
    }

    /// Swap in the allowlist, proxies and decoys from a reloaded config.
    pub fn reload_policy(&self, config: &GateConfig) -> Result<(), AllowlistError> {
        let policy = AccessPolicy::from_config(config)?;
        tracing::info!(
            origins = policy.allowlist.len(),
            "Access policy reloaded"
        );
        self.policy.store(Arc::new(policy));
        Ok(())
    }

    /// Whether a path belongs to the admin surface (namespace or decoy).
    pub fn covers(&self, path: &str) -> bool {
        self.in_namespace(path) || self.policy.load().honeypot.matches(path)
    }

    fn in_namespace(&self, path: &str) -> bool {
        path.strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Run the full check sequence and audit the outcome.
    pub fn evaluate(&self, req: &GateRequest<'_>) -> Result<Admission, Denial> {
        let policy = self.policy.load();

        let resolved = policy.resolver.resolve(req.peer, req.headers);
        let origin = match resolved {
            Some(ip) if policy.allowlist.is_allowed(Some(ip)) => ip,
            _ => {
                let note = if policy.honeypot.matches(req.path) {
                    "origin not in allowlist; decoy path"
                } else if resolved.is_none() {
                    "origin unresolved"
                } else {
                    "origin not in allowlist"
                };
                return Err(self.deny(req, resolved, Denial::OriginDenied, note));
            }
        };

        if policy.honeypot.matches(req.path) {
            // Decoy hits are not free: they spend the same budget as real attempts.
            let rate = self.limiter.allow(origin);
            let note = if rate.permitted {
                "decoy path probed"
            } else {
                "decoy path probed; rate limit exhausted"
            };
            return Err(self.deny(req, Some(origin), Denial::HoneypotTriggered, note));
        }

        let rate = self.limiter.allow(origin);
        if !rate.permitted {
            let retry_after = rate.retry_after.unwrap_or_default();
            let note = format!("rate limit exceeded; window reopens in {}s", retry_after.as_secs());
            return Err(self.deny(req, Some(origin), Denial::RateLimited { retry_after }, note));
        }

        let credential = self.credentials.current_credential();
        let token = req.headers.get(&self.token_header).map(|v| v.as_bytes());
        let (segment, action) = auth::split_admin_path(&self.namespace, req.path).unwrap_or(("", ""));
        let matched = auth::credential_matches(&credential, segment.as_bytes(), token);

        match (matched, AdminAction::from_request(req.method, action)) {
            (true, Some(action)) => {
                self.commit(req, Some(origin), Decision::Allowed, format!("operator {action} granted"));
                Ok(Admission {
                    origin,
                    action,
                    credential,
                    request_id: req.request_id.map(str::to_owned),
                })
            }
            _ => {
                let note = match token {
                    Some(t) => format!("credential mismatch; token {}", self.fingerprints.fingerprint(t)),
                    None => "credential mismatch; token absent".to_string(),
                };
                Err(self.deny(req, Some(origin), Denial::CredentialInvalid, note))
            }
        }
    }

    fn deny(&self, req: &GateRequest<'_>, origin: Option<IpAddr>, denial: Denial, note: impl Into<String>) -> Denial {
        tracing::debug!(decision = %denial.decision(), origin = ?origin, "Admin surface request denied");
        self.commit(req, origin, denial.decision(), note);
        denial
    }

    fn commit(&self, req: &GateRequest<'_>, origin: Option<IpAddr>, decision: Decision, note: impl Into<String>) {
        self.audit.record(AuditRecord::new(
            req.request_id.map(str::to_owned),
            origin,
            req.method.as_str(),
            self.fingerprints.mask_path(&self.namespace, req.path),
            decision,
            note,
        ));
    }

    /// Print the credential for the operator. See [`announce_credential`].
    pub fn announce(&self, credential: &AdminCredential) {
        tracing::info!(
            issued_at = %credential.issued_at(),
            path = %self.fingerprints.mask_path(&self.namespace, &format!("{}/{}", self.namespace, credential.secret_path())),
            "Admin credential issued; delivered on the operator console"
        );
        announce_credential(credential, &self.namespace, self.token_header.as_str());
    }

    pub fn credentials(&self) -> &Arc<SecretRotationManager> {
        &self.credentials
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tokio::sync::broadcast;

    struct Fixture {
        gate: AdminAccessGate,
        records: broadcast::Receiver<AuditRecord>,
    }

    fn fixture(configure: impl FnOnce(&mut GateConfig)) -> Fixture {
        let mut config = GateConfig::default();
        config.allowlist.origins = vec!["127.0.0.1".into()];
        configure(&mut config);

        let (audit, _writer) = AuditLogger::new(&config.audit);
        let records = audit.subscribe();
        let credentials = Arc::new(SecretRotationManager::from_config(&config.gate).unwrap());
        let gate = AdminAccessGate::new(&config, credentials, audit).unwrap();
        Fixture { gate, records }
    }

    fn peer(ip: &str) -> Option<SocketAddr> {
        Some(SocketAddr::new(ip.parse().unwrap(), 40000))
    }

    fn token_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-token", HeaderValue::from_str(token).unwrap());
        headers
    }

    fn access_path(gate: &AdminAccessGate) -> String {
        format!("/hidden/{}/access", gate.credentials().current_credential().secret_path())
    }

    fn valid_token(gate: &AdminAccessGate) -> HeaderMap {
        token_headers(gate.credentials().current_credential().access_token())
    }

    fn evaluate(gate: &AdminAccessGate, ip: &str, method: &Method, path: &str, headers: &HeaderMap) -> Result<Admission, Denial> {
        gate.evaluate(&GateRequest {
            peer: peer(ip),
            method,
            path,
            headers,
            request_id: Some("req-test"),
        })
    }

    #[tokio::test]
    async fn correct_credential_is_admitted() {
        let mut f = fixture(|_| {});
        let path = access_path(&f.gate);
        let admission = evaluate(&f.gate, "127.0.0.1", &Method::GET, &path, &valid_token(&f.gate)).unwrap();

        assert_eq!(admission.action, AdminAction::Access);
        let record = f.records.recv().await.unwrap();
        assert_eq!(record.decision(), Decision::Allowed);
        assert_eq!(record.request_id(), Some("req-test"));
        assert!(!record.path().contains(f.gate.credentials().current_credential().secret_path()));
    }

    #[tokio::test]
    async fn doubled_slash_never_records_the_secret() {
        let mut f = fixture(|_| {});
        let secret = f.gate.credentials().current_credential().secret_path().to_string();
        let path = format!("/hidden//{secret}/access");
        let denial = evaluate(&f.gate, "127.0.0.1", &Method::GET, &path, &valid_token(&f.gate));

        assert_eq!(denial.unwrap_err(), Denial::CredentialInvalid);
        let record = f.records.recv().await.unwrap();
        assert!(!record.path().contains(&secret));
        assert!(record.path().ends_with("/access"));
    }

    #[tokio::test]
    async fn disallowed_origin_is_denied_before_credential_check() {
        let mut f = fixture(|_| {});
        let path = access_path(&f.gate);
        let denial = evaluate(&f.gate, "198.51.100.1", &Method::GET, &path, &valid_token(&f.gate)).unwrap_err();

        assert_eq!(denial, Denial::OriginDenied);
        assert_eq!(f.records.recv().await.unwrap().decision(), Decision::DeniedOrigin);
        assert_eq!(f.gate.limiter().tracked_origins(), 0);
    }

    #[tokio::test]
    async fn unresolved_origin_is_denied() {
        let mut f = fixture(|c| c.allowlist.origins = vec!["0.0.0.0/0".into(), "::/0".into()]);
        let denial = f
            .gate
            .evaluate(&GateRequest {
                peer: None,
                method: &Method::GET,
                path: "/hidden/x/access",
                headers: &HeaderMap::new(),
                request_id: None,
            })
            .unwrap_err();

        assert_eq!(denial, Denial::OriginDenied);
        let record = f.records.recv().await.unwrap();
        assert_eq!(record.origin(), None);
        assert_eq!(record.description(), "origin unresolved");
    }

    #[tokio::test]
    async fn wrong_token_and_wrong_path_share_a_denial() {
        let mut f = fixture(|c| c.rate_limit.limit = 10);
        let cred = f.gate.credentials().current_credential();
        let mut almost = cred.access_token().to_string();
        let replacement = if almost.ends_with('A') { "B" } else { "A" };
        almost.replace_range(almost.len() - 1.., replacement);

        let wrong_token = evaluate(&f.gate, "127.0.0.1", &Method::GET, &access_path(&f.gate), &token_headers(&almost));
        let wrong_path = evaluate(&f.gate, "127.0.0.1", &Method::GET, "/hidden/guess/access", &valid_token(&f.gate));
        let no_token = evaluate(&f.gate, "127.0.0.1", &Method::GET, &access_path(&f.gate), &HeaderMap::new());

        assert_eq!(wrong_token.unwrap_err(), Denial::CredentialInvalid);
        assert_eq!(wrong_path.unwrap_err(), Denial::CredentialInvalid);
        assert_eq!(no_token.unwrap_err(), Denial::CredentialInvalid);
        for _ in 0..3 {
            let record = f.records.recv().await.unwrap();
            assert_eq!(record.decision(), Decision::DeniedCredential);
            assert!(!record.description().contains(&almost));
        }
    }

    #[tokio::test]
    async fn wrong_method_for_action_is_a_credential_denial() {
        let f = fixture(|_| {});
        let denial = evaluate(&f.gate, "127.0.0.1", &Method::POST, &access_path(&f.gate), &valid_token(&f.gate));
        assert_eq!(denial.unwrap_err(), Denial::CredentialInvalid);
    }

    #[tokio::test]
    async fn honeypot_is_audited_and_consumes_budget() {
        let mut f = fixture(|c| c.rate_limit.limit = 1);
        let denial = evaluate(&f.gate, "127.0.0.1", &Method::GET, "/wp-login.php", &HeaderMap::new());

        assert_eq!(denial.unwrap_err(), Denial::HoneypotTriggered);
        assert_eq!(f.records.recv().await.unwrap().decision(), Decision::HoneypotTriggered);

        // The decoy spent the only slot, so even the real credential is refused now.
        let real = evaluate(&f.gate, "127.0.0.1", &Method::GET, &access_path(&f.gate), &valid_token(&f.gate));
        assert!(matches!(real.unwrap_err(), Denial::RateLimited { .. }));
        assert_eq!(f.records.recv().await.unwrap().decision(), Decision::DeniedRateLimited);
    }

    #[tokio::test]
    async fn honeypot_from_outside_is_an_origin_denial() {
        let mut f = fixture(|_| {});
        let denial = evaluate(&f.gate, "203.0.113.50", &Method::GET, "/wp-admin/setup.php", &HeaderMap::new());

        assert_eq!(denial.unwrap_err(), Denial::OriginDenied);
        let record = f.records.recv().await.unwrap();
        assert_eq!(record.path(), "/wp-admin/setup.php");
        assert!(record.description().contains("decoy"));
    }

    #[tokio::test]
    async fn rotation_invalidates_previous_pair_immediately() {
        let f = fixture(|c| c.rate_limit.limit = 10);
        let old_path = access_path(&f.gate);
        let old_token = valid_token(&f.gate);
        assert!(evaluate(&f.gate, "127.0.0.1", &Method::GET, &old_path, &old_token).is_ok());

        f.gate.credentials().rotate().unwrap();

        let stale = evaluate(&f.gate, "127.0.0.1", &Method::GET, &old_path, &old_token);
        assert_eq!(stale.unwrap_err(), Denial::CredentialInvalid);
        let mixed = evaluate(&f.gate, "127.0.0.1", &Method::GET, &access_path(&f.gate), &old_token);
        assert_eq!(mixed.unwrap_err(), Denial::CredentialInvalid);
        assert!(evaluate(&f.gate, "127.0.0.1", &Method::GET, &access_path(&f.gate), &valid_token(&f.gate)).is_ok());
    }

    #[tokio::test]
    async fn reload_swaps_allowlist() {
        let f = fixture(|_| {});
        let mut next = GateConfig::default();
        next.allowlist.origins = vec!["10.0.0.0/8".into()];
        f.gate.reload_policy(&next).unwrap();

        let path = access_path(&f.gate);
        let denial = evaluate(&f.gate, "127.0.0.1", &Method::GET, &path, &valid_token(&f.gate));
        assert_eq!(denial.unwrap_err(), Denial::OriginDenied);
        assert!(evaluate(&f.gate, "10.1.1.1", &Method::GET, &path, &valid_token(&f.gate)).is_ok());
    }

    #[tokio::test]
    async fn covers_namespace_and_decoys_only() {
        let f = fixture(|_| {});
        assert!(f.gate.covers("/hidden"));
        assert!(f.gate.covers("/hidden/anything/here"));
        assert!(f.gate.covers("/phpmyadmin"));
        assert!(!f.gate.covers("/hiddenx"));
        assert!(!f.gate.covers("/api/health"));
    }
}
