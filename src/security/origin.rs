//! Caller origin resolution.
//!
//! # Responsibilities
//! - Resolve the caller's network origin from the TCP peer address
//! - Honour X-Forwarded-For only when the peer is a trusted reverse proxy
//!
//! # Design Decisions
//! - Never trust X-Forwarded-* from untrusted peers
//! - The right-most forwarded address that is not itself a trusted proxy wins
//! - Missing or malformed forwarding data from a trusted proxy resolves to
//!   no origin, which the allowlist rejects

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use ipnet::IpNet;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Clone, Default)]
pub struct OriginResolver {
    trusted_proxies: Vec<IpNet>,
}

impl OriginResolver {
    pub fn new(trusted_proxies: Vec<IpNet>) -> Self {
        Self { trusted_proxies }
    }

    fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.trusted_proxies.iter().any(|net| net.contains(ip))
    }

    /// Resolve the caller origin for a request.
    pub fn resolve(&self, peer: Option<SocketAddr>, headers: &HeaderMap) -> Option<IpAddr> {
        let peer_ip = peer?.ip().to_canonical();
        if !self.is_trusted(&peer_ip) {
            return Some(peer_ip);
        }

        // Every hop must parse; one garbled entry poisons the whole chain.
        let mut hops = Vec::new();
        for value in headers.get_all(X_FORWARDED_FOR) {
            let value = value.to_str().ok()?;
            for hop in value.split(',') {
                let ip = hop.trim().parse::<IpAddr>().ok()?.to_canonical();
                hops.push(ip);
            }
        }

        hops.into_iter().rev().find(|ip| !self.is_trusted(ip))
    }
}
