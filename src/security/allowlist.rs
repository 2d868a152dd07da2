//! Network-origin allowlist.
//!
//! Entries are single addresses (host routes) or CIDR ranges. Membership is
//! exact or range containment, nothing else.

use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

/// Error returned for an entry that is neither an address nor a range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid network entry '{0}'")]
pub struct AllowlistError(pub String);

/// Parse "10.0.0.0/8", "192.168.1.7" or "::1" into a network.
pub fn parse_network(entry: &str) -> Result<IpNet, AllowlistError> {
    let entry = entry.trim();
    if let Ok(net) = entry.parse::<IpNet>() {
        return Ok(net.trunc());
    }
    entry
        .parse::<IpAddr>()
        .map_err(|_| AllowlistError(entry.to_string()))
        .map(|ip| match ip.to_canonical() {
            IpAddr::V4(v4) => IpNet::V4(Ipv4Net::from(v4)),
            IpAddr::V6(v6) => IpNet::V6(Ipv6Net::from(v6)),
        })
}

/// Set of networks permitted to reach the admin surface.
#[derive(Debug, Clone, Default)]
pub struct AddressAllowlist {
    networks: Vec<IpNet>,
}

impl AddressAllowlist {
    pub fn new(networks: Vec<IpNet>) -> Self {
        Self { networks }
    }

    /// Build from configuration entries. Any malformed entry is an error.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Result<Self, AllowlistError> {
        let networks = entries
            .iter()
            .map(|e| parse_network(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(networks))
    }

    /// Returns true only for a resolved origin inside one of the networks.
    /// An unresolved origin is never allowed.
    pub fn is_allowed(&self, origin: Option<IpAddr>) -> bool {
        match origin {
            Some(ip) => {
                let ip = ip.to_canonical();
                self.networks.iter().any(|net| net.contains(&ip))
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
