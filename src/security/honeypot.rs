//! Decoy admin path detection.
//!
//! Matching is case-sensitive and operates on the raw request path: a scanner
//! probing `/WP-ADMIN` does not trip the decoy unless that spelling is listed.
//! Paths are not normalised, so `/admin/` is only a hit through a prefix entry.

use std::collections::HashSet;

use crate::config::HoneypotConfig;

#[derive(Debug, Clone, Default)]
pub struct HoneypotDetector {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl HoneypotDetector {
    pub fn new<I, J>(exact: I, prefixes: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            exact: exact.into_iter().collect(),
            prefixes: prefixes.into_iter().collect(),
        }
    }

    pub fn from_config(config: &HoneypotConfig) -> Self {
        Self::new(config.paths.iter().cloned(), config.prefixes.iter().cloned())
    }

    /// Returns true when the path is one of the decoys.
    pub fn matches(&self, path: &str) -> bool {
        self.exact.contains(path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}
