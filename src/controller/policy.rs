//! Request routing and cache eligibility rules
//!
//! Pure functions, no I/O. The controller consults these before touching
//! the network or the cache store.

use crate::http::{Request, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the controller serves intercepted requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Network, then cache on transport failure
    #[default]
    NetworkFirst,
    /// Cache, then network on miss
    CacheFirst,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkFirst => write!(f, "network-first"),
            Self::CacheFirst => write!(f, "cache-first"),
        }
    }
}

/// How the exclusion marker is matched against a request URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Marker anywhere in the full URL
    #[default]
    Substring,
    /// URL path starts with the marker
    PathPrefix,
}

/// Requests matching this rule bypass the controller entirely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    pub marker: String,
    pub mode: MatchMode,
}

impl ExclusionRule {
    pub fn new(marker: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            marker: marker.into(),
            mode,
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        if self.marker.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Substring => request.url.contains(&self.marker),
            MatchMode::PathPrefix => request.path().starts_with(&self.marker),
        }
    }
}

impl Default for ExclusionRule {
    fn default() -> Self {
        Self::new("/api/", MatchMode::Substring)
    }
}

/// Where an intercepted request goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Straight to the network, no cache reads or writes
    Bypass,
    /// Apply the configured fetch strategy
    Strategy(FetchStrategy),
}

/// Decide how a request is handled
pub fn route(request: &Request, rule: &ExclusionRule, strategy: FetchStrategy) -> Route {
    if rule.matches(request) || !request.method.is_cacheable() {
        Route::Bypass
    } else {
        Route::Strategy(strategy)
    }
}

/// Only 200 responses to GET requests are written to a generation
pub fn is_cacheable(request: &Request, response: &Response) -> bool {
    request.method.is_cacheable() && response.is_ok()
}

/// Every generation except `current` is stale once `current` activates
pub fn generations_to_delete(names: &[String], current: &str) -> Vec<String> {
    names
        .iter()
        .filter(|name| name.as_str() != current)
        .cloned()
        .collect()
}
