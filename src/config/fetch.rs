//! HTTP fetch configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::DEFAULT_USER_AGENT;

/// Settings shared by every page fetch in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// User agent string
    pub user_agent: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
    /// Proxy for plain-HTTP URLs
    pub http_proxy: Option<String>,
    /// Proxy for HTTPS URLs
    pub https_proxy: Option<String>,
    /// Comma-separated hosts that bypass the proxies, in `NO_PROXY` syntax
    pub no_proxy: Option<String>,
    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            http_proxy: None,
            https_proxy: None,
            no_proxy: None,
            headers: BTreeMap::new(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Apply `USER_AGENT` and the proxy variables from the environment.
    ///
    /// Proxy variables are read upper-case first, then lower-case.
    pub(super) fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(ua) = lookup("USER_AGENT") {
            self.user_agent = ua;
        }
        if let Some(proxy) = either_case(lookup, "HTTP_PROXY") {
            self.http_proxy = Some(proxy);
        }
        if let Some(proxy) = either_case(lookup, "HTTPS_PROXY") {
            self.https_proxy = Some(proxy);
        }
        if let Some(hosts) = either_case(lookup, "NO_PROXY") {
            self.no_proxy = Some(hosts);
        }
    }
}

fn either_case(lookup: &dyn Fn(&str) -> Option<String>, upper: &str) -> Option<String> {
    lookup(upper).or_else(|| lookup(&upper.to_ascii_lowercase()))
}
