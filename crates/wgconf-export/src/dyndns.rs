//! IPv64.net Dynamic DNS
//!
//! Settings record and update-URL helpers for keeping the server's public
//! hostname current. Router dialects that support DynDNS render these into
//! their own syntax.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IPv64.net update endpoint
pub const IPV64_UPDATE_URL: &str = "https://ipv64.net/nic/update";

/// Domains handed out by IPv64.net end with this suffix
pub const IPV64_DOMAIN_SUFFIX: &str = ".ipv64.net";

/// Dynamic DNS settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynDnsSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub api_key: String,
}

impl DynDnsSettings {
    /// Enabled settings for `domain`
    pub fn ipv64(domain: &str, api_key: &str) -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            domain: domain.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Domain and API key are both present
    pub fn is_complete(&self) -> bool {
        !self.domain.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Enabled and complete, so exporters should render it
    pub fn is_active(&self) -> bool {
        self.enabled && self.is_complete()
    }
}

impl Default for DynDnsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            domain: String::new(),
            api_key: String::new(),
        }
    }
}

impl fmt::Debug for DynDnsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynDnsSettings")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("domain", &self.domain)
            .field("api_key", &"[redacted]")
            .finish()
    }
}

fn default_provider() -> String {
    "ipv64".to_string()
}

/// Update URL that lets the provider detect the caller's address
pub fn update_url(api_key: &str, domain: &str) -> String {
    format!("{}?key={}&domain={}", IPV64_UPDATE_URL, api_key, domain)
}

/// Update URL with explicit addresses (placeholders such as `<ipaddr>` work too)
pub fn update_url_with_ip(api_key: &str, domain: &str, ipv4: Option<&str>, ipv6: Option<&str>) -> String {
    let mut url = update_url(api_key, domain);
    if let Some(ip) = ipv4 {
        url.push_str(&format!("&ip={}", ip));
    }
    if let Some(ip) = ipv6 {
        url.push_str(&format!("&ip6={}", ip));
    }
    url
}

/// `<label>.ipv64.net` where the label is 1-63 letters, digits or hyphens,
/// starting and ending with a letter or digit
pub fn is_valid_domain(domain: &str) -> bool {
    let Some(label) = domain.strip_suffix(IPV64_DOMAIN_SUFFIX) else {
        return false;
    };

    !label.is_empty()
        && label.len() <= 63
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

pub fn is_valid_api_key(api_key: &str) -> bool {
    !api_key.trim().is_empty()
}

/// Crontab entry refreshing the record every two hours
pub fn linux_cron_line(api_key: &str, domain: &str) -> String {
    format!(
        "# Add to crontab -e:\n0 */2 * * * curl -sSL \"{}\"",
        update_url(api_key, domain)
    )
}
