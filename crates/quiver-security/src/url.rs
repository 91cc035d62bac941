use std::net::IpAddr;

use rustc_hash::FxHashSet;
use url::{Host, Url};

use crate::SecurityError;

/// The host allowlist and scheme policy applied to every resource URL.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    allowed_hosts: FxHashSet<String>,
    allow_insecure: bool,
}

impl UrlPolicy {
    /// Hosts that are always allowed, before any configured additions.
    pub const BUILTIN_HOSTS: [&'static str; 2] = ["raw.githubusercontent.com", "github.com"];

    /// The production policy: https only, hosts limited to the built-in set
    /// plus `extra_hosts` from configuration.
    pub fn strict<I, S>(extra_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_hosts = Self::BUILTIN_HOSTS
            .iter()
            .map(|host| (*host).to_string())
            .chain(
                extra_hosts
                    .into_iter()
                    .map(|host| host.as_ref().trim().to_ascii_lowercase())
                    .filter(|host| !host.is_empty()),
            )
            .collect();
        Self {
            allowed_hosts,
            allow_insecure: false,
        }
    }

    /// A policy that accepts any host and plain http, including loopback
    /// addresses. Intended for tests that stand up a local server.
    pub fn permissive() -> Self {
        Self {
            allowed_hosts: FxHashSet::default(),
            allow_insecure: true,
        }
    }

    fn allows_host(&self, host: &str) -> bool {
        self.allowed_hosts.contains(&host.to_ascii_lowercase())
    }
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self::strict(std::iter::empty::<&str>())
    }
}

/// Validate `url` against `policy`: scheme, host allowlist, and address
/// class.
///
/// Literal IP hosts are classified so that loopback, link-local, and
/// private-range addresses are called out explicitly; resolution of domain
/// names is deferred to connect time, where the transport re-applies the
/// same classification.
pub fn validate_url(url: &Url, policy: &UrlPolicy) -> Result<(), SecurityError> {
    let unsafe_url = |reason: String| SecurityError::UnsafeUrl {
        url: url.to_string(),
        reason,
    };

    if policy.allow_insecure {
        return match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(unsafe_url(format!("unsupported scheme `{scheme}`"))),
        };
    }

    if url.scheme() != "https" {
        return Err(unsafe_url(format!(
            "scheme must be `https`, not `{}`",
            url.scheme()
        )));
    }

    match url.host() {
        Some(Host::Domain(domain)) => {
            if policy.allows_host(domain) {
                Ok(())
            } else {
                Err(unsafe_url(format!("host `{domain}` is not allowlisted")))
            }
        }
        Some(Host::Ipv4(addr)) => Err(unsafe_url(classify_ip(IpAddr::V4(addr)))),
        Some(Host::Ipv6(addr)) => Err(unsafe_url(classify_ip(IpAddr::V6(addr)))),
        None => Err(unsafe_url("URL has no host".to_string())),
    }
}

fn classify_ip(addr: IpAddr) -> String {
    let class = match addr {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                "loopback"
            } else if v4.is_link_local() {
                "link-local"
            } else if v4.is_private() {
                "private-range"
            } else {
                "literal IP"
            }
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                "loopback"
            } else if (v6.segments()[0] & 0xffc0) == 0xfe80 {
                "link-local"
            } else if (v6.segments()[0] & 0xfe00) == 0xfc00 {
                "private-range"
            } else {
                "literal IP"
            }
        }
    };
    format!("{class} address `{addr}` is not allowed")
}
