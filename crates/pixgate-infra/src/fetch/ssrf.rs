//! SSRF (Server-Side Request Forgery) protection for image URLs.
//!
//! Image URLs come from catalog payloads and are not trusted. Before any request is
//! made, the URL is checked against the scheme rules, the optional host allowlist and
//! the private address ranges, including every address the hostname resolves to.
//! The client then connects through `PublicOnlyResolver`, so the addresses it dials
//! pass the same check as the ones inspected up front.

use std::error::Error as StdError;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::Url;
use tokio::net::lookup_host;

use super::FetchError;

#[derive(Debug, Clone, Default)]
pub struct UrlGuard {
    allow_private_ips: bool,
    allowlist: Option<Vec<String>>,
}

impl UrlGuard {
    pub fn new(allow_private_ips: bool, allowlist: Option<Vec<String>>) -> Self {
        Self {
            allow_private_ips,
            allowlist: allowlist.map(|hosts| hosts.into_iter().map(|h| h.to_lowercase()).collect()),
        }
    }

    pub fn allows_private_ips(&self) -> bool {
        self.allow_private_ips
    }

    /// Validate a URL and return it parsed.
    ///
    /// DNS resolution is part of the check so that a public-looking name pointing at an
    /// internal address is refused too.
    pub async fn check(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = self.check_static(url)?;

        if self.allow_private_ips {
            return Ok(parsed);
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl("URL must have a host".to_string()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        if host.parse::<IpAddr>().is_ok() {
            return Ok(parsed);
        }

        let port = parsed.port_or_known_default().unwrap_or(80);
        resolve_public(&host, port).await?;

        Ok(parsed)
    }

    /// Checks that need no network access. Also used on redirect targets.
    pub fn check_static(&self, url: &str) -> Result<Url, FetchError> {
        let parsed =
            Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl("URL must have a host".to_string()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_lowercase();

        if let Some(allowed) = &self.allowlist {
            let listed = allowed
                .iter()
                .any(|a| host == *a || host.ends_with(&format!(".{}", a)));
            if !listed {
                return Err(FetchError::Blocked(format!(
                    "host '{}' is not in the allowlist",
                    host
                )));
            }
        }

        if self.allow_private_ips {
            return Ok(parsed);
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            if is_private_ip(&ip) {
                return Err(FetchError::Blocked(format!("private address {}", ip)));
            }
        }

        if host == "localhost"
            || host.ends_with(".localhost")
            || host.ends_with(".local")
            || host.ends_with(".internal")
            || host.ends_with(".corp")
        {
            return Err(FetchError::Blocked(format!("internal hostname '{}'", host)));
        }

        Ok(parsed)
    }
}

/// Resolve `host` and refuse it if any of its addresses is private.
pub(crate) async fn resolve_public(host: &str, port: u16) -> Result<Vec<SocketAddr>, FetchError> {
    let resolved: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| {
            tracing::warn!(host = %host, error = %e, "DNS resolution failed for image host");
            FetchError::Connect(format!("could not resolve {}: {}", host, e))
        })?
        .collect();

    if let Some(addr) = resolved.iter().find(|addr| is_private_ip(&addr.ip())) {
        return Err(FetchError::Blocked(format!(
            "{} resolves to private address {}",
            host,
            addr.ip()
        )));
    }

    Ok(resolved)
}

/// DNS resolver for the fetch client that only hands out public addresses.
///
/// A name that resolved to a public address during `UrlGuard::check` cannot be
/// rebound to an internal one for the actual connection, since the connection
/// resolves through this check again.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        let lookup = async move {
            let addrs = resolve_public(&host, 0)
                .await
                .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<Addrs, Box<dyn StdError + Send + Sync>>(addrs)
        };
        Box::pin(lookup)
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            octets[0] == 10
                || (octets[0] == 172 && (16..=31).contains(&octets[1]))
                || (octets[0] == 192 && octets[1] == 168)
                || (octets[0] == 100 && (64..=127).contains(&octets[1]))
                || octets[0] == 127
                || (octets[0] == 169 && octets[1] == 254)
                || octets[0] >= 224
                || octets[0] == 0
        }
        IpAddr::V6(ipv6) => {
            // ::ffff:x.x.x.x would otherwise slip past the v4 ranges
            if let Some(ipv4) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(ipv4));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
