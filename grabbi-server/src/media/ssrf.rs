//! Outbound URL validation for remote image fetches
//!
//! A URL passes only if its scheme is http(s), its host is not `localhost`,
//! and every address the host resolves to is outside the reserved ranges.
//! The resolved addresses are returned so the caller can pin its connection
//! to exactly what was checked.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use thiserror::Error;
use url::{Host, Url};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SsrfError {
    #[error("{url}: invalid URL ({reason})")]
    InvalidUrl { url: String, reason: String },

    #[error("{url}: scheme '{scheme}' is not allowed")]
    Scheme { url: String, scheme: String },

    #[error("{url}: missing host")]
    MissingHost { url: String },

    #[error("{url}: localhost is not allowed")]
    Localhost { url: String },

    #[error("{url}: resolves to reserved address {ip}")]
    ReservedAddress { url: String, ip: IpAddr },

    #[error("{url}: host lookup failed ({reason})")]
    Resolution { url: String, reason: String },
}

/// DNS seam so validation can be exercised without network access
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>>;
}

/// System resolver
pub struct DnsResolver;

#[async_trait]
impl HostResolver for DnsResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// A URL that passed validation, with the addresses that were checked
#[derive(Debug, Clone)]
pub struct ValidatedUrl {
    pub url: Url,
    pub host: String,
    pub addrs: Vec<SocketAddr>,
}

fn is_reserved_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || a == 127
        || (a == 169 && b == 254)
        || a == 0
}

fn is_reserved_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_reserved_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

pub fn is_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_reserved_v4(v4),
        IpAddr::V6(v6) => is_reserved_v6(v6),
    }
}

pub async fn validate_url(raw: &str, resolver: &dyn HostResolver) -> Result<ValidatedUrl, SsrfError> {
    let url = Url::parse(raw).map_err(|e| SsrfError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SsrfError::Scheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let (host, ips) = match url.host() {
        None => {
            return Err(SsrfError::MissingHost {
                url: raw.to_string(),
            });
        }
        Some(Host::Domain(domain)) => {
            if domain.is_empty() {
                return Err(SsrfError::MissingHost {
                    url: raw.to_string(),
                });
            }
            let trimmed = domain.trim_end_matches('.');
            if trimmed.eq_ignore_ascii_case("localhost") {
                return Err(SsrfError::Localhost {
                    url: raw.to_string(),
                });
            }
            let ips = resolver
                .resolve(domain, port)
                .await
                .map_err(|e| SsrfError::Resolution {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })?;
            (domain.to_string(), ips)
        }
        Some(Host::Ipv4(ip)) => (ip.to_string(), vec![IpAddr::V4(ip)]),
        Some(Host::Ipv6(ip)) => (ip.to_string(), vec![IpAddr::V6(ip)]),
    };

    if ips.is_empty() {
        return Err(SsrfError::Resolution {
            url: raw.to_string(),
            reason: "no addresses".into(),
        });
    }
    if let Some(ip) = ips.iter().copied().find(|ip| is_reserved(*ip)) {
        tracing::warn!(url = %raw, ip = %ip, "Rejected outbound URL resolving to reserved address");
        return Err(SsrfError::ReservedAddress {
            url: raw.to_string(),
            ip,
        });
    }

    Ok(ValidatedUrl {
        url,
        host,
        addrs: ips.into_iter().map(|ip| SocketAddr::new(ip, port)).collect(),
    })
}
