//! URL Guard: lexical SSRF checks run on every URL before it is fetched.
//!
//! Validation is purely syntactic. No DNS lookups are made, so a hostname that
//! resolves to a private address is not caught here.

use std::net::{IpAddr, Ipv4Addr};

use ipnet::IpNet;
use thiserror::Error;
use url::{Host, Url};

// ── Block-lists ────────────────────────────────────────────────────────────

const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "0.0.0.0",
    "[::1]",
    "metadata.google.internal",
    "metadata",
];

/// Private and reserved ranges, in match order.
const BLOCKED_RANGES: &[&str] = &[
    "127.0.0.0/8",    // loopback
    "10.0.0.0/8",     // RFC1918
    "172.16.0.0/12",  // RFC1918
    "192.168.0.0/16", // RFC1918
    "169.254.0.0/16", // link-local, cloud metadata
    "0.0.0.0/8",      // current network
    "100.64.0.0/10",  // shared address space
    "198.18.0.0/16",  // benchmark
    "::1/128",
    "::/128",
    "fc00::/7",
    "fe80::/10",
];

const METADATA_ADDRS: &[IpAddr] = &[IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254))];

/// Hostname literals and address ranges the guard refuses.
///
/// Built once at startup and shared read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct Blocklists {
    hostnames: Vec<String>,
    ranges: Vec<IpNet>,
    metadata_addrs: Vec<IpAddr>,
}

impl Blocklists {
    pub fn standard() -> Self {
        Blocklists {
            hostnames: BLOCKED_HOSTNAMES.iter().map(|h| h.to_string()).collect(),
            ranges: BLOCKED_RANGES
                .iter()
                .filter_map(|cidr| cidr.parse::<IpNet>().ok())
                .collect(),
            metadata_addrs: METADATA_ADDRS.to_vec(),
        }
    }

    /// Drop one range from the list. The metadata literal check is unaffected.
    pub fn without_range(mut self, range: IpNet) -> Self {
        self.ranges.retain(|r| *r != range);
        self
    }

    pub fn ranges(&self) -> &[IpNet] {
        &self.ranges
    }

    fn is_blocked_hostname(&self, hostname: &str) -> bool {
        self.hostnames.iter().any(|h| h == hostname)
    }

    /// IPv4-mapped IPv6 addresses are checked against the IPv4 ranges too.
    fn in_blocked_range(&self, ip: IpAddr) -> bool {
        if self.ranges.iter().any(|r| r.contains(&ip)) {
            return true;
        }
        match ip {
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .is_some_and(|v4| self.in_blocked_range(IpAddr::V4(v4))),
            IpAddr::V4(_) => false,
        }
    }

    fn is_metadata_addr(&self, ip: IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            v4 => v4,
        };
        self.metadata_addrs.contains(&ip)
    }
}

impl Default for Blocklists {
    fn default() -> Self {
        Self::standard()
    }
}

// ── Results ────────────────────────────────────────────────────────────────

/// Why the guard refused a URL. The display text is safe to show to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("invalid format")]
    InvalidFormat,
    #[error("scheme not allowed")]
    SchemeNotAllowed,
    #[error("hostname not allowed")]
    HostnameNotAllowed,
    #[error("invalid IP address")]
    InvalidIpAddress,
    #[error("private IP not allowed")]
    PrivateIpNotAllowed,
    #[error("metadata endpoint not allowed")]
    MetadataEndpointNotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub error_reason: Option<Rejection>,
}

impl From<Result<Url, Rejection>> for ValidationResult {
    fn from(result: Result<Url, Rejection>) -> Self {
        match result {
            Ok(_) => ValidationResult {
                valid: true,
                error_reason: None,
            },
            Err(reason) => ValidationResult {
                valid: false,
                error_reason: Some(reason),
            },
        }
    }
}

// ── Guard ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct UrlGuard {
    blocklists: Blocklists,
}

impl UrlGuard {
    pub fn new(blocklists: Blocklists) -> Self {
        UrlGuard { blocklists }
    }

    pub fn validate(&self, input: &str) -> ValidationResult {
        self.check(input).into()
    }

    /// Validate `input` and hand back the parsed URL that passed.
    ///
    /// Checks run in a fixed order and stop at the first failure: format,
    /// scheme, hostname literal, dotted-quad syntax, private ranges, metadata
    /// address.
    pub fn check(&self, input: &str) -> Result<Url, Rejection> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Rejection::InvalidFormat);
        }

        let url = match Url::parse(input) {
            Ok(url) => url,
            // The parser refuses numeric hosts with out-of-range parts before
            // we ever see them, so classify those from the raw text.
            Err(url::ParseError::InvalidIpv4Address) => return Err(reject_raw_ipv4(input)),
            Err(_) => return Err(Rejection::InvalidFormat),
        };

        if !is_allowed_scheme(url.scheme()) {
            return Err(Rejection::SchemeNotAllowed);
        }

        let hostname = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(Rejection::InvalidFormat)?
            .to_ascii_lowercase();
        // `localhost.` names the same host as `localhost`.
        let hostname = hostname.trim_end_matches('.');

        if self.blocklists.is_blocked_hostname(hostname) {
            return Err(Rejection::HostnameNotAllowed);
        }

        if let Some(DottedQuad::OutOfRange) = parse_dotted_quad(hostname) {
            return Err(Rejection::InvalidIpAddress);
        }

        let ip = match url.host() {
            Some(Host::Ipv4(v4)) => Some(IpAddr::V4(v4)),
            Some(Host::Ipv6(v6)) => Some(IpAddr::V6(v6)),
            // `10.0.0.1.nip.io` style names carry the address in their leading labels.
            Some(Host::Domain(_)) => leading_dotted_quad(hostname).map(IpAddr::V4),
            None => None,
        };

        if let Some(ip) = ip {
            if self.blocklists.in_blocked_range(ip) {
                return Err(Rejection::PrivateIpNotAllowed);
            }
            if self.blocklists.is_metadata_addr(ip) {
                return Err(Rejection::MetadataEndpointNotAllowed);
            }
        }

        Ok(url)
    }
}

fn is_allowed_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

#[derive(Debug, PartialEq, Eq)]
enum DottedQuad {
    Valid(Ipv4Addr),
    OutOfRange,
}

/// Four dot-separated groups of one to three digits. `None` when the text is
/// not shaped like a dotted-quad at all.
fn parse_dotted_quad(host: &str) -> Option<DottedQuad> {
    let groups: Vec<&str> = host.split('.').collect();
    if groups.len() != 4
        || !groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut octets = [0u8; 4];
    for (slot, group) in octets.iter_mut().zip(&groups) {
        match group.parse::<u16>() {
            Ok(n) if n <= 255 => *slot = n as u8,
            _ => return Some(DottedQuad::OutOfRange),
        }
    }
    Some(DottedQuad::Valid(Ipv4Addr::from(octets)))
}

fn leading_dotted_quad(domain: &str) -> Option<Ipv4Addr> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 4 {
        return None;
    }
    match parse_dotted_quad(&labels[..4].join("."))? {
        DottedQuad::Valid(v4) => Some(v4),
        DottedQuad::OutOfRange => None,
    }
}

fn reject_raw_ipv4(input: &str) -> Rejection {
    let Some((scheme, host)) = split_scheme_and_host(input) else {
        return Rejection::InvalidFormat;
    };
    if !is_allowed_scheme(scheme) {
        return Rejection::SchemeNotAllowed;
    }
    match parse_dotted_quad(&host) {
        Some(DottedQuad::OutOfRange) => Rejection::InvalidIpAddress,
        _ => Rejection::InvalidFormat,
    }
}

/// Lexical `scheme://[userinfo@]host[:port]` split used only when the URL
/// parser has already given up.
fn split_scheme_and_host(input: &str) -> Option<(&str, String)> {
    let (scheme, rest) = input.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?;
    Some((scheme, host.to_ascii_lowercase()))
}

// ── Unit tests ─────────────────────────────────────────────────────────────
