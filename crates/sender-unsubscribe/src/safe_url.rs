//! SSRF checks for outbound unsubscribe requests.
//!
//! Unsubscribe links come from untrusted mail, so every URL we are about to
//! request (including each redirect target) must point at a public host.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Hostname suffixes that only resolve inside private networks.
const INTERNAL_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".home.arpa"];

/// Check if an IP address is private/internal.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            // Private ranges per RFC 1918
            ipv4.is_private()
                // Loopback (127.0.0.0/8)
                || ipv4.is_loopback()
                // Link-local (169.254.0.0/16) - includes cloud metadata services
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                // Documentation ranges (192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24)
                || ipv4.is_documentation()
                || ipv4.is_multicast()
                // "This network" (0.0.0.0/8)
                || octets[0] == 0
                // Shared address space (100.64.0.0/10) - RFC 6598
                || (octets[0] == 100 && (octets[1] & 0xC0) == 64)
                // Benchmarking (198.18.0.0/15)
                || (octets[0] == 198 && (octets[1] & 0xFE) == 18)
                // IETF protocol assignments (192.0.0.0/24)
                || (octets[0] == 192 && octets[1] == 0 && octets[2] == 0)
                // Reserved (240.0.0.0/4)
                || octets[0] >= 240
                || *ipv4 == Ipv4Addr::new(169, 254, 169, 254)
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                // Mapped, compatible, NAT64 and 6to4 forms - check the embedded IPv4
                || embedded_ipv4(ipv6)
                    .map(|v4| is_private_ip(&IpAddr::V4(v4)))
                    .unwrap_or(false)
                // Unique local addresses (fc00::/7) - RFC 4193
                || (first & 0xFE00) == 0xFC00
                // Link-local (fe80::/10)
                || (first & 0xFFC0) == 0xFE80
                // Documentation (2001:db8::/32)
                || (first == 0x2001 && ipv6.segments()[1] == 0x0DB8)
        }
    }
}

/// IPv4 address carried inside an IPv6 address, if any.
fn embedded_ipv4(ipv6: &Ipv6Addr) -> Option<Ipv4Addr> {
    let seg = ipv6.segments();
    let low = |hi: u16, lo: u16| Ipv4Addr::new((hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8);

    if let Some(v4) = ipv6.to_ipv4_mapped() {
        return Some(v4);
    }
    match seg {
        // IPv4-compatible (::/96)
        [0, 0, 0, 0, 0, 0, hi, lo] => Some(low(hi, lo)),
        // NAT64 well-known prefix (64:ff9b::/96)
        [0x64, 0xff9b, 0, 0, 0, 0, hi, lo] => Some(low(hi, lo)),
        // 6to4 (2002::/16)
        [0x2002, hi, lo, ..] => Some(low(hi, lo)),
        _ => None,
    }
}

fn is_internal_hostname(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();

    if domain.is_empty() || domain == "localhost" {
        return true;
    }

    if INTERNAL_SUFFIXES.iter().any(|suffix| domain.ends_with(suffix)) {
        return true;
    }

    // Single-label names only resolve through local search domains.
    !domain.contains('.')
}

/// Whether `url` is an http(s) URL pointing at a public, external host.
///
/// Works on the URL alone; no DNS lookup is made. IP literals are checked
/// directly, including bracketed IPv6 and the numeric IPv4 spellings the
/// URL parser normalizes (`http://2130706433/` is `127.0.0.1`).
pub fn is_safe_external_http_url(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match url.host() {
        Some(Host::Ipv4(ip)) => !is_private_ip(&IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => !is_private_ip(&IpAddr::V6(ip)),
        Some(Host::Domain(domain)) => !is_internal_hostname(domain),
        None => false,
    }
}

/// Parse `raw` and return it only if it passes [`is_safe_external_http_url`].
pub fn parse_safe_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    is_safe_external_http_url(&url).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safe(raw: &str) -> bool {
        parse_safe_url(raw).is_some()
    }

    #[test]
    fn test_is_private_ip_v4() {
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(100, 64, 0, 1))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))));
        assert!(is_private_ip(&IpAddr::V4(Ipv4Addr::new(198, 18, 0, 1))));

        assert!(!is_private_ip(&IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
        assert!(!is_private_ip(&IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))));
        assert!(!is_private_ip(&IpAddr::V4(Ipv4Addr::new(100, 128, 0, 1))));
    }

    #[test]
    fn test_is_private_ip_v6() {
        assert!(is_private_ip(&IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_private_ip(&IpAddr::V6(Ipv6Addr::UNSPECIFIED)));
        assert!(is_private_ip(&IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 1))));
        assert!(is_private_ip(&IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1))));
        // ::ffff:127.0.0.1
        assert!(is_private_ip(&IpAddr::V6(Ipv4Addr::new(127, 0, 0, 1).to_ipv6_mapped())));

        assert!(!is_private_ip(&IpAddr::V6(Ipv6Addr::new(
            0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888
        ))));
    }

    #[test]
    fn test_public_urls_are_safe() {
        assert!(safe("https://example.com/unsubscribe?id=1"));
        assert!(safe("http://list.example.org/u/abc"));
        assert!(safe("https://8.8.8.8/unsubscribe"));
        assert!(safe("https://[2001:4860:4860::8888]/unsubscribe"));
        assert!(safe("https://example.com./trailing-dot"));
    }

    #[test]
    fn test_internal_urls_are_rejected() {
        assert!(!safe("http://127.0.0.1/unsubscribe"));
        assert!(!safe("http://localhost:8080/unsubscribe"));
        assert!(!safe("http://LOCALHOST/unsubscribe"));
        assert!(!safe("http://api.localhost/unsubscribe"));
        assert!(!safe("http://printer.local/unsubscribe"));
        assert!(!safe("http://metadata.google.internal/computeMetadata"));
        assert!(!safe("http://169.254.169.254/latest/meta-data/"));
        assert!(!safe("http://10.1.2.3/u"));
        assert!(!safe("http://192.168.0.10/u"));
        assert!(!safe("http://[::1]/u"));
        assert!(!safe("http://[::ffff:127.0.0.1]/u"));
        assert!(!safe("http://[fd12:3456::1]/u"));
        assert!(!safe("http://intranet/u"));
    }

    #[test]
    fn test_embedded_private_ipv4_is_rejected() {
        assert!(!safe("http://[::127.0.0.1]/u"));
        assert!(!safe("http://[64:ff9b::7f00:1]/u"));
        assert!(!safe("http://[64:ff9b::a00:1]/u"));
        assert!(!safe("http://[2002:c0a8:0101::1]/u"));
        assert!(!safe("http://240.0.0.1/u"));
        assert!(!safe("http://255.255.255.255/u"));

        // Embedded public addresses stay usable.
        assert!(safe("http://[64:ff9b::808:808]/u"));
        assert!(safe("http://[2002:808:808::1]/u"));
    }

    #[test]
    fn test_numeric_ipv4_spellings_are_rejected() {
        assert!(!safe("http://2130706433/u"));
        assert!(!safe("http://0x7f000001/u"));
        assert!(!safe("http://0/u"));
    }

    #[test]
    fn test_non_http_schemes_are_rejected() {
        assert!(!safe("mailto:unsubscribe@example.com"));
        assert!(!safe("ftp://example.com/file"));
        assert!(!safe("file:///etc/passwd"));
        assert!(!safe("javascript:alert(1)"));
        assert!(!safe("not a url"));
        assert!(!safe(""));
    }
}
