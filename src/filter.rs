//! Endpoint filter: keeps only externally routable remote endpoints

use crate::connections::ConnectionRecord;

/// Remote addresses that never identify a real peer
pub const EXCLUDED_LITERALS: [&str; 4] = ["0.0.0.0", "127.0.0.1", "::", "::1"];

/// Literal unspecified/loopback spellings
pub fn is_excluded_literal(ip: &str) -> bool {
    EXCLUDED_LITERALS.contains(&ip)
}

/// Private or loopback IPv4 range check
///
/// Covers 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16 and 127.0.0.0/8. Only
/// the first two octets decide membership. Anything that is not four
/// dot-separated parts, or whose deciding parts are not integers, is *not*
/// private and therefore passes the filter. Integers of any size are
/// accepted, so `10.99999999999.0.1` is still private.
pub fn is_private_ip(ip: &str) -> bool {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 || !is_integer(parts[0]) || !is_integer(parts[1]) {
        return false;
    }

    // Out-of-range integers are valid but match no range.
    let first = parts[0].parse::<u32>().ok();
    let second = parts[1].parse::<u32>().ok();
    match (first, second) {
        (Some(10 | 127), _) => true,
        (Some(172), Some(second)) => (16..=31).contains(&second),
        (Some(192), Some(second)) => second == 168,
        _ => false,
    }
}

/// Optionally signed run of ASCII digits, of any length
fn is_integer(part: &str) -> bool {
    let digits = part.strip_prefix(&['+', '-'][..]).unwrap_or(part);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Whether a connection's remote end is eligible for geolocation
pub fn is_external(record: &ConnectionRecord) -> bool {
    !is_excluded_literal(&record.remote_ip) && !is_private_ip(&record.remote_ip)
}

/// Keep external connections, order preserved
pub fn filter_external(records: Vec<ConnectionRecord>) -> Vec<ConnectionRecord> {
    let before = records.len();
    let kept: Vec<ConnectionRecord> = records.into_iter().filter(is_external).collect();
    log::debug!(
        "Endpoint filter kept {} of {} connections",
        kept.len(),
        before
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::Protocol;

    fn record(remote_ip: &str) -> ConnectionRecord {
        ConnectionRecord {
            protocol: Protocol::Tcp,
            local_ip: "10.0.0.5".into(),
            local_port: 51000,
            remote_ip: remote_ip.into(),
            remote_port: 443,
            state: "ESTABLISHED".into(),
        }
    }

    #[test]
    fn test_private_ranges() {
        for ip in [
            "10.0.0.1",
            "10.255.255.255",
            "172.16.0.1",
            "172.20.10.4",
            "172.31.255.255",
            "192.168.0.1",
            "192.168.255.254",
            "127.0.0.1",
            "127.8.9.10",
        ] {
            assert!(is_private_ip(ip), "{} should be private", ip);
        }
    }

    #[test]
    fn test_public_addresses() {
        for ip in [
            "8.8.8.8",
            "93.184.216.34",
            "172.15.0.1",
            "172.32.0.1",
            "192.169.1.1",
            "11.0.0.1",
            "1.1.1.1",
        ] {
            assert!(!is_private_ip(ip), "{} should not be private", ip);
        }
    }

    #[test]
    fn test_malformed_is_not_private() {
        assert!(!is_private_ip("::1"));
        assert!(!is_private_ip("10.0.0"));
        assert!(!is_private_ip("10.0.0.0.1"));
        assert!(!is_private_ip("ab.cd.0.1"));
        assert!(!is_private_ip("10.ab.0.1"));
        assert!(!is_private_ip("99999999999.0.0.1"));
        assert!(!is_private_ip(""));
    }

    #[test]
    fn test_oversized_second_part() {
        assert!(is_private_ip("10.99999999999.0.1"));
        assert!(is_private_ip("127.99999999999.0.1"));
        assert!(!is_private_ip("172.99999999999.0.1"));
        assert!(!is_private_ip("192.99999999999.0.1"));
        assert!(is_private_ip("+10.0.0.1"));
    }

    #[test]
    fn test_literals_excluded() {
        for ip in EXCLUDED_LITERALS {
            assert!(!is_external(&record(ip)));
        }
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = vec![
            record("8.8.8.8"),
            record("192.168.1.1"),
            record("0.0.0.0"),
            record("1.1.1.1"),
            record("8.8.8.8"),
        ];
        let kept = filter_external(records);
        let ips: Vec<&str> = kept.iter().map(|r| r.remote_ip.as_str()).collect();
        assert_eq!(ips, vec!["8.8.8.8", "1.1.1.1", "8.8.8.8"]);
    }
}
