//! Connection records parsed from `netstat -an` output
//!
//! Each row of interest looks like
//! `TCP    10.0.0.5:51000    93.184.216.34:443    ESTABLISHED`. Headers, IPv6
//! rows, `*:*` UDP listeners and anything else that does not match the row
//! pattern are skipped without error.
//!
//! # Examples
//!
//! ```
//! use netstatwiz::connections::{parse_lines, Protocol};
//!
//! let lines = [
//!     "Active Connections",
//!     "  TCP    10.0.0.5:51000    93.184.216.34:443    ESTABLISHED",
//! ];
//! let records = parse_lines(lines);
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].protocol, Protocol::Tcp);
//! assert_eq!(records[0].remote_port, 443);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static ROW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<proto>TCP|UDP)\s+(?P<local_ip>\d+\.\d+\.\d+\.\d+):(?P<local_port>\d+)\s+(?P<remote_ip>\d+\.\d+\.\d+\.\d+):(?P<remote_port>\d+)\s+(?P<state>\w+)",
    )
    .expect("row pattern is a valid regex")
});

/// Transport protocol of a connection row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// One row of the OS connection table
///
/// Addresses are kept as the dotted-quad text netstat printed; the row
/// pattern guarantees four numeric groups but not that each fits in an octet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub protocol: Protocol,
    pub local_ip: String,
    pub local_port: u16,
    pub remote_ip: String,
    pub remote_port: u16,
    /// Status token as printed (`ESTABLISHED`, `TIME_WAIT`, ...)
    pub state: String,
}

impl ConnectionRecord {
    /// `ip:port` of the local end
    pub fn local_address(&self) -> String {
        format!("{}:{}", self.local_ip, self.local_port)
    }

    /// `ip:port` of the remote end
    pub fn remote_address(&self) -> String {
        format!("{}:{}", self.remote_ip, self.remote_port)
    }
}

/// Parse a single netstat row; `None` for anything that is not a connection row
pub fn parse_line(line: &str) -> Option<ConnectionRecord> {
    let caps = ROW_PATTERN.captures(line)?;

    let protocol = match &caps["proto"] {
        "TCP" => Protocol::Tcp,
        "UDP" => Protocol::Udp,
        _ => return None,
    };
    // Digits that overflow a port number disqualify the row.
    let local_port = caps["local_port"].parse::<u16>().ok()?;
    let remote_port = caps["remote_port"].parse::<u16>().ok()?;

    Some(ConnectionRecord {
        protocol,
        local_ip: caps["local_ip"].to_string(),
        local_port,
        remote_ip: caps["remote_ip"].to_string(),
        remote_port,
        state: caps["state"].to_string(),
    })
}

/// Parse every connection row, preserving input order and duplicates
pub fn parse_lines<I, S>(lines: I) -> Vec<ConnectionRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let records: Vec<ConnectionRecord> = lines
        .into_iter()
        .filter_map(|line| {
            let parsed = parse_line(line.as_ref());
            if parsed.is_none() {
                log::trace!("Skipping non-connection line: {:?}", line.as_ref());
            }
            parsed
        })
        .collect();

    log::debug!("Parsed {} connection rows", records.len());
    records
}
