//! Well-known remote port to service name table

/// Name used for any port missing from the table
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Look up the fixed service name for a port
pub fn known_service(port: u16) -> Option<&'static str> {
    let name = match port {
        20 => "FTP Data",
        21 => "FTP",
        22 => "SSH",
        23 => "Telnet",
        25 => "SMTP",
        53 => "DNS",
        80 => "HTTP",
        110 => "POP3",
        143 => "IMAP",
        443 => "HTTPS",
        445 => "SMB",
        3306 => "MySQL",
        3389 => "RDP",
        5432 => "PostgreSQL",
        6379 => "Redis",
        8080 => "HTTP-Proxy",
        8443 => "HTTPS-Alt",
        9200 => "Elasticsearch",
        27015 => "Steam",
        27017 => "MongoDB",
        _ => return None,
    };
    Some(name)
}

/// Service name for a port, `"Unknown"` when not in the table
pub fn service_name(port: u16) -> &'static str {
    known_service(port).unwrap_or(UNKNOWN_SERVICE)
}
