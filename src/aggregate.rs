//! Port/service and country summaries over the external connection set

use crate::connections::{ConnectionRecord, Protocol};
use crate::geolocation::{LocationCache, UNKNOWN};
use crate::services::service_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Example IPs listed per port before the list is truncated
pub const MAX_EXAMPLE_IPS: usize = 5;

/// One connection occurrence grouped under its remote port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortServiceEntry {
    pub ip: String,
    pub service: String,
    pub protocol: Protocol,
    pub state: String,
}

/// Remote port to its connection occurrences in discovery order
pub type PortServices = BTreeMap<u16, Vec<PortServiceEntry>>;

/// A row of the "top ports" list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCount {
    pub port: u16,
    pub service: String,
    pub count: usize,
}

/// A row of the port summary table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSummary {
    pub port: u16,
    pub service: String,
    pub connection_count: usize,
    /// First unique IPs seen on this port, at most [`MAX_EXAMPLE_IPS`]
    pub example_ips: Vec<String>,
    /// Unique IPs left out of `example_ips`
    pub omitted_ips: usize,
}

impl PortSummary {
    /// `a, b, c ... and N more`
    pub fn ip_list(&self) -> String {
        let mut list = self.example_ips.join(", ");
        if self.omitted_ips > 0 {
            list.push_str(&format!(" ... and {} more", self.omitted_ips));
        }
        list
    }
}

/// Group connections by remote port
pub fn port_services(connections: &[ConnectionRecord]) -> PortServices {
    let mut grouped = PortServices::new();
    for conn in connections {
        grouped
            .entry(conn.remote_port)
            .or_default()
            .push(PortServiceEntry {
                ip: conn.remote_ip.clone(),
                service: service_name(conn.remote_port).to_string(),
                protocol: conn.protocol,
                state: conn.state.clone(),
            });
    }
    grouped
}

/// Connections per country; unresolved IPs count under `"Unknown"`
pub fn country_counts(
    connections: &[ConnectionRecord],
    locations: &LocationCache,
) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for conn in connections {
        let country = locations
            .get(&conn.remote_ip)
            .map(|loc| loc.country.as_str())
            .unwrap_or(UNKNOWN);
        *counts.entry(country.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Number of connections whose remote end is `ip`
pub fn ip_connection_count(connections: &[ConnectionRecord], ip: &str) -> usize {
    connections.iter().filter(|c| c.remote_ip == ip).count()
}

/// Distinct remote IPs in first-seen order
pub fn unique_remote_ips(connections: &[ConnectionRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    connections
        .iter()
        .filter(|c| seen.insert(c.remote_ip.as_str()))
        .map(|c| c.remote_ip.clone())
        .collect()
}

/// Aggregated view fed to the console summary and the report emitters
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    pub port_services: PortServices,
    pub country_counts: HashMap<String, usize>,
    pub total_connections: usize,
    pub unique_ips: usize,
}

impl Aggregates {
    pub fn build(connections: &[ConnectionRecord], locations: &LocationCache) -> Self {
        Self {
            port_services: port_services(connections),
            country_counts: country_counts(connections, locations),
            total_connections: connections.len(),
            unique_ips: unique_remote_ips(connections).len(),
        }
    }

    pub fn unique_ports(&self) -> usize {
        self.port_services.len()
    }

    /// Busiest ports, ties broken by port number
    pub fn top_ports(&self, n: usize) -> Vec<PortCount> {
        let mut ports: Vec<PortCount> = self
            .port_services
            .iter()
            .map(|(port, entries)| PortCount {
                port: *port,
                service: service_name(*port).to_string(),
                count: entries.len(),
            })
            .collect();
        ports.sort_by(|a, b| b.count.cmp(&a.count).then(a.port.cmp(&b.port)));
        ports.truncate(n);
        ports
    }

    /// Countries with most connections, ties broken by name
    pub fn top_countries(&self, n: usize) -> Vec<(String, usize)> {
        let mut countries: Vec<(String, usize)> = self
            .country_counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        countries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        countries.truncate(n);
        countries
    }

    /// One row per port, ascending
    pub fn port_summaries(&self) -> Vec<PortSummary> {
        self.port_services
            .iter()
            .map(|(port, entries)| {
                let mut seen = HashSet::new();
                let unique: Vec<&str> = entries
                    .iter()
                    .map(|e| e.ip.as_str())
                    .filter(|ip| seen.insert(*ip))
                    .collect();

                PortSummary {
                    port: *port,
                    service: service_name(*port).to_string(),
                    connection_count: entries.len(),
                    example_ips: unique
                        .iter()
                        .take(MAX_EXAMPLE_IPS)
                        .map(|ip| ip.to_string())
                        .collect(),
                    omitted_ips: unique.len().saturating_sub(MAX_EXAMPLE_IPS),
                }
            })
            .collect()
    }
}
