//! Pipeline driver: source → parser → filter → resolver → aggregator → emitters
//!
//! [`NetStatWiz`] owns the connection set and the location cache for exactly
//! one run. Each step is a separate call so the caller can report progress
//! between them.

use crate::aggregate::{unique_remote_ips, Aggregates};
use crate::config::Config;
use crate::connections::{parse_lines, ConnectionRecord};
use crate::error::Result;
use crate::filter::filter_external;
use crate::geolocation::{GeoProvider, GeoResolver, IpApiProvider, LocationCache, LocationInfo};
use crate::report::{emit_map, emit_tables, EmitOutcome, MapReport};
use crate::source::{ConnectionSource, NetstatSource};

/// One analysis run
pub struct NetStatWiz<S: ConnectionSource, P: GeoProvider> {
    config: Config,
    source: S,
    resolver: GeoResolver<P>,
    connections: Vec<ConnectionRecord>,
}

impl NetStatWiz<NetstatSource, IpApiProvider> {
    /// `netstat` plus ip-api.com, as configured
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let source = NetstatSource::from_config(&config.source);
        let provider = IpApiProvider::new(&config.geolocation)?;
        Ok(Self::new(config, source, provider))
    }
}

impl<S: ConnectionSource, P: GeoProvider> NetStatWiz<S, P> {
    pub fn new(config: Config, source: S, provider: P) -> Self {
        let resolver = GeoResolver::new(provider, config.geolocation.request_delay());
        Self {
            config,
            source,
            resolver,
            connections: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch, parse and filter the connection table
    pub fn collect(&mut self) -> &[ConnectionRecord] {
        let lines = self.source.fetch_lines();
        let parsed = parse_lines(&lines);
        log::info!(
            "{} of {} lines are connection rows",
            parsed.len(),
            lines.len()
        );
        self.connections = filter_external(parsed);
        &self.connections
    }

    /// External connections found by the last [`collect`](Self::collect)
    pub fn connections(&self) -> &[ConnectionRecord] {
        &self.connections
    }

    /// Distinct remote IPs in discovery order
    pub fn unique_ips(&self) -> Vec<String> {
        unique_remote_ips(&self.connections)
    }

    pub fn resolve(&mut self, ip: &str) -> Option<&LocationInfo> {
        self.resolver.resolve(ip)
    }

    /// Resolve every unique remote IP in order, one at a time
    ///
    /// `progress` is called with the 1-based position, the total and the IP
    /// before each resolution. Returns how many IPs have a known location.
    pub fn resolve_all<F>(&mut self, mut progress: F) -> usize
    where
        F: FnMut(usize, usize, &str),
    {
        let ips = self.unique_ips();
        let total = ips.len();
        for (i, ip) in ips.iter().enumerate() {
            progress(i + 1, total, ip);
            self.resolver.resolve(ip);
        }
        let resolved = ips.iter().filter(|ip| self.resolver.get(ip).is_some()).count();
        log::info!("Resolved {} of {} unique IPs", resolved, total);
        resolved
    }

    pub fn locations(&self) -> &LocationCache {
        self.resolver.cache()
    }

    /// Provider requests issued this run
    pub fn lookups_performed(&self) -> usize {
        self.resolver.request_count()
    }

    pub fn aggregates(&self) -> Aggregates {
        Aggregates::build(&self.connections, self.resolver.cache())
    }

    pub fn write_map(&self) -> MapReport {
        emit_map(
            &self.config.output.map_file,
            self.resolver.cache(),
            &self.connections,
        )
    }

    pub fn write_tables(&self, aggregates: &Aggregates) -> EmitOutcome {
        emit_tables(
            &self.config.output.tables_file,
            &self.connections,
            self.resolver.cache(),
            aggregates,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetStatError;
    use crate::geolocation::GeoResponse;
    use crate::source::StaticSource;
    use std::cell::Cell;

    /// Knows one address; everything else gets a `fail` status
    struct OneHitProvider {
        calls: Cell<usize>,
    }

    impl GeoProvider for OneHitProvider {
        fn lookup(&self, ip: &str) -> crate::error::Result<GeoResponse> {
            self.calls.set(self.calls.get() + 1);
            let body = if ip == "93.184.216.34" {
                r#"{"status":"success","country":"United States","regionName":"Massachusetts","city":"Norwell","lat":42.15,"lon":-70.82,"isp":"Edgecast","org":"EdgeCast Networks"}"#
            } else if ip == "198.51.100.20" {
                return Err(NetStatError::Timeout("lookup".into()));
            } else {
                r#"{"status":"fail","message":"invalid query"}"#
            };
            Ok(serde_json::from_str(body)?)
        }
    }

    fn test_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.geolocation.request_delay_ms = 0;
        config.output.map_file = dir.join("network_map.html");
        config.output.tables_file = dir.join("network_tables.html");
        config
    }

    fn wizard(
        dir: &std::path::Path,
        lines: &[&str],
    ) -> NetStatWiz<StaticSource, OneHitProvider> {
        NetStatWiz::new(
            test_config(dir),
            StaticSource::new(lines.iter().copied()),
            OneHitProvider { calls: Cell::new(0) },
        )
    }

    #[test]
    fn test_listening_row_filtered_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut wiz = wizard(
            dir.path(),
            &[
                "TCP    0.0.0.0:80    0.0.0.0:0    LISTENING",
                "TCP    10.0.0.5:51000    93.184.216.34:443    ESTABLISHED",
                "garbage line",
            ],
        );

        let conns = wiz.collect();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].remote_ip, "93.184.216.34");

        wiz.resolve_all(|_, _, _| {});
        let agg = wiz.aggregates();
        let https = &agg.port_services[&443];
        assert_eq!(https.len(), 1);
        assert_eq!(https[0].service, "HTTPS");
        assert_eq!(agg.country_counts["United States"], 1);
    }

    #[test]
    fn test_failed_lookup_counts_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let mut wiz = wizard(
            dir.path(),
            &[
                "TCP 10.0.0.5:51000 203.0.113.9:443 ESTABLISHED",
                "TCP 10.0.0.5:51001 198.51.100.20:80 ESTABLISHED",
            ],
        );
        wiz.collect();

        let mut seen = Vec::new();
        let resolved = wiz.resolve_all(|i, n, ip| seen.push((i, n, ip.to_string())));
        assert_eq!(resolved, 0);
        assert_eq!(
            seen,
            vec![
                (1, 2, "203.0.113.9".to_string()),
                (2, 2, "198.51.100.20".to_string())
            ]
        );
        assert!(wiz.locations().is_empty());
        assert_eq!(wiz.aggregates().country_counts["Unknown"], 2);
    }

    #[test]
    fn test_each_unique_ip_looked_up_once() {
        let dir = tempfile::tempdir().unwrap();
        let row = "TCP 10.0.0.5:51000 93.184.216.34:443 ESTABLISHED";
        let mut wiz = wizard(dir.path(), &[row, row, row]);
        wiz.collect();
        assert_eq!(wiz.connections().len(), 3);

        wiz.resolve_all(|_, _, _| {});
        wiz.resolve("93.184.216.34");
        assert_eq!(wiz.lookups_performed(), 1);
        assert_eq!(wiz.unique_ips(), vec!["93.184.216.34"]);
    }

    #[test]
    fn test_reports_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut wiz = wizard(
            dir.path(),
            &["TCP 10.0.0.5:51000 93.184.216.34:443 ESTABLISHED"],
        );
        wiz.collect();
        wiz.resolve_all(|_, _, _| {});

        let map = wiz.write_map();
        assert!(map.outcome.is_primary());
        assert_eq!(map.markers, 1);

        let agg = wiz.aggregates();
        let tables = wiz.write_tables(&agg);
        assert!(tables.is_primary());
        assert!(dir.path().join("network_map.html").exists());
        assert!(dir.path().join("network_tables.html").exists());
    }

    #[test]
    fn test_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut wiz = wizard(dir.path(), &[]);
        assert!(wiz.collect().is_empty());
        assert_eq!(wiz.resolve_all(|_, _, _| {}), 0);
        assert_eq!(wiz.aggregates().total_connections, 0);
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = Config::default();
        config.geolocation.request_delay_ms = 10;
        assert!(NetStatWiz::from_config(config).is_err());
    }
}
