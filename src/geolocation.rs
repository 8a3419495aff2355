//! IP geolocation with a run-scoped cache
//!
//! [`GeoResolver`] answers repeated queries for the same address from its
//! cache and throttles every cache miss with a fixed delay, so a run never
//! exceeds the provider's request ceiling (45 requests/minute for ip-api.com).
//! Failed lookups are logged and left out of the cache.
//!
//! # Examples
//!
//! ```no_run
//! use netstatwiz::config::GeolocationConfig;
//! use netstatwiz::geolocation::{GeoResolver, IpApiProvider};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GeolocationConfig::default();
//! let provider = IpApiProvider::new(&config)?;
//! let mut resolver = GeoResolver::new(provider, config.request_delay());
//!
//! if let Some(location) = resolver.resolve("93.184.216.34") {
//!     println!("{}, {}", location.city, location.country);
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::GeolocationConfig;
use crate::error::{NetStatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Field selection sent with every provider request
pub const LOOKUP_FIELDS: &str =
    "status,message,country,countryCode,region,regionName,city,lat,lon,isp,org,query";

/// Placeholder for any location string the provider did not return
pub const UNKNOWN: &str = "Unknown";

/// IP address string to resolved location
pub type LocationCache = HashMap<String, LocationInfo>;

/// Location metadata for one remote address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub ip: String,
    pub country: String,
    pub region: String,
    pub city: String,
    /// 0.0 when the provider gave no coordinate
    pub latitude: f64,
    /// 0.0 when the provider gave no coordinate
    pub longitude: f64,
    pub isp: String,
    pub org: String,
}

impl LocationInfo {
    /// Both coordinates present (neither is the 0.0 sentinel)
    pub fn has_coordinates(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }

    /// `city, region, country`
    pub fn place(&self) -> String {
        format!("{}, {}, {}", self.city, self.region, self.country)
    }
}

/// Raw provider answer; every field beyond `status` is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoResponse {
    #[serde(default)]
    pub status: String,
    pub message: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub isp: Option<String>,
    pub org: Option<String>,
    pub query: Option<String>,
}

impl GeoResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Convert a `success` answer into a [`LocationInfo`] for `ip`
    pub fn into_location(self, ip: &str) -> Result<LocationInfo> {
        if !self.is_success() {
            return Err(NetStatError::Lookup {
                ip: ip.to_string(),
                message: self.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        Ok(LocationInfo {
            ip: ip.to_string(),
            country: or_unknown(self.country),
            region: or_unknown(self.region_name),
            city: or_unknown(self.city),
            latitude: self.lat.unwrap_or(0.0),
            longitude: self.lon.unwrap_or(0.0),
            isp: or_unknown(self.isp),
            org: or_unknown(self.org),
        })
    }
}

/// A geolocation backend
pub trait GeoProvider {
    /// Query the provider once for `ip`
    fn lookup(&self, ip: &str) -> Result<GeoResponse>;
}

/// ip-api.com JSON endpoint client
pub struct IpApiProvider {
    endpoint: String,
    http_client: reqwest::blocking::Client,
}

impl IpApiProvider {
    pub fn new(config: &GeolocationConfig) -> Result<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| NetStatError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Request URL for `ip`
    pub fn url(&self, ip: &str) -> String {
        format!("{}/json/{}?fields={}", self.endpoint, ip, LOOKUP_FIELDS)
    }
}

impl GeoProvider for IpApiProvider {
    fn lookup(&self, ip: &str) -> Result<GeoResponse> {
        let url = self.url(ip);
        log::debug!("GET {}", url);

        let response = self.http_client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                NetStatError::Timeout(format!("lookup for {}: {}", ip, e))
            } else {
                NetStatError::Network(format!("Request for {} failed: {}", ip, e))
            }
        })?;

        if !response.status().is_success() {
            return Err(NetStatError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                ip
            )));
        }

        let body = response
            .text()
            .map_err(|e| NetStatError::Network(format!("Reading response for {}: {}", ip, e)))?;

        serde_json::from_str(&body)
            .map_err(|e| NetStatError::Parse(format!("Malformed response for {}: {}", ip, e)))
    }
}

/// Cached, throttled resolver
///
/// Lookups run one at a time on the caller's thread. The cache lives as long
/// as the resolver and is never invalidated.
pub struct GeoResolver<P: GeoProvider> {
    provider: P,
    delay: Duration,
    cache: LocationCache,
    requests: usize,
}

impl<P: GeoProvider> GeoResolver<P> {
    pub fn new(provider: P, delay: Duration) -> Self {
        Self {
            provider,
            delay,
            cache: LocationCache::new(),
            requests: 0,
        }
    }

    /// Cached location, or a fresh lookup after the throttle delay
    ///
    /// `None` means the location is unknown; the reason has been logged.
    pub fn resolve(&mut self, ip: &str) -> Option<&LocationInfo> {
        if self.cache.contains_key(ip) {
            log::trace!("Cache hit for {}", ip);
            return self.cache.get(ip);
        }

        match self.fetch(ip) {
            Ok(location) => Some(self.cache.entry(ip.to_string()).or_insert(location)),
            Err(e) => {
                log::warn!("Failed to get location for {}: {}", ip, e);
                None
            }
        }
    }

    fn fetch(&mut self, ip: &str) -> Result<LocationInfo> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.requests += 1;
        self.provider.lookup(ip)?.into_location(ip)
    }

    /// Cached location without any lookup
    pub fn get(&self, ip: &str) -> Option<&LocationInfo> {
        self.cache.get(ip)
    }

    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    pub fn into_cache(self) -> LocationCache {
        self.cache
    }

    /// Provider requests issued so far
    pub fn request_count(&self) -> usize {
        self.requests
    }
}
