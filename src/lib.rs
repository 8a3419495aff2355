//! # NetStatWiz
//!
//! Inspects the machine's active network connections, geolocates every
//! externally routable remote endpoint and writes two reports: an
//! interactive world map and an HTML table summary.
//!
//! ## Pipeline
//!
//! 1. [`source`] runs `netstat -an` (30 second bound, empty on failure)
//! 2. [`connections`] turns rows into [`ConnectionRecord`]s
//! 3. [`filter`] drops loopback, unspecified and private remote addresses
//! 4. [`geolocation`] resolves each unique remote IP once, throttled and cached
//! 5. [`aggregate`] groups connections by port/service and by country
//! 6. [`report`] writes the map and tables, with placeholder fallbacks
//!
//! [`wizard::NetStatWiz`] drives the steps in order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use netstatwiz::{Config, NetStatWiz};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut wiz = NetStatWiz::from_config(Config::default())?;
//! wiz.collect();
//! wiz.resolve_all(|i, n, ip| println!("Processing IP {}/{}: {}", i, n, ip));
//!
//! let aggregates = wiz.aggregates();
//! for row in aggregates.top_ports(10) {
//!     println!("Port {} ({}): {} connections", row.port, row.service, row.count);
//! }
//! wiz.write_map();
//! wiz.write_tables(&aggregates);
//! # Ok(())
//! # }
//! ```

pub mod aggregate; // Port/service and country summaries
pub mod config; // Configuration with TOML persistence
pub mod connections; // netstat row parsing
pub mod error;
pub mod filter; // External endpoint filter
pub mod geolocation; // Cached, throttled IP geolocation
pub mod report; // HTML map and tables
pub mod services; // Port to service name table
pub mod source; // OS connection listing
pub mod wizard; // Pipeline driver

pub use aggregate::{Aggregates, PortCount, PortServiceEntry, PortSummary};
pub use config::Config;
pub use connections::{ConnectionRecord, Protocol};
pub use error::{NetStatError, Result};
pub use geolocation::{GeoProvider, GeoResolver, IpApiProvider, LocationCache, LocationInfo};
pub use report::{EmitOutcome, MapReport};
pub use source::{ConnectionSource, NetstatSource, StaticSource};
pub use wizard::NetStatWiz;
