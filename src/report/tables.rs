//! Connection and port summary tables as a standalone HTML page

use super::{emit_with_fallback, escape_html, placeholder_page, EmitOutcome};
use crate::aggregate::Aggregates;
use crate::connections::ConnectionRecord;
use crate::error::{NetStatError, Result};
use crate::geolocation::{LocationCache, UNKNOWN};
use crate::services::service_name;
use chrono::{DateTime, Local};
use std::fmt::Write;
use std::path::Path;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; background-color: #f5f5f5; }
        h1 { color: #333; }
        table { border-collapse: collapse; width: 100%; margin: 20px 0; background-color: white; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        th, td { border: 1px solid #ddd; padding: 12px; text-align: left; }
        th { background-color: #4CAF50; color: white; font-weight: bold; }
        tr:nth-child(even) { background-color: #f2f2f2; }
        tr:hover { background-color: #e8f5e9; }
        .summary { background-color: #e3f2fd; padding: 15px; border-radius: 5px; margin: 20px 0; }
        .generated { color: #777; font-size: 0.9em; }
"#;

/// `city, country` with `Unknown` for unresolved IPs
fn location_label(locations: &LocationCache, ip: &str) -> String {
    match locations.get(ip) {
        Some(loc) => format!("{}, {}", loc.city, loc.country),
        None => format!("{}, {}", UNKNOWN, UNKNOWN),
    }
}

fn render(
    connections: &[ConnectionRecord],
    locations: &LocationCache,
    aggregates: &Aggregates,
    generated_at: DateTime<Local>,
) -> std::result::Result<String, std::fmt::Error> {
    let mut html = String::new();

    writeln!(html, "<!DOCTYPE html>\n<html>\n<head>")?;
    writeln!(html, "    <title>NetStatWiz - Network Analysis</title>")?;
    writeln!(html, "    <meta charset=\"utf-8\">")?;
    writeln!(html, "    <style>{}    </style>\n</head>\n<body>", STYLE)?;
    writeln!(html, "    <h1>NetStatWiz - Network Analysis Report</h1>")?;
    writeln!(
        html,
        "    <p class=\"generated\">Generated {}</p>",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )?;

    writeln!(html, "    <div class=\"summary\">\n        <h2>Summary</h2>")?;
    writeln!(
        html,
        "        <p><strong>Total Connections:</strong> {}</p>",
        aggregates.total_connections
    )?;
    writeln!(
        html,
        "        <p><strong>Unique IP Addresses:</strong> {}</p>",
        aggregates.unique_ips
    )?;
    writeln!(
        html,
        "        <p><strong>Unique Ports:</strong> {}</p>\n    </div>",
        aggregates.unique_ports()
    )?;

    writeln!(html, "    <h2>All Connections</h2>\n    <table>")?;
    writeln!(
        html,
        "        <tr><th>Protocol</th><th>Remote IP</th><th>Remote Port</th><th>Service</th><th>State</th><th>Location</th></tr>"
    )?;
    for conn in connections {
        writeln!(
            html,
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            conn.protocol,
            escape_html(&conn.remote_ip),
            conn.remote_port,
            escape_html(service_name(conn.remote_port)),
            escape_html(&conn.state),
            escape_html(&location_label(locations, &conn.remote_ip)),
        )?;
    }
    writeln!(html, "    </table>")?;

    writeln!(html, "    <h2>Ports and Services Summary</h2>\n    <table>")?;
    writeln!(
        html,
        "        <tr><th>Port</th><th>Service</th><th>Connection Count</th><th>IP Addresses</th></tr>"
    )?;
    for row in aggregates.port_summaries() {
        writeln!(
            html,
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.port,
            escape_html(&row.service),
            row.connection_count,
            escape_html(&row.ip_list()),
        )?;
    }
    writeln!(html, "    </table>\n</body>\n</html>")?;

    Ok(html)
}

/// Render the tables page
pub fn render_tables(
    connections: &[ConnectionRecord],
    locations: &LocationCache,
    aggregates: &Aggregates,
    generated_at: DateTime<Local>,
) -> Result<String> {
    render(connections, locations, aggregates, generated_at)
        .map_err(|e| NetStatError::Render(format!("tables: {}", e)))
}

/// Write the tables page to `path`, falling back to a placeholder page
pub fn emit_tables(
    path: &Path,
    connections: &[ConnectionRecord],
    locations: &LocationCache,
    aggregates: &Aggregates,
) -> EmitOutcome {
    emit_with_fallback(
        path,
        || render_tables(connections, locations, aggregates, Local::now()),
        |reason| {
            placeholder_page(
                "NetStatWiz - Network Analysis",
                "Network Analysis Report",
                &[
                    "Error generating tables.".to_string(),
                    format!("Error details: {}", reason),
                    format!("Total Connections: {}", connections.len()),
                ],
            )
        },
    )
}
