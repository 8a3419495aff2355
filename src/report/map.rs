//! Interactive world map of remote endpoints (Leaflet + OpenStreetMap tiles)

use super::{emit_with_fallback, escape_html, placeholder_page, EmitOutcome};
use crate::aggregate::{ip_connection_count, unique_remote_ips};
use crate::connections::ConnectionRecord;
use crate::error::Result;
use crate::geolocation::LocationCache;
use serde::Serialize;
use std::path::Path;

const MAP_CENTER: (f64, f64) = (20.0, 0.0);
const MAP_ZOOM: u8 = 2;

/// One map pin
#[derive(Debug, Clone, Serialize)]
struct Marker {
    lat: f64,
    lon: f64,
    tooltip: String,
    popup: String,
}

/// Result of a map emission
#[derive(Debug, Clone)]
pub struct MapReport {
    pub outcome: EmitOutcome,
    /// Markers placed on the map
    pub markers: usize,
    /// Locations known when the map was drawn
    pub locations: usize,
}

fn markers(locations: &LocationCache, connections: &[ConnectionRecord]) -> Vec<Marker> {
    unique_remote_ips(connections)
        .into_iter()
        .filter_map(|ip| {
            let loc = locations.get(&ip)?;
            if !loc.has_coordinates() {
                log::debug!(
                    "No coordinates for {} (lat={}, lon={})",
                    ip,
                    loc.latitude,
                    loc.longitude
                );
                return None;
            }

            let count = ip_connection_count(connections, &ip);
            let popup = format!(
                "<div style=\"font-family: Arial; width: 200px;\">\
                 <h4>{}</h4>\
                 <p><b>Location:</b> {}</p>\
                 <p><b>ISP:</b> {}</p>\
                 <p><b>Organization:</b> {}</p>\
                 <p><b>Connections:</b> {}</p>\
                 </div>",
                escape_html(&ip),
                escape_html(&loc.place()),
                escape_html(&loc.isp),
                escape_html(&loc.org),
                count
            );

            Some(Marker {
                lat: loc.latitude,
                lon: loc.longitude,
                tooltip: format!(
                    "{} - {}, {}",
                    escape_html(&ip),
                    escape_html(&loc.city),
                    escape_html(&loc.country)
                ),
                popup,
            })
        })
        .collect()
}

/// Render the map document and return it with its marker count
///
/// With no usable coordinates the document is still a complete base map.
pub fn render_map(
    locations: &LocationCache,
    connections: &[ConnectionRecord],
) -> Result<(String, usize)> {
    let pins = markers(locations, connections);
    // `</` must not appear inside the inline script.
    let data = serde_json::to_string(&pins)?.replace("</", "<\\/");

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>NetStatWiz - Network Map</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <style>
        html, body {{ height: 100%; margin: 0; }}
        #map {{ width: 100%; height: 100%; }}
    </style>
</head>
<body>
    <div id="map"></div>
    <script>
        var map = L.map('map').setView([{lat}, {lon}], {zoom});
        L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
            maxZoom: 18,
            attribution: '&copy; OpenStreetMap contributors'
        }}).addTo(map);
        var markers = {data};
        markers.forEach(function (m) {{
            L.marker([m.lat, m.lon])
                .bindPopup(m.popup, {{ maxWidth: 300 }})
                .bindTooltip(m.tooltip)
                .addTo(map);
        }});
    </script>
</body>
</html>
"#,
        lat = MAP_CENTER.0,
        lon = MAP_CENTER.1,
        zoom = MAP_ZOOM,
        data = data,
    );

    Ok((html, pins.len()))
}

/// Write the map to `path`, falling back to a placeholder page
pub fn emit_map(
    path: &Path,
    locations: &LocationCache,
    connections: &[ConnectionRecord],
) -> MapReport {
    let mut placed = 0;
    let outcome = emit_with_fallback(
        path,
        || {
            let (html, count) = render_map(locations, connections)?;
            placed = count;
            Ok(html)
        },
        |reason| {
            placeholder_page(
                "NetStatWiz - Network Map",
                "Network Map",
                &[
                    "Error generating map.".to_string(),
                    format!("Error details: {}", reason),
                    format!("IP Locations found: {}", locations.len()),
                ],
            )
        },
    );

    if outcome.is_primary() {
        if placed == 0 {
            log::warn!("No valid location coordinates found; map has no markers");
        }
        log::info!(
            "Markers added: {} out of {} IP locations",
            placed,
            locations.len()
        );
    } else {
        placed = 0;
    }

    MapReport {
        outcome,
        markers: placed,
        locations: locations.len(),
    }
}
