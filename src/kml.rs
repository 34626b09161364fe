// src/kml.rs
//! KML rendering of the current position for Google Earth network links

/// Everything written to the KML document
#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: String,
    pub description: String,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    /// Metres per second; kept for change detection, not rendered
    pub speed: Option<f64>,
    pub range: f64,
    pub tilt: f64,
    pub heading: f64,
}

impl Default for Placemark {
    fn default() -> Self {
        Self {
            name: "GPS Position".to_string(),
            description: String::new(),
            longitude: 0.0,
            latitude: 0.0,
            altitude: 0.0,
            speed: None,
            range: 0.0,
            tilt: 0.0,
            heading: 0.0,
        }
    }
}

/// Render a single placemark with a `LookAt` camera on it
pub fn render_placemark(placemark: &Placemark) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<kml xmlns="http://earth.google.com/kml/2.0">
    <Placemark>
        <name>{name}</name>
        <description>{description}</description>
        <LookAt>
            <longitude>{longitude:.6}</longitude>
            <latitude>{latitude:.6}</latitude>
            <range>{range:.6}</range>
            <tilt>{tilt:.6}</tilt>
            <heading>{heading:.6}</heading>
        </LookAt>
        <Point>
            <coordinates>{longitude:.6},{latitude:.6},{altitude:.6}</coordinates>
        </Point>
    </Placemark>
</kml>"#,
        name = escape_xml(&placemark.name),
        description = escape_xml(&placemark.description),
        longitude = placemark.longitude,
        latitude = placemark.latitude,
        altitude = placemark.altitude,
        range = placemark.range,
        tilt = placemark.tilt,
        heading = placemark.heading,
    )
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
