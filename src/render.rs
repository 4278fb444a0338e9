use crate::annotate::{CLIENTS, COUNTY_PERCENTAGE, STATEWIDE_PERCENTAGE};
use crate::config::{AppConfig, ColorConfig};
use anyhow::{Context, Result};
use geojson::{FeatureCollection, JsonValue};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

/// (property, label) pairs shown in the ZIP tooltip.
pub const TOOLTIP_FIELDS: [(&str, &str); 4] = [
    ("name", "ZIP Code:"),
    (CLIENTS, "Clients:"),
    (STATEWIDE_PERCENTAGE, "Share of Statewide Count:"),
    (COUNTY_PERCENTAGE, "Share of County Count:"),
];

/// Four-step color scale on the raw client count.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    colors: ColorConfig,
}

#[derive(Debug, Serialize)]
struct LegendEntry {
    label: String,
    color: String,
}

impl ColorScale {
    pub fn new(colors: ColorConfig) -> Self {
        Self { colors }
    }

    pub fn color_for(&self, count: u64) -> &str {
        if count == 0 {
            &self.colors.none
        } else if count < self.colors.low_below {
            &self.colors.low
        } else if count < self.colors.medium_below {
            &self.colors.medium
        } else {
            &self.colors.high
        }
    }

    fn legend(&self) -> Vec<LegendEntry> {
        let c = &self.colors;
        let bins = [
            ("0".to_string(), &c.none),
            (range_label(1, c.low_below), &c.low),
            (range_label(c.low_below.max(1), c.medium_below), &c.medium),
            (format!("{}+", c.medium_below.max(1)), &c.high),
        ];
        bins.into_iter()
            .map(|(label, color)| LegendEntry { label, color: color.clone() })
            .collect()
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new(ColorConfig::default())
    }
}

fn range_label(from: u64, below: u64) -> String {
    match below.saturating_sub(1) {
        to if to <= from => from.to_string(),
        to => format!("{}-{}", from, to),
    }
}

/// Builds the self-contained map page: dashed county outlines under ZIP
/// polygons shaded by client count, with tooltips and a legend.
pub fn render_map(
    config: &AppConfig,
    zips: &FeatureCollection,
    counties: &FeatureCollection,
) -> Result<String> {
    let scale = ColorScale::new(config.map.colors.clone());
    let join_property = config.input.join_property.as_str();

    // One fill per ZIP feature, in feature order.
    let fills: Vec<&str> = zips
        .features
        .iter()
        .map(|feature| {
            let clients = feature
                .properties
                .as_ref()
                .and_then(|props| props.get(CLIENTS))
                .and_then(JsonValue::as_u64)
                .unwrap_or(0);
            scale.color_for(clients)
        })
        .collect();

    let fields: Vec<JsonValue> = TOOLTIP_FIELDS
        .iter()
        .map(|&(field, alias)| {
            let field = if field == "name" { join_property } else { field };
            json!({ "field": field, "alias": alias })
        })
        .collect();

    let settings = json!({
        "center": config.map.center,
        "zoom": config.map.zoom,
        "noDataColor": scale.color_for(0),
        "fills": fills,
        "tooltip": fields,
        "legend": scale.legend(),
    });

    let settings = script_json(&settings)?;
    let counties = script_json(counties)?;
    let zips = script_json(zips)?;

    Ok(fill_template(
        PAGE_TEMPLATE,
        &[
            ("__SETTINGS__", settings.as_str()),
            ("__COUNTIES__", counties.as_str()),
            ("__ZIPS__", zips.as_str()),
        ],
    ))
}

/// Substitutes each placeholder in a single pass over the template, so
/// inserted data is never scanned for placeholders itself.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + slots.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some((at, key, value)) = slots
        .iter()
        .filter_map(|&(key, value)| rest.find(key).map(|at| (at, key, value)))
        .min_by_key(|&(at, _, _)| at)
    {
        out.push_str(&rest[..at]);
        out.push_str(value);
        rest = &rest[at + key.len()..];
    }

    out.push_str(rest);
    out
}

/// JSON that is safe to inline inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("Failed to serialize map data")?;
    Ok(json.replace("</", "<\\/"))
}

pub fn write_map(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(path, html).with_context(|| format!("Failed to write map: {:?}", path))?;
    info!("Wrote map ({} bytes) to {:?}", html.len(), path);
    Ok(())
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Clients by ZIP Code</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  html, body, #map { height: 100%; margin: 0; }
  .zip-tooltip th { text-align: left; padding-right: 6px; }
  .legend { background: white; padding: 6px 8px; border-radius: 4px; line-height: 18px; font: 12px sans-serif; }
  .legend i { width: 16px; height: 16px; float: left; margin-right: 6px; border: 1px solid #999; }
</style>
</head>
<body>
<div id="map"></div>
<script>
const settings = __SETTINGS__;
const counties = __COUNTIES__;
const zips = __ZIPS__;
const zipFills = new Map(zips.features.map((feature, i) => [feature, settings.fills[i]]));

function escapeHtml(value) {
  return String(value).replace(/[&<>"']/g, c => ({"&": "&amp;", "<": "&lt;", ">": "&gt;", '"': "&quot;", "'": "&#39;"}[c]));
}

function localize(value) {
  return typeof value === "number" ? value.toLocaleString() : escapeHtml(value);
}

const map = L.map("map").setView(settings.center, settings.zoom);
L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
  maxZoom: 18,
  attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);

L.geoJSON(counties, {
  style: () => ({ color: "black", weight: 2, fillOpacity: 0, dashArray: "5, 5" })
}).addTo(map);

L.geoJSON(zips, {
  style: feature => ({
    fillColor: zipFills.get(feature) || settings.noDataColor,
    color: "black",
    weight: 0.5,
    fillOpacity: 0.6
  }),
  onEachFeature: (feature, layer) => {
    const rows = settings.tooltip.map(t =>
      "<tr><th>" + escapeHtml(t.alias) + "</th><td>" + localize(feature.properties[t.field]) + "</td></tr>"
    ).join("");
    layer.bindTooltip("<table class=\"zip-tooltip\">" + rows + "</table>", { sticky: true });
  }
}).addTo(map);

const legend = L.control({ position: "bottomright" });
legend.onAdd = () => {
  const div = L.DomUtil.create("div", "legend");
  div.innerHTML = "<strong>Clients</strong><br>" + settings.legend.map(e =>
    "<i style=\"background:" + escapeHtml(e.color) + "\"></i>" + escapeHtml(e.label)
  ).join("<br>");
  return div;
};
legend.addTo(map);
</script>
</body>
</html>
"#;
