use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// Intake exports, concatenated in this order.
    pub client_csvs: Vec<PathBuf>,
    pub zip_geojson: PathBuf,
    pub county_geojson: PathBuf,
    pub zip_column: String,
    pub county_column: String,
    /// Feature property holding the ZIP code in the ZIP boundary file.
    pub join_property: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            client_csvs: vec![
                PathBuf::from("data/Full Intake(Full Intake Aggregate).csv"),
                PathBuf::from("data/Same Day(Same Day aggregate).csv"),
            ],
            zip_geojson: PathBuf::from("data/maryland-zips.geojson"),
            county_geojson: PathBuf::from("data/maryland-counties.geojson"),
            zip_column: "Zip Code".to_string(),
            county_column: "County of Residence".to_string(),
            join_property: "name".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub colors: ColorConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [39.0, -77.5],
            zoom: 8,
            colors: ColorConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    pub none: String,
    pub low: String,
    pub medium: String,
    pub high: String,
    /// Counts below this (and above zero) are "low".
    pub low_below: u64,
    /// Counts below this are "medium"; the rest are "high".
    pub medium_below: u64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            none: "#f2f2f2".to_string(),
            low: "#ffcccc".to_string(),
            medium: "#ff6666".to_string(),
            high: "#cc0000".to_string(),
            low_below: 10,
            medium_below: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub html: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html: PathBuf::from("index.html"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML configuration: {:?}", path))?;
        Ok(config)
    }

    /// Built-in defaults when no config file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_fixed_inputs() {
        let config = AppConfig::default();
        assert_eq!(config.input.client_csvs.len(), 2);
        assert_eq!(config.input.zip_column, "Zip Code");
        assert_eq!(config.input.county_column, "County of Residence");
        assert_eq!(config.input.join_property, "name");
        assert_eq!(config.map.center, [39.0, -77.5]);
        assert_eq!(config.map.zoom, 8);
        assert_eq!(config.output.html, PathBuf::from("index.html"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
[input]
client_csvs = ["a.csv"]

[map.colors]
high = "#000000"

[output]
html = "out/map.html"
"##
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.client_csvs, vec![PathBuf::from("a.csv")]);
        assert_eq!(config.input.zip_column, "Zip Code");
        assert_eq!(config.map.colors.high, "#000000");
        assert_eq!(config.map.colors.low, "#ffcccc");
        assert_eq!(config.map.colors.medium_below, 50);
        assert_eq!(config.output.html, PathBuf::from("out/map.html"));
        assert_eq!(config.map.zoom, 8);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn no_path_uses_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.input.zip_geojson, PathBuf::from("data/maryland-zips.geojson"));
    }
}
