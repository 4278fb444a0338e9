use crate::config::AppConfig;
use crate::types::{ClientRecord, ZipCode};
use anyhow::{anyhow, Context, Result};
use csv::{ByteRecord, ReaderBuilder};
use geojson::{FeatureCollection, GeoJson, JsonValue};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

pub fn load_client_records(config: &AppConfig) -> Result<Vec<ClientRecord>> {
    let mut records = Vec::new();

    for path in &config.input.client_csvs {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
        let loaded = read_client_csv(file, &config.input.zip_column, &config.input.county_column)
            .with_context(|| format!("Failed to read client records from {:?}", path))?;
        info!("Loaded {} client records from {:?}", loaded.len(), path);
        records.extend(loaded);
    }

    info!("Loaded {} client records in total", records.len());
    Ok(records)
}

/// Reads intake rows from a Latin-1 encoded CSV.
///
/// Rows with a blank ZIP or county are dropped. ZIP values that are not
/// integer-like are skipped with a warning.
pub fn read_client_csv<R: Read>(
    reader: R,
    zip_column: &str,
    county_column: &str,
) -> Result<Vec<ClientRecord>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.byte_headers()?.iter().map(|h| decode_latin1(h).trim().to_string()).collect();

    let zip_idx = headers.iter().position(|h| h == zip_column)
        .ok_or_else(|| anyhow!("Column '{}' not found in CSV", zip_column))?;
    let county_idx = headers.iter().position(|h| h == county_column)
        .ok_or_else(|| anyhow!("Column '{}' not found in CSV", county_column))?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut row = ByteRecord::new();

    while rdr.read_byte_record(&mut row)? {
        let zip_raw = row.get(zip_idx).map(decode_latin1).unwrap_or_default();
        let county = row.get(county_idx).map(decode_latin1).unwrap_or_default();
        let zip_raw = zip_raw.trim();
        let county = county.trim();

        if zip_raw.is_empty() || county.is_empty() {
            continue;
        }

        match parse_zip(zip_raw) {
            Some(zip) => records.push(ClientRecord { zip, county: county.to_string() }),
            None => {
                warn!("Skipping row with unrecognised ZIP code {:?}", zip_raw);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} rows with unrecognised ZIP codes", skipped);
    }

    Ok(records)
}

/// Latin-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Coerces an integer-like ZIP value: `21201`, `21201.0` and `21201-1234`.
pub fn parse_zip(raw: &str) -> Option<ZipCode> {
    let raw = raw.trim();
    let head = raw.split('-').next().unwrap_or(raw).trim();
    if head.is_empty() {
        return None;
    }

    if let Ok(zip) = head.parse::<ZipCode>() {
        return Some(zip);
    }

    // Spreadsheet exports sometimes write integer columns as floats.
    zip_from_f64(head.parse().ok()?)
}

/// Coerces a GeoJSON property value to a ZIP code. Strings follow
/// [`parse_zip`]; numbers must be non-negative integers, `21201.0` included.
pub fn zip_from_value(value: &JsonValue) -> Option<ZipCode> {
    match value {
        JsonValue::String(s) => parse_zip(s),
        JsonValue::Number(n) => match n.as_u64() {
            Some(n) => ZipCode::try_from(n).ok(),
            None => zip_from_f64(n.as_f64()?),
        },
        _ => None,
    }
}

fn zip_from_f64(value: f64) -> Option<ZipCode> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= ZipCode::MAX as f64 {
        Some(value as ZipCode)
    } else {
        None
    }
}

pub fn load_feature_collection(path: &Path) -> Result<FeatureCollection> {
    info!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parse the GeoJSON. warning: this loads the whole file into memory.
    let geojson = GeoJson::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    match geojson {
        GeoJson::FeatureCollection(fc) => {
            info!("Loaded {} features from {:?}", fc.features.len(), path);
            Ok(fc)
        }
        _ => Err(anyhow!("GeoJSON must be a FeatureCollection: {:?}", path)),
    }
}
