use crate::data::zip_from_value;
use crate::processing::SummaryIndex;
use crate::types::{ZipCode, ZipStats, ZipSummary};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use std::collections::BTreeSet;
use tracing::{info, warn};

pub const CLIENTS: &str = "Clients";
pub const STATEWIDE_PERCENTAGE: &str = "Statewide Percentage";
pub const COUNTY_PERCENTAGE: &str = "County Percentage";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStats {
    pub matched: usize,
    pub unmatched: usize,
    /// Matched features whose ZIP was reported under more than one county.
    pub ambiguous: usize,
}

/// Injects client counts and percentages into every ZIP feature.
///
/// The join is on the integer ZIP only. When a ZIP was reported under several
/// counties the first row in (ZIP, county) order is used. Features that do not
/// match get zeros, so every feature carries all three properties afterwards.
pub fn annotate_zip_features(
    collection: &mut FeatureCollection,
    summary: &[ZipSummary],
    join_property: &str,
) -> AnnotationStats {
    let index = SummaryIndex::new(summary);
    let mut stats = AnnotationStats::default();
    let mut ambiguous_zips = BTreeSet::new();

    for feature in &mut collection.features {
        let zip = feature_zip(feature, join_property);

        let values = match zip.and_then(|zip| index.first(zip)) {
            Some(row) => {
                stats.matched += 1;
                let counties = index.county_count(row.zip);
                if counties > 1 {
                    stats.ambiguous += 1;
                    if ambiguous_zips.insert(row.zip) {
                        warn!(
                            "ZIP {} was reported under {} counties; using {} only",
                            row.zip, counties, row.county
                        );
                    }
                }
                ZipStats::from(row)
            }
            None => {
                stats.unmatched += 1;
                ZipStats::default()
            }
        };

        set_stats(feature.properties.get_or_insert_with(JsonObject::new), values);
    }

    info!(
        "Annotated {} ZIP features: {} matched, {} without clients",
        collection.features.len(),
        stats.matched,
        stats.unmatched
    );

    stats
}

/// ZIP code of a boundary feature, read from its join property.
fn feature_zip(feature: &Feature, join_property: &str) -> Option<ZipCode> {
    zip_from_value(feature.properties.as_ref()?.get(join_property)?)
}

fn set_stats(props: &mut JsonObject, values: ZipStats) {
    props.insert(CLIENTS.to_string(), JsonValue::from(values.clients));
    props.insert(STATEWIDE_PERCENTAGE.to_string(), JsonValue::from(values.statewide_percentage));
    props.insert(COUNTY_PERCENTAGE.to_string(), JsonValue::from(values.county_percentage));
}
