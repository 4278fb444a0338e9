use crate::types::{ClientRecord, ZipCode, ZipSummary};
use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Groups records by (ZIP, county) and computes each group's share of the
/// statewide total and of its county's total. Rows come back sorted by
/// ZIP, then county.
pub fn summarize(records: &[ClientRecord]) -> Result<Vec<ZipSummary>> {
    info!("Aggregating {} client records by ZIP code and county...", records.len());

    let mut counts: BTreeMap<(ZipCode, &str), u64> = BTreeMap::new();
    for record in records {
        *counts.entry((record.zip, record.county.as_str())).or_insert(0) += 1;
    }

    let total_clients: u64 = counts.values().sum();
    if total_clients == 0 {
        bail!("No client records to aggregate; check the input CSV files");
    }

    let mut county_totals: HashMap<&str, u64> = HashMap::new();
    for (&(_, county), &count) in &counts {
        *county_totals.entry(county).or_insert(0) += count;
    }

    let summary: Vec<ZipSummary> = counts
        .iter()
        .map(|(&(zip, county), &count)| {
            // Never zero: the county contains at least this group.
            let county_total = county_totals[county];
            ZipSummary {
                zip,
                county: county.to_string(),
                count,
                county_total,
                statewide_percentage: count as f64 / total_clients as f64 * 100.0,
                county_percentage: count as f64 / county_total as f64 * 100.0,
            }
        })
        .collect();

    info!(
        "Aggregated {} clients into {} ZIP/county groups across {} counties",
        total_clients,
        summary.len(),
        county_totals.len()
    );

    Ok(summary)
}

/// ZIP lookup over a sorted summary.
pub struct SummaryIndex<'a> {
    by_zip: HashMap<ZipCode, &'a [ZipSummary]>,
}

impl<'a> SummaryIndex<'a> {
    /// `summary` must be sorted by ZIP, as returned by [`summarize`].
    pub fn new(summary: &'a [ZipSummary]) -> Self {
        let mut by_zip = HashMap::new();
        for group in summary.chunk_by(|a, b| a.zip == b.zip) {
            by_zip.insert(group[0].zip, group);
        }
        Self { by_zip }
    }

    /// First row for the ZIP in (ZIP, county) order.
    pub fn first(&self, zip: ZipCode) -> Option<&'a ZipSummary> {
        self.by_zip.get(&zip).and_then(|rows| rows.first())
    }

    /// Number of counties the ZIP was reported under.
    pub fn county_count(&self, zip: ZipCode) -> usize {
        self.by_zip.get(&zip).map_or(0, |rows| rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn records(rows: &[(ZipCode, &str, usize)]) -> Vec<ClientRecord> {
        rows.iter()
            .flat_map(|&(zip, county, n)| {
                std::iter::repeat(ClientRecord { zip, county: county.to_string() }).take(n)
            })
            .collect()
    }

    #[test]
    fn statewide_percentage_of_known_share() {
        let input = records(&[(21201, "Baltimore City", 5), (21044, "Howard", 95)]);
        let summary = summarize(&input).unwrap();

        let row = summary.iter().find(|r| r.zip == 21201).unwrap();
        assert_eq!(row.count, 5);
        assert!((row.statewide_percentage - 5.0).abs() < TOLERANCE);
        assert!((row.county_percentage - 100.0).abs() < TOLERANCE);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let input = records(&[
            (21201, "Baltimore City", 7),
            (21202, "Baltimore City", 3),
            (21217, "Baltimore City", 11),
            (21044, "Howard", 13),
            (21045, "Howard", 1),
            (20910, "Montgomery", 4),
            (21042, "Howard", 6),
        ]);
        let summary = summarize(&input).unwrap();

        let statewide: f64 = summary.iter().map(|r| r.statewide_percentage).sum();
        assert!((statewide - 100.0).abs() < TOLERANCE);

        let mut by_county: HashMap<&str, f64> = HashMap::new();
        for row in &summary {
            *by_county.entry(row.county.as_str()).or_insert(0.0) += row.county_percentage;
        }
        assert_eq!(by_county.len(), 3);
        for (county, total) in by_county {
            assert!((total - 100.0).abs() < TOLERANCE, "{} sums to {}", county, total);
        }
    }

    #[test]
    fn groups_by_zip_and_county_sorted() {
        let input = records(&[
            (21202, "Baltimore City", 1),
            (21201, "Baltimore County", 2),
            (21201, "Baltimore City", 3),
        ]);
        let summary = summarize(&input).unwrap();

        let keys: Vec<(ZipCode, &str, u64)> =
            summary.iter().map(|r| (r.zip, r.county.as_str(), r.count)).collect();
        assert_eq!(
            keys,
            vec![
                (21201, "Baltimore City", 3),
                (21201, "Baltimore County", 2),
                (21202, "Baltimore City", 1),
            ]
        );
        assert_eq!(summary[0].county_total, 4);
        assert_eq!(summary[1].county_total, 2);
    }

    #[test]
    fn empty_input_fails() {
        let err = summarize(&[]).unwrap_err();
        assert!(err.to_string().contains("No client records"));
    }

    #[test]
    fn index_returns_first_county_for_shared_zip() {
        let input = records(&[
            (21201, "Baltimore County", 2),
            (21201, "Baltimore City", 3),
            (21044, "Howard", 1),
        ]);
        let summary = summarize(&input).unwrap();
        let index = SummaryIndex::new(&summary);

        assert_eq!(index.first(21201).unwrap().county, "Baltimore City");
        assert_eq!(index.county_count(21201), 2);
        assert_eq!(index.county_count(21044), 1);
        assert!(index.first(99999).is_none());
        assert_eq!(index.county_count(99999), 0);
    }
}
