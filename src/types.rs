/// ZIP codes are compared as integers, so "02134" and "2134" are the same key.
pub type ZipCode = u32;

/// One intake event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub zip: ZipCode,
    pub county: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZipSummary {
    pub zip: ZipCode,
    pub county: String,
    pub count: u64,
    pub county_total: u64,
    pub statewide_percentage: f64,
    pub county_percentage: f64,
}

/// Values injected into each ZIP boundary feature.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZipStats {
    pub clients: u64,
    pub statewide_percentage: f64,
    pub county_percentage: f64,
}

impl From<&ZipSummary> for ZipStats {
    fn from(summary: &ZipSummary) -> Self {
        Self {
            clients: summary.count,
            statewide_percentage: summary.statewide_percentage,
            county_percentage: summary.county_percentage,
        }
    }
}
