//! Shared types used across the pipeline stages.
//!
//! [`ExposureRow`] is what the manifest reader produces and the tree builder
//! consumes. [`ProductCategory`] and [`ProductId`] are shared between the
//! product parser and the filename dispatcher, which must agree on the
//! category phrases.

use serde::Serialize;
use std::fmt;

/// HST instruments that can appear in a poller manifest.
///
/// The instrument is not a manifest column: it is derived from the first
/// character of an exposure filename (`ia1s70jtq_flt.fits` → WFC3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Instrument {
    #[serde(rename = "WFC3")]
    Wfc3,
    #[serde(rename = "ACS")]
    Acs,
    #[serde(rename = "STIS")]
    Stis,
    #[serde(rename = "WFPC2")]
    Wfpc2,
    #[serde(rename = "FOC")]
    Foc,
    #[serde(rename = "WFPC")]
    Wfpc,
}

/// Filename prefix → instrument. Part of the archive naming contract.
pub const INSTRUMENT_CODES: &[(char, Instrument)] = &[
    ('i', Instrument::Wfc3),
    ('j', Instrument::Acs),
    ('o', Instrument::Stis),
    ('u', Instrument::Wfpc2),
    ('x', Instrument::Foc),
    ('w', Instrument::Wfpc),
];

impl Instrument {
    /// Look up the instrument from the first character of `filename`.
    ///
    /// The lookup is case-sensitive: archive rootnames are lower-case.
    pub fn from_filename(filename: &str) -> Option<Instrument> {
        let code = filename.chars().next()?;
        INSTRUMENT_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, instrument)| *instrument)
    }

    /// Upper-case archive name, as it appears in info strings.
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Wfc3 => "WFC3",
            Instrument::Acs => "ACS",
            Instrument::Stis => "STIS",
            Instrument::Wfpc2 => "WFPC2",
            Instrument::Foc => "FOC",
            Instrument::Wfpc => "WFPC",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One exposure from a poller manifest.
///
/// `filters` holds the raw filter string as read; the tree builder
/// overwrites it with the normalized name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureRow {
    pub filename: String,
    pub proposal_id: u32,
    pub program_id: String,
    pub obset_id: u32,
    pub exposure_time: f64,
    pub filters: String,
    pub detector: String,
    pub archive_path: String,
    pub instrument: Instrument,
}

/// Kind of output product.
///
/// The parser only ever emits the first three; multivisit mosaics are
/// assembled by callers from metadata aggregated across visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductCategory {
    TotalDetection,
    Filter,
    SingleExposure,
    MultivisitMosaic,
}

impl ProductCategory {
    /// Every category, in the order the dispatcher tries their phrases.
    pub const ALL: [ProductCategory; 4] = [
        ProductCategory::SingleExposure,
        ProductCategory::Filter,
        ProductCategory::TotalDetection,
        ProductCategory::MultivisitMosaic,
    ];

    pub fn phrase(self) -> &'static str {
        match self {
            ProductCategory::TotalDetection => "total detection product",
            ProductCategory::Filter => "filter product",
            ProductCategory::SingleExposure => "single exposure product",
            ProductCategory::MultivisitMosaic => "multivisit mosaic product",
        }
    }

    /// Match a category label such as `"filter product 03"` by phrase prefix.
    pub fn from_label(label: &str) -> Option<ProductCategory> {
        Self::ALL
            .into_iter()
            .find(|category| label.starts_with(category.phrase()))
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// Product identifier: category plus a sequence number unique within it.
///
/// Displays as `"<phrase> <NN>"`, e.g. `"total detection product 00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductId {
    pub category: ProductCategory,
    pub index: usize,
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}", self.category.phrase(), self.index)
    }
}
