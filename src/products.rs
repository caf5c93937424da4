//! Product parsing.
//!
//! Walks an [`ObsetTree`] once and turns it into the flat list of products
//! the pipeline must create:
//!
//! - one **total detection product** per detector
//! - one **filter product** per detector/filter pair
//! - one **single exposure product** per exposure
//!
//! Each product carries a lower-case `info` string, consumed positionally by
//! the filename generators in [`crate::naming`], and the exposure files it is
//! built from. Sequence numbers run across the whole obset (they are not
//! reset per detector), and products are listed in the order they are
//! allocated:
//!
//! ```text
//! total detection product 00   11150 70 wfc3 ir ia1s70jtq drz
//! filter product 00            11150 70 wfc3 ir f110w ia1s70jtq drz
//! single exposure product 00   11150 70 wfc3 ir f110w ia1s70jtq drz
//! filter product 01            11150 70 wfc3 ir f160w ia1s70jwq drz
//! single exposure product 01   11150 70 wfc3 ir f160w ia1s70jwq drz
//! ```
//!
//! ## Filetype
//!
//! The last info field is the drizzled output type, detected from the first
//! exposure of a detector: `flt` inputs drizzle to `drz`, anything else
//! (`flc`) to `drc`. See [`FiletypeDetection`] for when detection runs.

use crate::config::{Config, FiletypeDetection};
use crate::manifest::{self, ManifestError};
use crate::naming::NamingError;
use crate::tree::{self, ExposureInfo, ObsetTree, TreeError};
use crate::types::{ProductCategory, ProductId};
use rayon::prelude::*;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObsetError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Naming(#[from] NamingError),
}

impl ObsetError {
    /// True for problems in the manifest contents, as opposed to an
    /// instrument or product category the naming scheme does not know, or
    /// an I/O failure.
    pub fn is_data_quality(&self) -> bool {
        match self {
            ObsetError::Manifest(err) => matches!(
                err,
                ManifestError::ColumnCount { .. }
                    | ManifestError::MalformedRow { .. }
                    | ManifestError::RowCount { .. }
                    | ManifestError::Empty
                    | ManifestError::Csv(_)
            ),
            ObsetError::Tree(TreeError::Filter { .. }) => true,
            ObsetError::Naming(_) => false,
        }
    }
}

/// Description and inputs of one output product.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductEntry {
    pub info: String,
    pub files: Vec<String>,
}

/// All products of one obset, in allocation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObsetProducts {
    entries: Vec<(ProductId, ProductEntry)>,
}

impl ObsetProducts {
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &ProductEntry)> {
        self.entries.iter().map(|(id, entry)| (id, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a product by its label, e.g. `"filter product 01"`.
    pub fn get(&self, label: &str) -> Option<&ProductEntry> {
        self.entries
            .iter()
            .find(|(id, _)| id.to_string() == label)
            .map(|(_, entry)| entry)
    }

    /// Products of one category, in sequence order.
    pub fn of_category(
        &self,
        category: ProductCategory,
    ) -> impl Iterator<Item = (&ProductId, &ProductEntry)> {
        self.iter().filter(move |(id, _)| id.category == category)
    }

    fn push(&mut self, id: ProductId) -> usize {
        self.entries.push((id, ProductEntry::default()));
        self.entries.len() - 1
    }

    fn entry_mut(&mut self, slot: usize) -> &mut ProductEntry {
        &mut self.entries[slot].1
    }
}

/// Serializes as a JSON object keyed by product label, in allocation order.
impl Serialize for ObsetProducts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, entry) in &self.entries {
            map.serialize_entry(&id.to_string(), entry)?;
        }
        map.end()
    }
}

/// Next free sequence number per category.
#[derive(Debug, Default)]
struct SequenceCounters {
    total_detection: usize,
    filter: usize,
    single_exposure: usize,
    multivisit_mosaic: usize,
}

impl SequenceCounters {
    fn next(&mut self, category: ProductCategory) -> ProductId {
        let counter = match category {
            ProductCategory::TotalDetection => &mut self.total_detection,
            ProductCategory::Filter => &mut self.filter,
            ProductCategory::SingleExposure => &mut self.single_exposure,
            ProductCategory::MultivisitMosaic => &mut self.multivisit_mosaic,
        };
        let index = *counter;
        *counter += 1;
        ProductId { category, index }
    }
}

/// Drizzled filetype for a detector whose first exposure is `filename`.
///
/// Looks at the `flt`/`flc` suffix in the fixed `ipppssoot_fl?` position.
pub fn detect_filetype(filename: &str) -> &'static str {
    let suffix = filename.get(10..13).unwrap_or("");
    if suffix.to_lowercase().ends_with("flt") {
        "drz"
    } else {
        "drc"
    }
}

/// Convert the obset tree into products.
pub fn parse_obset_tree(tree: &ObsetTree, detection: FiletypeDetection) -> ObsetProducts {
    let mut products = ObsetProducts::default();
    let mut counters = SequenceCounters::default();
    let mut filetype = "";

    for (det_pos, detector) in tree.detectors.iter().enumerate() {
        let tdp_id = counters.next(ProductCategory::TotalDetection);
        let tdp = products.push(tdp_id);
        tracing::debug!(product = %tdp_id, detector = %detector.detector, "allocated product");

        let detect_here = det_pos > 0 || detection == FiletypeDetection::EveryDetector;
        let mut detected = !detect_here;

        for filter in &detector.filters {
            let fp_id = counters.next(ProductCategory::Filter);
            let fp = products.push(fp_id);
            tracing::debug!(product = %fp_id, filter = %filter.filter, "allocated product");

            for exposure in &filter.exposures {
                if !detected {
                    filetype = detect_filetype(&exposure.filename);
                    detected = true;
                }

                let sep_id = counters.next(ProductCategory::SingleExposure);
                let sep = products.push(sep_id);
                *products.entry_mut(sep) = ProductEntry {
                    info: format!("{} {}", exposure.info, filetype).to_lowercase(),
                    files: vec![exposure.filename.clone()],
                };

                let fp_entry = products.entry_mut(fp);
                if fp_entry.info.is_empty() {
                    fp_entry.info = format!("{} {}", exposure.info, filetype).to_lowercase();
                }
                fp_entry.files.push(exposure.filename.clone());

                let tdp_entry = products.entry_mut(tdp);
                if tdp_entry.info.is_empty() {
                    tdp_entry.info = total_detection_info(exposure, filetype);
                }
                tdp_entry.files.push(exposure.filename.clone());
            }
        }
    }

    products
}

/// Total detection info: the exposure info without its filter field.
fn total_detection_info(exposure: &ExposureInfo, filetype: &str) -> String {
    let fields: Vec<&str> = exposure.info.split_whitespace().collect();
    let head = fields.len().saturating_sub(2);
    let rootname = fields.last().copied().unwrap_or("");
    format!("{} {} {}", fields[..head].join(" "), rootname, filetype).to_lowercase()
}

/// Everything derived from one manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ObsetInterpretation {
    pub tree: ObsetTree,
    pub products: ObsetProducts,
}

/// Read a poller manifest, group it and number its products.
///
/// With `expected_rows` set, a manifest of any other length fails with
/// [`ManifestError::RowCount`] before anything is grouped.
pub fn interpret_obset<R: Read>(
    reader: R,
    config: &Config,
    expected_rows: Option<usize>,
) -> Result<ObsetInterpretation, ObsetError> {
    let mut rows = manifest::read_manifest(reader, &config.manifest)?;
    if let Some(expected) = expected_rows {
        manifest::check_row_count(&rows, expected)?;
    }
    let tree = tree::build_obset_tree(&mut rows)?;
    let products = parse_obset_tree(&tree, config.products.filetype_detection);
    tracing::info!(
        exposures = rows.len(),
        products = products.len(),
        "interpreted obset"
    );
    Ok(ObsetInterpretation { tree, products })
}

/// Interpret one manifest file from disk.
pub fn interpret_manifest_file(
    path: &Path,
    config: &Config,
    expected_rows: Option<usize>,
) -> Result<ObsetInterpretation, ObsetError> {
    let _span = tracing::info_span!("manifest", path = %path.display()).entered();
    let file = File::open(path).map_err(ManifestError::from)?;
    interpret_obset(file, config, expected_rows)
}

/// Interpret several manifest files in parallel, in input order.
///
/// Every manifest is read in full even when another fails; the error
/// returned is the one from the earliest failing path.
pub fn interpret_manifest_files(
    paths: &[PathBuf],
    config: &Config,
    expected_rows: Option<usize>,
) -> Result<Vec<ObsetInterpretation>, ObsetError> {
    let results: Vec<Result<ObsetInterpretation, ObsetError>> = paths
        .par_iter()
        .map(|path| interpret_manifest_file(path, config, expected_rows))
        .collect();
    results.into_iter().collect()
}

/// Read a poller manifest and interpret it into products in one call.
pub fn interpret_obset_input<R: Read>(
    reader: R,
    config: &Config,
) -> Result<ObsetProducts, ObsetError> {
    interpret_obset(reader, config, None).map(|obset| obset.products)
}
