//! Obset tree building.
//!
//! Groups the exposures of one obset by detector, then by normalized filter:
//!
//! ```text
//! IR                                    ← detector
//! ├── f110w                             ← normalized filter
//! │   └── 11150 70 WFC3 IR F110W IA1S70JTQ   ia1s70jtq_flt.fits
//! └── f160w
//!     └── 11150 70 WFC3 IR F160W IA1S70JWQ   ia1s70jwq_flt.fits
//! ```
//!
//! Both levels keep first-encounter order from the manifest. That order is
//! load-bearing: the product parser numbers products by walking the tree.

use crate::filters::{FilterError, determine_filter_name};
use crate::types::ExposureRow;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("Exposure {filename}: {source}")]
    Filter {
        filename: String,
        #[source]
        source: FilterError,
    },
}

/// One exposure leaf: its info string and its filename.
///
/// The info string is space-separated and upper-case:
/// `PROPOSAL OBSET INSTRUMENT DETECTOR FILTER IPPPSSOOT`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureInfo {
    pub info: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterNode {
    pub filter: String,
    pub exposures: Vec<ExposureInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorNode {
    pub detector: String,
    pub filters: Vec<FilterNode>,
}

impl DetectorNode {
    fn filter_mut(&mut self, filter: &str) -> &mut FilterNode {
        let pos = match self.filters.iter().position(|f| f.filter == filter) {
            Some(pos) => pos,
            None => {
                self.filters.push(FilterNode {
                    filter: filter.to_string(),
                    exposures: Vec::new(),
                });
                self.filters.len() - 1
            }
        };
        &mut self.filters[pos]
    }
}

/// Detector → filter → exposures, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObsetTree {
    pub detectors: Vec<DetectorNode>,
}

impl ObsetTree {
    fn detector_mut(&mut self, detector: &str) -> &mut DetectorNode {
        let pos = match self.detectors.iter().position(|d| d.detector == detector) {
            Some(pos) => pos,
            None => {
                self.detectors.push(DetectorNode {
                    detector: detector.to_string(),
                    filters: Vec::new(),
                });
                self.detectors.len() - 1
            }
        };
        &mut self.detectors[pos]
    }

    /// Look up the exposures of one detector/filter leaf.
    pub fn exposures(&self, detector: &str, filter: &str) -> Option<&[ExposureInfo]> {
        self.detectors
            .iter()
            .find(|d| d.detector == detector)?
            .filters
            .iter()
            .find(|f| f.filter == filter)
            .map(|f| f.exposures.as_slice())
    }

    /// Number of detector/filter pairs.
    pub fn filter_count(&self) -> usize {
        self.detectors.iter().map(|d| d.filters.len()).sum()
    }

    /// Number of exposures across all leaves.
    pub fn exposure_count(&self) -> usize {
        self.detectors
            .iter()
            .flat_map(|d| &d.filters)
            .map(|f| f.exposures.len())
            .sum()
    }
}

/// Build the obset tree from manifest rows.
///
/// Each row's `filters` is overwritten with its normalized filter name.
pub fn build_obset_tree(rows: &mut [ExposureRow]) -> Result<ObsetTree, TreeError> {
    let mut tree = ObsetTree::default();

    for row in rows.iter_mut() {
        let filter = determine_filter_name(&row.filters).map_err(|source| TreeError::Filter {
            filename: row.filename.clone(),
            source,
        })?;
        row.filters = filter;

        let info = create_row_info(row);
        tree.detector_mut(&row.detector)
            .filter_mut(&row.filters)
            .exposures
            .push(ExposureInfo {
                info,
                filename: row.filename.clone(),
            });
    }

    tracing::debug!(
        detectors = tree.detectors.len(),
        filters = tree.filter_count(),
        exposures = tree.exposure_count(),
        "built obset tree"
    );
    Ok(tree)
}

/// Build the upper-case info string for one (already normalized) row.
pub fn create_row_info(row: &ExposureRow) -> String {
    let rootname = match row.filename.find('_') {
        Some(pos) => &row.filename[..pos],
        None => row.filename.as_str(),
    };
    let fields = [
        row.proposal_id.to_string(),
        format!("{:02}", row.obset_id),
        row.instrument.name().to_string(),
        row.detector.clone(),
        row.filters.clone(),
        rootname.to_string(),
    ];
    fields.join(" ").to_uppercase()
}
