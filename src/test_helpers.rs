//! Shared test utilities for the obset-products test suite.
//!
//! Provides row builders, fixture loading, product lookups and the
//! "every exposure lands in exactly one product per category" assertion.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let mut rows = vec![exposure("ia1s70jtq_flt.fits", "F110W", "IR")];
//! let tree = build_obset_tree(&mut rows).unwrap();
//! let products = parse_obset_tree(&tree, FiletypeDetection::EveryDetector);
//!
//! let fp = find_product(&products, "filter product 00");
//! assert_every_file_once(&products, &rows);
//! ```

use std::path::{Path, PathBuf};

use crate::products::{ObsetProducts, ProductEntry};
use crate::types::{ExposureRow, Instrument, ProductCategory};

// =========================================================================
// Row builders and fixtures
// =========================================================================

/// A manifest row for proposal 11150, obset 70.
///
/// The instrument follows the filename prefix, WFC3 when unknown.
pub fn exposure(filename: &str, filters: &str, detector: &str) -> ExposureRow {
    ExposureRow {
        filename: filename.to_string(),
        proposal_id: 11150,
        program_id: "A1S".to_string(),
        obset_id: 70,
        exposure_time: 100.0,
        filters: filters.to_string(),
        detector: detector.to_string(),
        archive_path: format!("/ifs/archive/ops/hst/public/{filename}"),
        instrument: Instrument::from_filename(filename).unwrap_or(Instrument::Wfc3),
    }
}

/// Path of a manifest under `fixtures/manifests/`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/manifests")
        .join(name)
}

// =========================================================================
// Product lookups. Each panics with the missing label.
// =========================================================================

/// Find a product by label. Panics if not found.
pub fn find_product<'a>(products: &'a ObsetProducts, label: &str) -> &'a ProductEntry {
    products.get(label).unwrap_or_else(|| {
        panic!(
            "product '{label}' not found. Available: {:?}",
            product_labels(products)
        )
    })
}

/// All product labels, in product order.
pub fn product_labels(products: &ObsetProducts) -> Vec<String> {
    products.iter().map(|(id, _)| id.to_string()).collect()
}

// =========================================================================
// Structural assertions
// =========================================================================

/// Assert that each row's file appears in exactly one product of each
/// parsed category, and that sequence numbers have no gaps.
pub fn assert_every_file_once(products: &ObsetProducts, rows: &[ExposureRow]) {
    for category in [
        ProductCategory::TotalDetection,
        ProductCategory::Filter,
        ProductCategory::SingleExposure,
    ] {
        let indices: Vec<usize> = products.of_category(category).map(|(id, _)| id.index).collect();
        let expected: Vec<usize> = (0..indices.len()).collect();
        assert_eq!(indices, expected, "{category} numbering has gaps");

        for row in rows {
            let holders = products
                .of_category(category)
                .filter(|(_, entry)| entry.files.contains(&row.filename))
                .count();
            assert_eq!(
                holders, 1,
                "{} is in {holders} {category} entries",
                row.filename
            );
        }
    }
}
