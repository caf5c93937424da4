//! CLI output formatting.
//!
//! Every command has a `format_*` function returning `Vec<String>` for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Tree
//!
//! ```text
//! IR
//!     f110w
//!         ia1s70jtq_flt.fits  11150 70 WFC3 IR F110W IA1S70JTQ
//!     f160w
//!         ia1s70jwq_flt.fits  11150 70 WFC3 IR F160W IA1S70JWQ
//! ```
//!
//! ## Products
//!
//! ```text
//! total detection product 00
//!     Info: 11150 70 wfc3 ir ia1s70jtq drz
//!     Files: ia1s70jtq_flt.fits ia1s70jwq_flt.fits
//! ```
//!
//! ## Names
//!
//! ```text
//! filter product 00
//!     image: hst_11150_70_wfc3_ir_f110w_ia1s70_drz.fits
//!     point source catalog: hst_11150_70_wfc3_ir_f110w_ia1s70_point-cat.ecsv
//!     segment source catalog: hst_11150_70_wfc3_ir_f110w_ia1s70_segment-cat.ecsv
//! ```

use crate::naming::{ObsetFilenames, ProductFilenames};
use crate::products::ObsetProducts;
use crate::tree::ObsetTree;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format the detector → filter → exposure grouping of one obset.
pub fn format_tree_output(tree: &ObsetTree) -> Vec<String> {
    let mut lines = Vec::new();
    for detector in &tree.detectors {
        lines.push(detector.detector.clone());
        for filter in &detector.filters {
            lines.push(format!("{}{}", indent(1), filter.filter));
            for exposure in &filter.exposures {
                lines.push(format!(
                    "{}{}  {}",
                    indent(2),
                    exposure.filename,
                    exposure.info
                ));
            }
        }
    }
    lines
}

/// Print tree output to stdout.
pub fn print_tree_output(tree: &ObsetTree) {
    for line in format_tree_output(tree) {
        println!("{}", line);
    }
}

/// Format the product list of one obset.
pub fn format_products_output(products: &ObsetProducts) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, entry) in products.iter() {
        lines.push(id.to_string());
        lines.push(format!("{}Info: {}", indent(1), entry.info.trim_end()));
        lines.push(format!("{}Files: {}", indent(1), entry.files.join(" ")));
    }
    lines
}

/// Print products output to stdout.
pub fn print_products_output(products: &ObsetProducts) {
    for line in format_products_output(products) {
        println!("{}", line);
    }
}

/// Format the generated filenames of a list of products.
pub fn format_names_output(names: &ObsetFilenames) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, filenames) in names.iter() {
        lines.push(id.to_string());
        lines.extend(format_filenames(filenames, 1));
    }
    lines
}

/// Format one product's filenames as `key: filename` lines at `depth`.
pub fn format_filenames(filenames: &ProductFilenames, depth: usize) -> Vec<String> {
    filenames
        .entries()
        .into_iter()
        .map(|(key, name)| format!("{}{}: {}", indent(depth), key, name))
        .collect()
}

/// Print names output to stdout.
pub fn print_names_output(names: &ObsetFilenames) {
    for line in format_names_output(names) {
        println!("{}", line);
    }
}

/// Results of several manifests keyed by manifest name, in input order.
struct ByManifest<'a, T>(&'a [(String, T)]);

impl<T: Serialize> Serialize for ByManifest<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Pretty JSON for per-manifest results.
///
/// A single manifest is written as its own object; several are nested under
/// their manifest names.
pub fn format_json<T: Serialize>(results: &[(String, T)]) -> serde_json::Result<String> {
    match results {
        [(_, only)] => serde_json::to_string_pretty(only),
        _ => serde_json::to_string_pretty(&ByManifest(results)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FiletypeDetection;
    use crate::naming::generate_product_filenames;
    use crate::products::parse_obset_tree;
    use crate::test_helpers::exposure;
    use crate::tree::build_obset_tree;

    fn two_filter_tree() -> ObsetTree {
        let mut rows = vec![
            exposure("ia1s70jtq_flt.fits", "F110W", "IR"),
            exposure("ia1s70jwq_flt.fits", "F160W", "IR"),
        ];
        build_obset_tree(&mut rows).unwrap()
    }

    #[test]
    fn indent_depth() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn tree_output_nests_filters_under_detector() {
        let lines = format_tree_output(&two_filter_tree());
        assert_eq!(
            lines,
            [
                "IR",
                "    f110w",
                "        ia1s70jtq_flt.fits  11150 70 WFC3 IR F110W IA1S70JTQ",
                "    f160w",
                "        ia1s70jwq_flt.fits  11150 70 WFC3 IR F160W IA1S70JWQ",
            ]
        );
    }

    #[test]
    fn products_output_lists_info_and_files() {
        let products = parse_obset_tree(&two_filter_tree(), FiletypeDetection::EveryDetector);
        let lines = format_products_output(&products);
        assert_eq!(lines[0], "total detection product 00");
        assert_eq!(lines[1], "    Info: 11150 70 wfc3 ir ia1s70jtq drz");
        assert_eq!(lines[2], "    Files: ia1s70jtq_flt.fits ia1s70jwq_flt.fits");
        assert_eq!(lines.len(), 3 * products.len());
    }

    #[test]
    fn names_output_lists_every_part() {
        let products = parse_obset_tree(&two_filter_tree(), FiletypeDetection::EveryDetector);
        let names = generate_product_filenames(&products).unwrap();
        let lines = format_names_output(&names);
        assert_eq!(lines[0], "total detection product 00");
        assert_eq!(lines[1], "    image: hst_11150_70_wfc3_ir_total_ia1s70_drz.fits");
        assert_eq!(
            lines[2],
            "    point source catalog: hst_11150_70_wfc3_ir_total_ia1s70_point-cat.ecsv"
        );
        assert!(
            lines.contains(&"    image: hst_11150_70_wfc3_ir_f160w_ia1s70jw_drz.fits".to_string())
        );
    }

    #[test]
    fn json_for_one_manifest_is_unwrapped() {
        let products = parse_obset_tree(&two_filter_tree(), FiletypeDetection::EveryDetector);
        let json = format_json(&[("ia1s70.out".to_string(), products)]).unwrap();
        assert!(json.trim_start().starts_with("{\n  \"total detection product 00\""));
        assert!(!json.contains("ia1s70.out"));
    }

    #[test]
    fn json_for_several_manifests_keeps_input_order() {
        let products = parse_obset_tree(&two_filter_tree(), FiletypeDetection::EveryDetector);
        let results = vec![
            ("z.out".to_string(), products.clone()),
            ("a.out".to_string(), products),
        ];
        let json = format_json(&results).unwrap();
        let z = json.find("\"z.out\"").unwrap();
        let a = json.find("\"a.out\"").unwrap();
        assert!(z < a);
    }
}
