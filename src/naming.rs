//! Canonical output filenames for HLA products.
//!
//! Every product category has its own naming pattern. The generators take the
//! space-separated `info` string of a product, split into positional fields,
//! and build the image name and, for combined products, the names of the two
//! source catalogs:
//!
//! | Category | Fields | Image |
//! |----------|--------|-------|
//! | single exposure | proposal obset instrument detector filter ipppssoot filetype | `hst_11150_70_wfc3_ir_f110w_ia1s70jt_drz.fits` |
//! | filter | proposal obset instrument detector filter ipppssoot filetype | `hst_11150_70_wfc3_ir_f110w_ia1s70_drz.fits` |
//! | total detection | proposal obset instrument detector ipppssoot filetype | `hst_11150_70_wfc3_ir_total_ia1s70_drz.fits` |
//! | multivisit mosaic | group instrument detector filter filetype | `hst_mos1234_wfc3_ir_f160w drz.fits` |
//!
//! Catalogs share the image basename without the filetype suffix:
//! `hst_11150_70_wfc3_ir_f110w_ia1s70_point-cat.ecsv` and
//! `..._segment-cat.ecsv`. Single exposure products have no catalogs.
//!
//! The mosaic image separates the filetype with a space rather than an
//! underscore. Downstream stages already expect that name, so it is kept.
//!
//! Generators never change case: info strings are lower-cased when products
//! are parsed.

use crate::products::ObsetProducts;
use crate::types::{ProductCategory, ProductId};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use thiserror::Error;

/// Key of the image filename in a product filename listing.
pub const IMAGE: &str = "image";
/// Key of the point source catalog filename.
pub const POINT_SOURCE_CATALOG: &str = "point source catalog";
/// Key of the segment source catalog filename.
pub const SEGMENT_SOURCE_CATALOG: &str = "segment source catalog";

/// Width of the zero-padded proposal id in filenames.
const PROPOSAL_ID_WIDTH: usize = 5;

#[derive(Error, Debug, PartialEq)]
pub enum NamingError {
    #[error("Unrecognized product category: {0:?}")]
    UnknownCategory(String),
    #[error("Info for {category} is missing field {position} ({name})")]
    MissingField {
        category: ProductCategory,
        position: usize,
        name: &'static str,
    },
}

/// Output filenames of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductFilenames {
    #[serde(rename = "image")]
    pub image: String,
    #[serde(
        rename = "point source catalog",
        skip_serializing_if = "Option::is_none"
    )]
    pub point_source_catalog: Option<String>,
    #[serde(
        rename = "segment source catalog",
        skip_serializing_if = "Option::is_none"
    )]
    pub segment_source_catalog: Option<String>,
}

impl ProductFilenames {
    fn image_only(image: String) -> Self {
        Self {
            image,
            point_source_catalog: None,
            segment_source_catalog: None,
        }
    }

    fn with_catalogs(image: String, catalog_basename: &str) -> Self {
        Self {
            image,
            point_source_catalog: Some(format!("{catalog_basename}_point-cat.ecsv")),
            segment_source_catalog: Some(format!("{catalog_basename}_segment-cat.ecsv")),
        }
    }

    /// `(key, filename)` pairs, image first.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = vec![(IMAGE, self.image.as_str())];
        if let Some(point) = &self.point_source_catalog {
            entries.push((POINT_SOURCE_CATALOG, point.as_str()));
        }
        if let Some(segment) = &self.segment_source_catalog {
            entries.push((SEGMENT_SOURCE_CATALOG, segment.as_str()));
        }
        entries
    }
}

/// Generator for each category.
fn generator_for(
    category: ProductCategory,
) -> fn(&[&str]) -> Result<ProductFilenames, NamingError> {
    match category {
        ProductCategory::SingleExposure => single_exposure_product_filenames,
        ProductCategory::Filter => filter_product_filenames,
        ProductCategory::TotalDetection => total_detection_product_filenames,
        ProductCategory::MultivisitMosaic => multivisit_mosaic_product_filenames,
    }
}

/// Generate filenames for a product given its category label and info string.
///
/// `product_category` is matched by phrase prefix (in [`ProductCategory::ALL`]
/// order), so a full product label such as `"filter product 01"` works. The
/// first info field (proposal id) is zero-padded to five characters for every
/// category but multivisit mosaics, whose first field is a group id.
pub fn run_generator(
    product_category: &str,
    obs_info: &str,
) -> Result<ProductFilenames, NamingError> {
    let category = ProductCategory::from_label(product_category)
        .ok_or_else(|| NamingError::UnknownCategory(product_category.to_string()))?;

    let mut fields: Vec<String> = obs_info.split(' ').map(str::to_string).collect();
    if category != ProductCategory::MultivisitMosaic {
        fields[0] = format!("{:0>width$}", fields[0], width = PROPOSAL_ID_WIDTH);
    }

    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
    generator_for(category)(&fields)
}

/// Filenames of every product of an obset, in product order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObsetFilenames {
    entries: Vec<(ProductId, ProductFilenames)>,
}

impl ObsetFilenames {
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &ProductFilenames)> {
        self.entries.iter().map(|(id, names)| (id, names))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a product's filenames by its label.
    pub fn get(&self, label: &str) -> Option<&ProductFilenames> {
        self.entries
            .iter()
            .find(|(id, _)| id.to_string() == label)
            .map(|(_, names)| names)
    }
}

impl Serialize for ObsetFilenames {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, names) in &self.entries {
            map.serialize_entry(&id.to_string(), names)?;
        }
        map.end()
    }
}

/// Generate filenames for every product of an obset.
pub fn generate_product_filenames(products: &ObsetProducts) -> Result<ObsetFilenames, NamingError> {
    let entries = products
        .iter()
        .map(|(id, entry)| Ok((*id, run_generator(&id.to_string(), &entry.info)?)))
        .collect::<Result<Vec<_>, NamingError>>()?;
    Ok(ObsetFilenames { entries })
}

/// Field at `position`, or a descriptive error when the info string is short.
fn field<'a>(
    fields: &[&'a str],
    category: ProductCategory,
    position: usize,
    name: &'static str,
) -> Result<&'a str, NamingError> {
    fields
        .get(position)
        .copied()
        .ok_or(NamingError::MissingField {
            category,
            position,
            name,
        })
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Proposal, obset, instrument, detector and filter fields joined with `_`.
fn visit_prefix(fields: &[&str], category: ProductCategory) -> Result<String, NamingError> {
    const NAMES: [&str; 5] = ["proposal_id", "obset_id", "instrument", "detector", "filter"];
    let parts = NAMES
        .iter()
        .enumerate()
        .map(|(pos, &name)| field(fields, category, pos, name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("_"))
}

pub fn single_exposure_product_filenames(fields: &[&str]) -> Result<ProductFilenames, NamingError> {
    let category = ProductCategory::SingleExposure;
    let prefix = visit_prefix(fields, category)?;
    let ipppssoot = field(fields, category, 5, "ipppssoot")?;
    let filetype = field(fields, category, 6, "filetype")?;

    let basename = format!("hst_{prefix}_{}_{filetype}", truncate(ipppssoot, 8));
    Ok(ProductFilenames::image_only(format!("{basename}.fits")))
}

pub fn filter_product_filenames(fields: &[&str]) -> Result<ProductFilenames, NamingError> {
    let category = ProductCategory::Filter;
    let prefix = visit_prefix(fields, category)?;
    let ipppssoot = field(fields, category, 5, "ipppssoot")?;
    let filetype = field(fields, category, 6, "filetype")?;

    let basename = format!("hst_{prefix}_{}", truncate(ipppssoot, 6));
    let image = format!("{basename}_{filetype}.fits");
    Ok(ProductFilenames::with_catalogs(image, &basename))
}

pub fn total_detection_product_filenames(
    fields: &[&str],
) -> Result<ProductFilenames, NamingError> {
    let category = ProductCategory::TotalDetection;
    let proposal_id = field(fields, category, 0, "proposal_id")?;
    let obset_id = field(fields, category, 1, "obset_id")?;
    let instrument = field(fields, category, 2, "instrument")?;
    let detector = field(fields, category, 3, "detector")?;
    let ipppssoot = field(fields, category, 4, "ipppssoot")?;
    let filetype = field(fields, category, 5, "filetype")?;

    let basename = format!(
        "hst_{proposal_id}_{obset_id}_{instrument}_{detector}_total_{}",
        truncate(ipppssoot, 6)
    );
    let image = format!("{basename}_{filetype}.fits");
    Ok(ProductFilenames::with_catalogs(image, &basename))
}

pub fn multivisit_mosaic_product_filenames(
    fields: &[&str],
) -> Result<ProductFilenames, NamingError> {
    let category = ProductCategory::MultivisitMosaic;
    let group_id = field(fields, category, 0, "group_id")?;
    let instrument = field(fields, category, 1, "instrument")?;
    let detector = field(fields, category, 2, "detector")?;
    let filter = field(fields, category, 3, "filter")?;
    let filetype = field(fields, category, 4, "filetype")?;

    let basename = format!("hst_mos{group_id}_{instrument}_{detector}_{filter}");
    let image = format!("{basename} {filetype}.fits");
    Ok(ProductFilenames::with_catalogs(image, &basename))
}
