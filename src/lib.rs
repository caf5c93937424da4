//! # obset-products
//!
//! Interprets the obset manifests written by the HST pipeline poller and
//! derives the canonical names of every Hubble Legacy Archive product the
//! pipeline will create from them.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Interpret  manifest rows  →  obset tree  →  products   (info + input files)
//! 2. Name       product info   →  filenames                 (image + catalogs)
//! ```
//!
//! Both stages are pure functions of their input. The only shared state is
//! the fixed filename-prefix → instrument table in [`types`]. Stage 2 also
//! accepts product info assembled elsewhere, which is how multivisit mosaic
//! products (never produced by stage 1) get their names.
//!
//! ```rust
//! use obset_products::config::Config;
//! use obset_products::naming::run_generator;
//! use obset_products::products::interpret_obset_input;
//!
//! let manifest = "\
//! ia1s70jtq_flt.fits,11150,A1S,70,149.232269,F110W,IR,/ifs/archive/ia1s70jtq_flt.fits
//! ia1s70jwq_flt.fits,11150,A1S,70,0.91161,F160W,IR,/ifs/archive/ia1s70jwq_flt.fits
//! ";
//! let products = interpret_obset_input(manifest.as_bytes(), &Config::default()).unwrap();
//! let tdp = products.get("total detection product 00").unwrap();
//! assert_eq!(tdp.info, "11150 70 wfc3 ir ia1s70jtq drz");
//!
//! let names = run_generator("total detection product 00", &tdp.info).unwrap();
//! assert_eq!(names.image, "hst_11150_70_wfc3_ir_total_ia1s70_drz.fits");
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manifest`] | Reads the header-less 8-column poller manifest into typed rows |
//! | [`filters`] | Collapses dual filter wheel values into one canonical filter name |
//! | [`tree`] | Groups rows by detector, then filter, in manifest order |
//! | [`products`] | Numbers total detection, filter and single exposure products |
//! | [`naming`] | Per-category filename generators and the category dispatcher |
//! | [`config`] | `obset-products.toml` loading, merging and validation |
//! | [`types`] | Shared types: rows, instruments, product categories and ids |
//! | [`output`] | CLI output formatting |
//!
//! # Errors
//!
//! Each stage has its own error enum. Manifest contents problems
//! ([`manifest::ManifestError`] row/column variants,
//! [`filters::FilterError`]) are kept apart from unknown instruments and
//! unknown product categories ([`naming::NamingError`]), so callers can tell
//! bad data from bad wiring. Nothing is returned on failure: a call produces
//! the whole product list or an error.

pub mod config;
pub mod filters;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod products;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
