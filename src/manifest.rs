//! Poller manifest reading.
//!
//! The pipeline poller writes one line per exposure of an obset, with no
//! header and exactly eight columns:
//!
//! ```text
//! ia1s70jtq_flt.fits,11150,A1S,70,149.232269,F110W,IR,/ifs/archive/ops/hst/public/ia1s/ia1s70jtq/ia1s70jtq_flt.fits
//! ia1s70jwq_flt.fits,11150,A1S,70,0.91161,F160W,IR,/ifs/archive/ops/hst/public/ia1s/ia1s70jwq/ia1s70jwq_flt.fits
//! ```
//!
//! which are filename, proposal_id, program_id, obset_id, exposure time,
//! filters, detector and archive path. The instrument is not a column: it is
//! derived once from the first filename and applied to every row, since data
//! from different instruments is never combined in one obset.

use crate::config::ManifestConfig;
use crate::types::{ExposureRow, Instrument};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Number of columns in a poller manifest line.
pub const MANIFEST_COLUMNS: usize = 8;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Line {line}: expected {MANIFEST_COLUMNS} columns, found {found}")]
    ColumnCount { line: u64, found: usize },
    #[error("Line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("Expected {expected} manifest rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("Manifest contains no exposures")]
    Empty,
    #[error("Unrecognized instrument for exposure {0:?}")]
    UnknownInstrument(String),
}

/// One manifest line, before the instrument is attached.
#[derive(Debug, Deserialize)]
struct ManifestRecord {
    filename: String,
    proposal_id: u32,
    program_id: String,
    obset_id: u32,
    exposure_time: f64,
    filters: String,
    detector: String,
    archive_path: String,
}

impl ManifestRecord {
    fn into_row(self, instrument: Instrument) -> ExposureRow {
        ExposureRow {
            filename: self.filename,
            proposal_id: self.proposal_id,
            program_id: self.program_id,
            obset_id: self.obset_id,
            exposure_time: self.exposure_time,
            filters: self.filters,
            detector: self.detector,
            archive_path: self.archive_path,
            instrument,
        }
    }
}

/// Read all exposures from a header-less poller manifest.
pub fn read_manifest<R: Read>(
    reader: R,
    config: &ManifestConfig,
) -> Result<Vec<ExposureRow>, ManifestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(config.delimiter_byte())
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != MANIFEST_COLUMNS {
            return Err(ManifestError::ColumnCount {
                line,
                found: record.len(),
            });
        }
        let parsed: ManifestRecord =
            record
                .deserialize(None)
                .map_err(|e| ManifestError::MalformedRow {
                    line,
                    reason: describe_deserialize_error(&e),
                })?;
        records.push(parsed);
    }

    let first = records.first().ok_or(ManifestError::Empty)?;
    let instrument = Instrument::from_filename(&first.filename)
        .ok_or_else(|| ManifestError::UnknownInstrument(first.filename.clone()))?;

    tracing::debug!(
        rows = records.len(),
        instrument = instrument.name(),
        "read poller manifest"
    );

    Ok(records
        .into_iter()
        .map(|record| record.into_row(instrument))
        .collect())
}

/// Read a manifest held in memory.
pub fn parse_manifest(
    text: &str,
    config: &ManifestConfig,
) -> Result<Vec<ExposureRow>, ManifestError> {
    read_manifest(text.as_bytes(), config)
}

/// Read a manifest file from disk.
pub fn load_manifest(
    path: &Path,
    config: &ManifestConfig,
) -> Result<Vec<ExposureRow>, ManifestError> {
    read_manifest(File::open(path)?, config)
}

/// Fail unless the manifest has exactly `expected` rows.
pub fn check_row_count(rows: &[ExposureRow], expected: usize) -> Result<(), ManifestError> {
    if rows.len() != expected {
        return Err(ManifestError::RowCount {
            expected,
            found: rows.len(),
        });
    }
    Ok(())
}

/// Name the offending column instead of echoing csv's positional message.
fn describe_deserialize_error(err: &csv::Error) -> String {
    const COLUMNS: [&str; MANIFEST_COLUMNS] = [
        "filename",
        "proposal_id",
        "program_id",
        "obset_id",
        "exposure_time",
        "filters",
        "detector",
        "archive_path",
    ];
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => match err.field() {
            Some(field) => {
                let column = COLUMNS.get(field as usize).copied().unwrap_or("unknown");
                format!("invalid {column}: {}", err.kind())
            }
            None => err.to_string(),
        },
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TWO_ROWS: &str = "\
ia1s70jtq_flt.fits,11150,A1S,70,149.232269,F110W,IR,/ifs/archive/ops/hst/public/ia1s/ia1s70jtq/ia1s70jtq_flt.fits
ia1s70jwq_flt.fits,11150,A1S,70,0.91161,F160W,IR,/ifs/archive/ops/hst/public/ia1s/ia1s70jwq/ia1s70jwq_flt.fits
";

    #[test]
    fn reads_all_columns() {
        let rows = parse_manifest(TWO_ROWS, &ManifestConfig::default()).unwrap();
        assert_eq!(rows.len(), 2);
        let row = &rows[0];
        assert_eq!(row.filename, "ia1s70jtq_flt.fits");
        assert_eq!(row.proposal_id, 11150);
        assert_eq!(row.program_id, "A1S");
        assert_eq!(row.obset_id, 70);
        assert_eq!(row.exposure_time, 149.232269);
        assert_eq!(row.filters, "F110W");
        assert_eq!(row.detector, "IR");
        assert!(row.archive_path.ends_with("ia1s70jtq/ia1s70jtq_flt.fits"));
        assert_eq!(row.instrument, Instrument::Wfc3);
    }

    #[test]
    fn instrument_comes_from_first_row() {
        let text = "\
j8cw03f6q_flc.fits,10265,8CW,3,500.0,F606W;CLEAR2L,WFC,/archive/j8cw03f6q_flc.fits
i8cw03f7q_flc.fits,10265,8CW,3,500.0,F814W;CLEAR2L,WFC,/archive/i8cw03f7q_flc.fits
";
        let rows = parse_manifest(text, &ManifestConfig::default()).unwrap();
        assert!(rows.iter().all(|r| r.instrument == Instrument::Acs));
    }

    #[test]
    fn blank_lines_and_padding_are_tolerated() {
        let text = "\n ia1s70jtq_flt.fits , 11150 ,A1S,70,1.0,F110W,IR,/a/b.fits\n\n";
        let rows = parse_manifest(text, &ManifestConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].filename, "ia1s70jtq_flt.fits");
        assert_eq!(rows[0].proposal_id, 11150);
    }

    #[test]
    fn custom_delimiter() {
        let text = "ia1s70jtq_flt.fits|11150|A1S|70|1.0|F110W|IR|/a/b.fits\n";
        let config = ManifestConfig { delimiter: '|' };
        let rows = parse_manifest(text, &config).unwrap();
        assert_eq!(rows[0].detector, "IR");
    }

    #[test]
    fn wrong_column_count_is_rejected() {
        let text = "ia1s70jtq_flt.fits,11150,A1S,70,1.0,F110W,IR\n";
        let err = parse_manifest(text, &ManifestConfig::default()).unwrap_err();
        assert!(matches!(err, ManifestError::ColumnCount { line: 1, found: 7 }));
    }

    #[test]
    fn non_numeric_proposal_is_rejected() {
        let text = "ia1s70jtq_flt.fits,ABCDE,A1S,70,1.0,F110W,IR,/a/b.fits\n";
        let err = parse_manifest(text, &ManifestConfig::default()).unwrap_err();
        match err {
            ManifestError::MalformedRow { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("proposal_id"), "reason was {reason}");
            }
            other => panic!("expected MalformedRow, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_obset_is_rejected() {
        let text = "\
ia1s70jtq_flt.fits,11150,A1S,70,1.0,F110W,IR,/a/b.fits
ia1s70jwq_flt.fits,11150,A1S,7a,1.0,F160W,IR,/a/c.fits
";
        let err = parse_manifest(text, &ManifestConfig::default()).unwrap_err();
        assert!(matches!(err, ManifestError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let err = parse_manifest("\n\n", &ManifestConfig::default()).unwrap_err();
        assert!(matches!(err, ManifestError::Empty));
    }

    #[test]
    fn unknown_instrument_is_rejected() {
        let text = "za1s70jtq_flt.fits,11150,A1S,70,1.0,F110W,IR,/a/b.fits\n";
        let err = parse_manifest(text, &ManifestConfig::default()).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownInstrument(f) if f == "za1s70jtq_flt.fits"));
    }

    #[test]
    fn upper_case_instrument_prefix_is_rejected() {
        let text = "IA1S70JTQ_FLT.FITS,11150,A1S,70,1.0,F110W,IR,/a/b.fits\n";
        let err = parse_manifest(text, &ManifestConfig::default()).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownInstrument(f) if f == "IA1S70JTQ_FLT.FITS"));
    }

    #[test]
    fn row_count_check() {
        let rows = parse_manifest(TWO_ROWS, &ManifestConfig::default()).unwrap();
        assert!(check_row_count(&rows, 2).is_ok());
        assert!(matches!(
            check_row_count(&rows, 3),
            Err(ManifestError::RowCount {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn load_manifest_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ia1s70.out");
        fs::write(&path, TWO_ROWS).unwrap();
        let rows = load_manifest(&path, &ManifestConfig::default()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_manifest(&tmp.path().join("nope.out"), &ManifestConfig::default())
            .unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }
}
