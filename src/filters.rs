//! Filter name normalization.
//!
//! Instruments with two filter wheels report both wheels in one manifest
//! column, separated by `;` (e.g. `F606W;POL60`, `F110W;CLEAR2L`). Products
//! are named after a single canonical filter token:
//!
//! - `clear*` positions are dropped: `F110W;CLEAR2L` → `f110w`
//! - two clear positions collapse to `clear`: `CLEAR1L;CLEAR2L` → `clear`
//! - two real filters are joined with a dash: `F435W;F814W` → `f435w-f814w`
//! - a polarizer always goes second: `POL60;F606W` → `f606w-pol60`
//!
//! The result is lower-case and stable under re-normalization.

use thiserror::Error;

/// Separator between filter wheel positions in the manifest column.
pub const FILTER_SEPARATOR: char = ';';

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("No filter name in filter column: {0:?}")]
    NoFilterName(String),
}

/// Collapse a raw filter column value into one canonical filter name.
///
/// Positions that are blank after trimming are dropped, so a dangling
/// separator (`F606W;`) normalizes to `f606w` rather than `f606w-`. This
/// deliberately departs from the poller, which keeps the empty position and
/// leaves a trailing dash in the product name.
pub fn determine_filter_name(raw_filter: &str) -> Result<String, FilterError> {
    let lowered = raw_filter.to_lowercase();
    let positions: Vec<&str> = lowered
        .split(FILTER_SEPARATOR)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    if positions.is_empty() {
        return Err(FilterError::NoFilterName(raw_filter.to_string()));
    }

    let mut kept: Vec<&str> = positions
        .into_iter()
        .filter(|f| !f.contains("clear"))
        .collect();

    if kept.is_empty() {
        return Ok("clear".to_string());
    }

    if kept.len() == 2 && kept[0].starts_with("pol") {
        kept.reverse();
    }

    Ok(kept.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_filter_is_lowercased() {
        assert_eq!(determine_filter_name("F110W").unwrap(), "f110w");
    }

    #[test]
    fn clear_position_is_dropped() {
        assert_eq!(determine_filter_name("F110W;CLEAR2L").unwrap(), "f110w");
        assert_eq!(determine_filter_name("CLEAR1L;F814W").unwrap(), "f814w");
    }

    #[test]
    fn both_clear_collapse_to_clear() {
        assert_eq!(determine_filter_name("CLEAR1L;CLEAR2L").unwrap(), "clear");
    }

    #[test]
    fn two_filters_joined_with_dash() {
        assert_eq!(determine_filter_name("F435W;F814W").unwrap(), "f435w-f814w");
    }

    #[test]
    fn polarizer_already_second() {
        assert_eq!(determine_filter_name("F606W;POL60").unwrap(), "f606w-pol60");
    }

    #[test]
    fn polarizer_moved_second() {
        assert_eq!(determine_filter_name("POL60;F606W").unwrap(), "f606w-pol60");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "F110W;CLEAR2L",
            "CLEAR1L;CLEAR2L",
            "POL60;F606W",
            "F435W;F814W",
            "F160W",
        ] {
            let once = determine_filter_name(raw).unwrap();
            let twice = determine_filter_name(&once).unwrap();
            assert_eq!(once, twice, "re-normalizing {raw}");
        }
    }

    #[test]
    fn empty_column_is_an_error() {
        assert_eq!(
            determine_filter_name(""),
            Err(FilterError::NoFilterName(String::new()))
        );
        assert!(matches!(
            determine_filter_name(" ; "),
            Err(FilterError::NoFilterName(_))
        ));
    }

    #[test]
    fn blank_position_is_ignored() {
        assert_eq!(determine_filter_name("F606W;").unwrap(), "f606w");
        assert_eq!(determine_filter_name(";POL60V").unwrap(), "pol60v");
    }
}
