//! Boundary between user-facing `polars` frames and the `ndarray` matrices
//! the engine protocol carries.
//!
//! Input data arrives as a labeled frame (from a TSV file or built by the
//! caller). Everything past this module works on plain `Array2<f64>` /
//! `Array1<f64>` plus the column names captured here. Failures are assumed
//! to be user-input errors, so `FrameError` messages name the offending
//! column and what was expected of it.

use ndarray::{Array1, Array2, ShapeBuilder};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Failures while reading or reshaping user-provided tabular data.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input frame. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("Missing or null values were found in the column '{0}'. Complete data is required.")]
    MissingValuesFound(String),
    #[error("Non-finite values (NaN or Infinity) were found in the column '{0}'.")]
    NonFiniteValuesFound(String),
}

/// Reads a tab-separated file with a header row into a `DataFrame`.
pub fn read_frame(path: &Path) -> Result<DataFrame, FrameError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
        )
        .finish()?;
    log::debug!(
        "loaded frame from '{}': {} rows, {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Extracts a single column as `f64` values, rejecting nulls, non-numeric
/// data, and non-finite values.
pub fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, FrameError> {
    let column = df
        .column(column_name)
        .map_err(|_| FrameError::ColumnNotFound(column_name.to_string()))?;
    if column.null_count() > 0 {
        return Err(FrameError::MissingValuesFound(column_name.to_string()));
    }

    let casted = match column.cast(&DataType::Float64) {
        Ok(casted) => casted,
        Err(_) => {
            return Err(FrameError::ColumnWrongType {
                column_name: column_name.to_string(),
                expected_type: "f64 (numeric)",
                found_type: format!("{:?}", column.dtype()),
            });
        }
    };
    if casted.null_count() > 0 {
        return Err(FrameError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: format!("{:?}", column.dtype()),
        });
    }

    let chunked = casted.f64()?.rechunk();
    let values: Vec<f64> = chunked.into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(FrameError::NonFiniteValuesFound(column_name.to_string()));
    }
    Ok(values)
}

/// Converts every column of the frame into one `[n_rows, n_cols]` matrix,
/// returning the column names alongside it.
pub fn to_feature_matrix(df: &DataFrame) -> Result<(Array2<f64>, Vec<String>), FrameError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();

    let mut buffer = Vec::with_capacity(df.height() * names.len());
    for name in &names {
        let mut column = extract_numeric_column(df, name)?;
        buffer.append(&mut column);
    }

    let matrix = Array2::from_shape_vec((df.height(), names.len()).f(), buffer)
        .expect("column arrays have consistent dimensions");
    Ok((matrix, names))
}

/// Splits the frame around the response column: the remaining columns become
/// the feature matrix `X` (with their names), the response becomes the label
/// vector `Y`.
pub fn split_response(
    df: &DataFrame,
    response: &str,
) -> Result<(Array2<f64>, Vec<String>, Array1<f64>), FrameError> {
    let y = Array1::from_vec(extract_numeric_column(df, response)?);
    let features = df.drop(response)?;
    let (x, names) = to_feature_matrix(&features)?;
    Ok((x, names, y))
}
