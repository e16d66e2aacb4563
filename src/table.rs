use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when labels do not match the shape of the underlying matrix.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("table has {ncols} columns but {names} column names were provided")]
    ColumnCountMismatch { ncols: usize, names: usize },
    #[error("table has {nrows} rows but {names} row names were provided")]
    RowCountMismatch { nrows: usize, names: usize },
}

/// A 2-D numeric table with named columns and optionally named rows.
///
/// This is the typed form of every matrix artifact this crate hands to its
/// callers: coefficient tables (rows = feature names, columns = non-baseline
/// class labels) and probability tables (rows = input records, columns =
/// class labels). Label lengths are checked at construction, so a
/// `LabeledMatrix` is always internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledMatrix {
    col_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row_names: Option<Vec<String>>,
    values: Array2<f64>,
}

impl LabeledMatrix {
    pub fn new(values: Array2<f64>, col_names: Vec<String>) -> Result<Self, TableError> {
        if values.ncols() != col_names.len() {
            return Err(TableError::ColumnCountMismatch {
                ncols: values.ncols(),
                names: col_names.len(),
            });
        }
        Ok(Self {
            col_names,
            row_names: None,
            values,
        })
    }

    /// Attaches row labels, consuming and returning the table.
    pub fn with_row_names(mut self, row_names: Vec<String>) -> Result<Self, TableError> {
        if self.values.nrows() != row_names.len() {
            return Err(TableError::RowCountMismatch {
                nrows: self.values.nrows(),
                names: row_names.len(),
            });
        }
        self.row_names = Some(row_names);
        Ok(self)
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn row_names(&self) -> Option<&[String]> {
        self.row_names.as_deref()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }
}

impl fmt::Display for LabeledMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stub_width = self
            .row_names
            .as_ref()
            .map(|names| names.iter().map(String::len).max().unwrap_or(0))
            .unwrap_or(0)
            .max(self.values.nrows().to_string().len());

        write!(f, "{:>stub_width$}", "")?;
        for name in &self.col_names {
            write!(f, "  {name:>12}")?;
        }
        writeln!(f)?;

        for (i, row) in self.values.rows().into_iter().enumerate() {
            match &self.row_names {
                Some(names) => write!(f, "{:>stub_width$}", names[i])?,
                None => write!(f, "{i:>stub_width$}")?,
            }
            for value in row {
                write!(f, "  {value:>12.6}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn column_name_count_is_enforced() {
        let err = LabeledMatrix::new(array![[1.0, 2.0]], vec!["a".to_string()]).unwrap_err();
        assert_eq!(err, TableError::ColumnCountMismatch { ncols: 2, names: 1 });
    }

    #[test]
    fn row_name_count_is_enforced() {
        let table = LabeledMatrix::new(
            array![[1.0], [2.0]],
            vec!["a".to_string()],
        )
        .unwrap();
        let err = table
            .with_row_names(vec!["r1".to_string()])
            .unwrap_err();
        assert_eq!(err, TableError::RowCountMismatch { nrows: 2, names: 1 });
    }

    #[test]
    fn display_includes_labels_and_values() {
        let table = LabeledMatrix::new(
            array![[0.5, -1.25], [2.0, 0.0]],
            vec!["A".to_string(), "B".to_string()],
        )
        .unwrap()
        .with_row_names(vec!["x1".to_string(), "(Intercept)".to_string()])
        .unwrap();

        let rendered = table.to_string();
        assert!(rendered.contains("A"));
        assert!(rendered.contains("(Intercept)"));
        assert!(rendered.contains("-1.250000"));
    }
}
