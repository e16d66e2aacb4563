//! The trained model artifact and the hydration step that produces it from
//! raw engine outputs.

use crate::config::TrainingPlan;
use crate::engine::{COEFFICIENTS_OUT, EngineOutputs};
use crate::table::{LabeledMatrix, TableError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Engine output shapes inconsistent with the training plan. Fatal and
/// never retried; the bundle that produced the outputs is already gone.
#[derive(Error, Debug)]
pub enum HydrationError {
    #[error("engine output is missing the named binding '{0}'")]
    MissingOutput(String),
    #[error(
        "{supplied} label names were supplied, but the coefficient matrix has {columns} columns; the label list must have exactly one more entry than the matrix has columns"
    )]
    LabelCountMismatch { supplied: usize, columns: usize },
    #[error(
        "the coefficient matrix has {rows} rows, but {features} feature names were derived from the training frame"
    )]
    FeatureCountMismatch { rows: usize, features: usize },
    #[error(
        "the probability matrix has {columns} columns, but the model distinguishes {classes} classes"
    )]
    ProbabilityColumnMismatch { columns: usize, classes: usize },
    #[error("output table shape mismatch: {0}")]
    Table(#[from] TableError),
}

/// Failures reading or writing the serialized model artifact.
#[derive(Error, Debug)]
pub enum ModelIoError {
    #[error("Failed to read or write model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// A trained multinomial logistic regression model.
///
/// Immutable once hydrated: the only entity in this crate whose lifetime
/// extends beyond a single orchestration call, so it is safe to share
/// across concurrent predictions. Coefficient rows are feature names
/// (including the intercept row when one was fit); columns are the
/// `classes - 1` non-baseline class labels. The baseline category carries
/// no explicit column, per the reference-category convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    classes: usize,
    label_names: Vec<String>,
    y_idx: usize,
    y_col_name: String,
    intercept: bool,
    shift_and_rescale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform_path: Option<PathBuf>,
    coefficients: LabeledMatrix,
}

impl Model {
    pub fn coefficients(&self) -> &LabeledMatrix {
        &self.coefficients
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn y_idx(&self) -> usize {
        self.y_idx
    }

    pub fn y_col_name(&self) -> &str {
        &self.y_col_name
    }

    pub fn intercept(&self) -> bool {
        self.intercept
    }

    pub fn shift_and_rescale(&self) -> bool {
        self.shift_and_rescale
    }

    /// Bookkeeping location of a persisted copy, if any. Never set by the
    /// orchestration core itself.
    pub fn model_path(&self) -> Option<&PathBuf> {
        self.model_path.as_ref()
    }

    pub fn transform_path(&self) -> Option<&PathBuf> {
        self.transform_path.as_ref()
    }

    /// Saves the model to a human-readable TOML file.
    pub fn save(&self, path: &str) -> Result<(), ModelIoError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads a model previously written by [`Model::save`].
    pub fn load(path: &str) -> Result<Self, ModelIoError> {
        let toml_string = fs::read_to_string(path)?;
        let model = toml::from_str(&toml_string)?;
        Ok(model)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Multinomial logistic regression model")?;
        writeln!(
            f,
            "  classes: {} [{}]",
            self.classes,
            self.label_names.join(", ")
        )?;
        writeln!(
            f,
            "  response: '{}' (column {})",
            self.y_col_name, self.y_idx
        )?;
        writeln!(
            f,
            "  intercept: {}, shift_and_rescale: {}",
            self.intercept, self.shift_and_rescale
        )?;
        writeln!(f, "  coefficients:")?;
        write!(f, "{}", self.coefficients)
    }
}

/// Converts raw training outputs into a [`Model`].
///
/// The coefficient matrix is taken from the `B` binding; its columns are
/// labeled with the first `classes - 1` class names (supplied or
/// synthesized) and its rows with the plan's feature names. A supplied
/// label list whose length disagrees with the matrix shape is rejected
/// rather than silently sliced.
pub fn hydrate(mut outputs: EngineOutputs, plan: &TrainingPlan) -> Result<Model, HydrationError> {
    let coefficients = outputs
        .take_matrix(COEFFICIENTS_OUT)
        .ok_or_else(|| HydrationError::MissingOutput(COEFFICIENTS_OUT.to_string()))?;

    let classes = coefficients.ncols() + 1;
    let label_names: Vec<String> = if plan.label_names().is_empty() {
        (1..=classes).map(|i| format!("class:{i}")).collect()
    } else {
        if plan.label_names().len() != classes {
            return Err(HydrationError::LabelCountMismatch {
                supplied: plan.label_names().len(),
                columns: coefficients.ncols(),
            });
        }
        plan.label_names().to_vec()
    };

    if coefficients.nrows() != plan.feature_names().len() {
        return Err(HydrationError::FeatureCountMismatch {
            rows: coefficients.nrows(),
            features: plan.feature_names().len(),
        });
    }

    // The baseline category is the excluded last label.
    let column_labels = label_names[..classes - 1].to_vec();
    let coefficients = LabeledMatrix::new(coefficients, column_labels)?
        .with_row_names(plan.feature_names().to_vec())?;

    log::info!(
        "hydrated model: {classes} classes, {} features, response '{}'",
        plan.feature_names().len(),
        plan.y_col_name(),
    );

    Ok(Model {
        classes,
        label_names,
        y_idx: plan.y_idx(),
        y_col_name: plan.y_col_name().to_string(),
        intercept: plan.intercept(),
        shift_and_rescale: plan.shift_and_rescale(),
        model_path: None,
        transform_path: None,
        coefficients,
    })
}
