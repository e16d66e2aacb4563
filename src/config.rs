//! Training configuration and its validated form.
//!
//! `TrainingConfig` is the caller-facing value; `TrainingPlan` is the
//! immutable stage produced once validation has passed and the frame schema
//! has been consulted. No engine call is ever attempted before a plan
//! exists, and a plan never changes after construction, so everything
//! downstream (argument encoding, hydration) can read from it freely.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved feature name for the intercept term, appended to the feature
/// list when `intercept == true`.
pub const INTERCEPT_NAME: &str = "(Intercept)";

/// Caller-supplied training configuration.
///
/// The `Option` fields distinguish "not supplied" from any concrete value:
/// a `None` parameter is omitted from the engine bundle entirely and the
/// engine applies its own default, which is not the same thing as passing
/// zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub intercept: bool,
    pub shift_and_rescale: bool,
    pub tolerance: Option<f64>,
    pub outer_iter_max: Option<i64>,
    pub inner_iter_max: Option<i64>,
    pub lambda: Option<f64>,
    pub label_names: Vec<String>,
}

/// Rejections of a training request before any engine invocation. The first
/// violated rule aborts; there is no aggregation and no soft failure.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("no training data was provided: the input frame is empty")]
    MissingTrainingData,
    #[error("the response column '{0}' was not found in the training frame")]
    ResponseColumnNotFound(String),
    #[error("'inner_iter_max' must be non-negative, got {0}")]
    NegativeInnerIterMax(i64),
    #[error("'outer_iter_max' must be non-negative, got {0}")]
    NegativeOuterIterMax(i64),
    #[error("'lambda' (regularization strength) must be non-negative, got {0}")]
    NegativeLambda(f64),
    #[error(
        "'shift_and_rescale' requires an intercept term; enable 'intercept' or disable rescaling"
    )]
    RescaleWithoutIntercept,
}

/// A validated training request: the config's fields plus everything derived
/// from the frame schema that both argument encoding and model hydration
/// need. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    intercept: bool,
    shift_and_rescale: bool,
    tolerance: Option<f64>,
    outer_iter_max: Option<i64>,
    inner_iter_max: Option<i64>,
    lambda: Option<f64>,
    label_names: Vec<String>,
    feature_names: Vec<String>,
    y_idx: usize,
    y_col_name: String,
}

impl TrainingPlan {
    /// Validates the configuration against the training frame and derives
    /// the feature list and response-column identity.
    pub fn new(
        config: &TrainingConfig,
        data: &DataFrame,
        response: &str,
    ) -> Result<Self, ValidationError> {
        if data.height() == 0 || data.width() == 0 {
            return Err(ValidationError::MissingTrainingData);
        }
        if let Some(mii) = config.inner_iter_max
            && mii < 0
        {
            return Err(ValidationError::NegativeInnerIterMax(mii));
        }
        if let Some(moi) = config.outer_iter_max
            && moi < 0
        {
            return Err(ValidationError::NegativeOuterIterMax(moi));
        }
        if let Some(reg) = config.lambda
            && reg < 0.0
        {
            return Err(ValidationError::NegativeLambda(reg));
        }
        if config.shift_and_rescale && !config.intercept {
            return Err(ValidationError::RescaleWithoutIntercept);
        }

        let y_idx = data
            .get_column_index(response)
            .ok_or_else(|| ValidationError::ResponseColumnNotFound(response.to_string()))?;

        let mut feature_names: Vec<String> = data
            .get_column_names()
            .iter()
            .filter(|name| name.as_str() != response)
            .map(|name| name.to_string())
            .collect();
        if config.intercept {
            feature_names.push(INTERCEPT_NAME.to_string());
        }

        log::debug!(
            "training plan: response '{response}' at column {y_idx}, {} features, icpt={}",
            feature_names.len(),
            icpt_code(config.intercept, config.shift_and_rescale),
        );

        Ok(Self {
            intercept: config.intercept,
            shift_and_rescale: config.shift_and_rescale,
            tolerance: config.tolerance,
            outer_iter_max: config.outer_iter_max,
            inner_iter_max: config.inner_iter_max,
            lambda: config.lambda,
            label_names: config.label_names.clone(),
            feature_names,
            y_idx,
            y_col_name: response.to_string(),
        })
    }

    /// The engine's 3-valued intercept-mode code.
    pub fn icpt(&self) -> i64 {
        icpt_code(self.intercept, self.shift_and_rescale)
    }

    pub fn intercept(&self) -> bool {
        self.intercept
    }

    pub fn shift_and_rescale(&self) -> bool {
        self.shift_and_rescale
    }

    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    pub fn outer_iter_max(&self) -> Option<i64> {
        self.outer_iter_max
    }

    pub fn inner_iter_max(&self) -> Option<i64> {
        self.inner_iter_max
    }

    pub fn lambda(&self) -> Option<f64> {
        self.lambda
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn y_idx(&self) -> usize {
        self.y_idx
    }

    pub fn y_col_name(&self) -> &str {
        &self.y_col_name
    }
}

fn icpt_code(intercept: bool, shift_and_rescale: bool) -> i64 {
    match (intercept, shift_and_rescale) {
        (false, _) => 0,
        (true, false) => 1,
        (true, true) => 2,
    }
}
