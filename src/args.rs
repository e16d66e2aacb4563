//! The argument protocol for one engine invocation.
//!
//! A bundle is built fresh per call and never reused: the script identifier,
//! matrix inputs in the order the script expects them, named scalar
//! parameters (stored with the `$` prefix the engine requires), and the
//! output bindings naming the artifacts the caller wants back.

use crate::config::TrainingPlan;
use crate::engine::{COEFFICIENTS_OUT, OUTPUT_FORMAT, TRAIN_SCRIPT};
use crate::frame::{self, FrameError};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use std::fmt;
use std::path::{Path, PathBuf};

/// A named scalar parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// One engine invocation's worth of arguments. Ephemeral: built, handed to
/// [`crate::engine::Engine::invoke`], dropped.
#[derive(Debug, Clone)]
pub struct ArgumentBundle {
    script: PathBuf,
    inputs: Vec<(String, Array2<f64>)>,
    params: Vec<(String, ParamValue)>,
    outputs: Vec<String>,
}

impl ArgumentBundle {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            inputs: Vec::new(),
            params: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn add_input(&mut self, name: impl Into<String>, values: Array2<f64>) {
        self.inputs.push((name.into(), values));
    }

    /// Adds a vector input as an `n x 1` matrix, the shape the scripts
    /// expect for label columns.
    pub fn add_vector(&mut self, name: impl Into<String>, values: Array1<f64>) {
        self.inputs.push((name.into(), values.insert_axis(Axis(1))));
    }

    /// Adds a named scalar parameter. The key is stored with the engine's
    /// `$` prefix; callers pass the bare name.
    pub fn add_param(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.params.push((format!("${name}"), value.into()));
    }

    pub fn add_output(&mut self, name: impl Into<String>) {
        self.outputs.push(name.into());
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn inputs(&self) -> &[(String, Array2<f64>)] {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Array2<f64>> {
        self.inputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values)
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    /// Looks up a named parameter by its bare (unprefixed) name.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        let key = format!("${name}");
        self.params
            .iter()
            .find(|(n, _)| n == &key)
            .map(|(_, value)| value)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

/// Encodes a validated training plan plus the training frame into the
/// training script's bundle.
///
/// The optional parameters (`$tol`, `$reg`, `$moi`, `$mii`) appear only when
/// the caller supplied them; the engine applies its own default for any
/// absent key.
pub fn build_training_args(
    plan: &TrainingPlan,
    data: &DataFrame,
) -> Result<ArgumentBundle, FrameError> {
    let (x, _feature_names, y) = frame::split_response(data, plan.y_col_name())?;

    let mut bundle = ArgumentBundle::new(TRAIN_SCRIPT);
    bundle.add_input("X", x);
    bundle.add_vector("Y", y);
    bundle.add_param("icpt", plan.icpt());
    if let Some(tol) = plan.tolerance() {
        bundle.add_param("tol", tol);
    }
    if let Some(reg) = plan.lambda() {
        bundle.add_param("reg", reg);
    }
    if let Some(moi) = plan.outer_iter_max() {
        bundle.add_param("moi", moi);
    }
    if let Some(mii) = plan.inner_iter_max() {
        bundle.add_param("mii", mii);
    }
    bundle.add_param("fmt", OUTPUT_FORMAT);
    bundle.add_output(COEFFICIENTS_OUT);

    log::debug!(
        "training bundle: {} inputs, {} params, outputs {:?}",
        bundle.inputs().len(),
        bundle.params().len(),
        bundle.outputs(),
    );
    Ok(bundle)
}
