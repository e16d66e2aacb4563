//! The external matrix-computation engine as an opaque synchronous service.
//!
//! The engine runs batch scripts over matrix inputs and hands back named
//! matrix artifacts. This crate never looks inside it: the whole contract is
//! `invoke(bundle) -> named outputs`, a blocking call with no retry or
//! cancellation semantics. A failed or hung invocation is fatal for the call
//! that made it.

use crate::args::ArgumentBundle;
use ndarray::Array2;
use std::collections::HashMap;
use thiserror::Error;

/// Script executed for training. Solves the multinomial logistic regression
/// problem and emits the coefficient matrix under [`COEFFICIENTS_OUT`].
pub const TRAIN_SCRIPT: &str = "scripts/algorithms/MultiLogReg.dml";

/// Script executed for scoring and evaluation. Emits per-class probabilities
/// under [`PROBABILITIES_OUT`] and, in evaluation mode, writes goodness-of-fit
/// statistics to the file named by the `$O` parameter.
pub const PREDICT_SCRIPT: &str = "scripts/algorithms/GLM-predict.dml";

/// Output binding for the trained coefficient matrix.
pub const COEFFICIENTS_OUT: &str = "B";

/// Output binding for the per-class probability matrix.
pub const PROBABILITIES_OUT: &str = "M";

/// `$dfam` value selecting multinomial behavior in the prediction script.
pub const MULTINOMIAL_FAMILY: i64 = 3;

/// `$fmt` value: all matrix artifacts travel in delimited form.
pub const OUTPUT_FORMAT: &str = "csv";

/// Failure of a script invocation itself. The message is whatever the engine
/// reported; this layer propagates it unchanged and never retries.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine script '{script}' failed: {message}")]
    InvocationFailed { script: String, message: String },
    #[error("engine script not found at '{0}'")]
    ScriptNotFound(String),
}

/// Named matrix artifacts returned by one engine invocation. Single-use:
/// hydration takes matrices out by binding name.
#[derive(Debug, Default)]
pub struct EngineOutputs {
    matrices: HashMap<String, Array2<f64>>,
}

impl EngineOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_matrix(&mut self, name: impl Into<String>, values: Array2<f64>) {
        self.matrices.insert(name.into(), values);
    }

    pub fn matrix(&self, name: &str) -> Option<&Array2<f64>> {
        self.matrices.get(name)
    }

    pub fn take_matrix(&mut self, name: &str) -> Option<Array2<f64>> {
        self.matrices.remove(name)
    }
}

/// The narrow seam to the external engine. Implementations are expected to
/// be synchronous; concurrent callers must coordinate on their side.
pub trait Engine {
    fn invoke(&self, bundle: &ArgumentBundle) -> Result<EngineOutputs, EngineError>;
}
