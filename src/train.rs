//! Top-level training orchestration: validate the configuration, encode the
//! engine bundle, invoke the training script, hydrate the result.

use crate::args;
use crate::config::{TrainingConfig, TrainingPlan, ValidationError};
use crate::engine::{Engine, EngineError};
use crate::frame::FrameError;
use crate::model::{self, HydrationError, Model};
use polars::prelude::DataFrame;
use thiserror::Error;

/// Any failure on the training path, in the order the stages run.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Hydration(#[from] HydrationError),
}

/// Trains a multinomial logistic regression model on `data`, with the
/// labels in the `response` column.
///
/// Strictly sequential: plan construction must succeed before any bundle is
/// built, and the engine is invoked exactly once. The first failing stage
/// aborts the call.
pub fn train<E: Engine>(
    engine: &E,
    config: &TrainingConfig,
    data: &DataFrame,
    response: &str,
) -> Result<Model, TrainError> {
    let plan = TrainingPlan::new(config, data, response)?;
    let bundle = args::build_training_args(&plan, data)?;
    log::info!(
        "invoking training script '{}' on {} rows",
        bundle.script().display(),
        data.height(),
    );
    let outputs = engine.invoke(&bundle)?;
    let model = model::hydrate(outputs, &plan)?;
    Ok(model)
}
