//! Prediction dispatch: scoring-only vs. evaluation against known labels.
//!
//! The mode is decided exactly once per call, by checking whether the input
//! frame carries the model's trained response column. The two modes share
//! one base bundle and differ only in which matrices travel with it and in
//! the `$scoring_only` flag; evaluation additionally consumes the
//! statistics file the engine writes as a side channel.

use crate::args::ArgumentBundle;
use crate::engine::{
    Engine, EngineError, MULTINOMIAL_FAMILY, OUTPUT_FORMAT, PREDICT_SCRIPT, PROBABILITIES_OUT,
};
use crate::frame::{self, FrameError};
use crate::model::{HydrationError, Model};
use crate::table::LabeledMatrix;
use polars::prelude::DataFrame;
use std::path::Path;
use thiserror::Error;

/// Column labels of the evaluation statistics table, in their fixed order.
pub const STATISTICS_COLUMNS: [&str; 4] = ["Name", "Y-column", "Scaled", "Value"];

/// Failures during prediction. All fatal; nothing at this layer retries.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Hydration(#[from] HydrationError),
    #[error("failed to read the statistics file: {0}")]
    StatisticsRead(#[from] csv::Error),
    #[error(
        "statistics file row {row} is malformed: {message} (expected 4 fields: Name, Y-column, Scaled, Value)"
    )]
    MalformedStatistics { row: usize, message: String },
}

/// The execution mode for one prediction call, resolved once from the
/// alignment between the input frame and the model's response column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionRequest {
    /// No ground truth available: probabilities only.
    Scoring,
    /// Ground truth present: probabilities plus goodness-of-fit statistics.
    Evaluation,
}

impl PredictionRequest {
    /// The alignment check: evaluation iff the frame carries a column named
    /// like the model's trained response column.
    pub fn resolve(model: &Model, data: &DataFrame) -> Self {
        let has_response = data
            .get_column_names()
            .iter()
            .any(|name| name.as_str() == model.y_col_name());
        if has_response {
            PredictionRequest::Evaluation
        } else {
            PredictionRequest::Scoring
        }
    }

    pub fn is_evaluation(self) -> bool {
        matches!(self, PredictionRequest::Evaluation)
    }
}

/// One row of the evaluation statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticRow {
    pub name: String,
    pub y_column: i64,
    pub scaled: i64,
    pub value: f64,
}

/// The goodness-of-fit table the engine writes during evaluation, re-labeled
/// with the fixed [`STATISTICS_COLUMNS`] header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    rows: Vec<StatisticRow>,
}

impl Statistics {
    pub fn columns() -> [&'static str; 4] {
        STATISTICS_COLUMNS
    }

    pub fn rows(&self) -> &[StatisticRow] {
        &self.rows
    }

    /// Reads the headerless four-column delimited file the engine wrote at
    /// the `$O` path.
    pub fn from_file(path: &Path) -> Result<Self, PredictError> {
        // Flexible so short rows surface as MalformedStatistics with a row
        // number instead of an opaque unequal-lengths error.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != 4 {
                return Err(PredictError::MalformedStatistics {
                    row: i + 1,
                    message: format!("found {} fields", record.len()),
                });
            }
            let parse_num = |field: usize| -> Result<f64, PredictError> {
                record[field].trim().parse::<f64>().map_err(|e| {
                    PredictError::MalformedStatistics {
                        row: i + 1,
                        message: format!("field {} ('{}'): {e}", field + 1, &record[field]),
                    }
                })
            };
            rows.push(StatisticRow {
                name: record[0].trim().to_string(),
                y_column: parse_num(1)? as i64,
                scaled: parse_num(2)? as i64,
                value: parse_num(3)?,
            });
        }
        Ok(Self { rows })
    }
}

/// Probabilities for every input record, plus statistics when the request
/// was an evaluation. Single-use, consumed by the caller.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// Rows = input records, columns = the model's class labels.
    pub probabilities: LabeledMatrix,
    /// Present iff the input frame contained the response column.
    pub statistics: Option<Statistics>,
}

/// Scores or evaluates `data` with a trained model.
///
/// `stats_path` names the file the engine writes evaluation statistics to;
/// it is passed through as the `$O` parameter in both modes but only read
/// back after an evaluation run.
pub fn predict<E: Engine>(
    engine: &E,
    model: &Model,
    data: &DataFrame,
    stats_path: &Path,
) -> Result<PredictionResult, PredictError> {
    let request = PredictionRequest::resolve(model, data);
    log::info!(
        "prediction mode: {}",
        match request {
            PredictionRequest::Scoring => "scoring-only",
            PredictionRequest::Evaluation => "evaluation",
        }
    );

    let mut bundle = ArgumentBundle::new(PREDICT_SCRIPT);
    bundle.add_input("B", model.coefficients().values().clone());
    bundle.add_output(PROBABILITIES_OUT);
    bundle.add_param("O", stats_path.display().to_string());
    bundle.add_param("dfam", MULTINOMIAL_FAMILY);
    bundle.add_param("fmt", OUTPUT_FORMAT);

    match request {
        PredictionRequest::Evaluation => {
            let (x, _names, y) = frame::split_response(data, model.y_col_name())?;
            bundle.add_input("X", x);
            bundle.add_vector("Y", y);
            bundle.add_param("scoring_only", "no");
        }
        PredictionRequest::Scoring => {
            let (x, _names) = frame::to_feature_matrix(data)?;
            bundle.add_input("X", x);
            bundle.add_param("scoring_only", "yes");
        }
    }

    let mut outputs = engine.invoke(&bundle)?;
    let probabilities = outputs
        .take_matrix(PROBABILITIES_OUT)
        .ok_or_else(|| HydrationError::MissingOutput(PROBABILITIES_OUT.to_string()))?;
    if probabilities.ncols() != model.classes() {
        return Err(HydrationError::ProbabilityColumnMismatch {
            columns: probabilities.ncols(),
            classes: model.classes(),
        }
        .into());
    }
    let probabilities = LabeledMatrix::new(probabilities, model.label_names().to_vec())
        .map_err(HydrationError::from)?;

    let statistics = match request {
        PredictionRequest::Evaluation => Some(Statistics::from_file(stats_path)?),
        PredictionRequest::Scoring => None,
    };

    Ok(PredictionResult {
        probabilities,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ParamValue;
    use crate::config::{TrainingConfig, TrainingPlan};
    use crate::engine::{COEFFICIENTS_OUT, EngineOutputs};
    use crate::model::hydrate;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};
    use polars::df;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    /// Canned engine: returns a fixed probability matrix, records the bundle
    /// it was invoked with, and writes a statistics file when the bundle
    /// asks for an evaluation run.
    struct StubEngine {
        probabilities: Array2<f64>,
        seen: RefCell<Option<ArgumentBundle>>,
    }

    impl StubEngine {
        fn new(probabilities: Array2<f64>) -> Self {
            Self {
                probabilities,
                seen: RefCell::new(None),
            }
        }

        fn seen_bundle(&self) -> ArgumentBundle {
            self.seen.borrow().clone().unwrap()
        }
    }

    impl Engine for StubEngine {
        fn invoke(&self, bundle: &ArgumentBundle) -> Result<EngineOutputs, EngineError> {
            *self.seen.borrow_mut() = Some(bundle.clone());
            if bundle.param("scoring_only") == Some(&ParamValue::Str("no".to_string()))
                && let Some(ParamValue::Str(path)) = bundle.param("O")
            {
                fs::write(path, "LOGLHOOD_Z,1,1,-42.5\nACCURACY,1,0,0.91\n")
                    .map_err(|e| EngineError::InvocationFailed {
                        script: bundle.script().display().to_string(),
                        message: e.to_string(),
                    })?;
            }
            let mut outputs = EngineOutputs::new();
            outputs.insert_matrix(PROBABILITIES_OUT, self.probabilities.clone());
            Ok(outputs)
        }
    }

    fn trained_model() -> Model {
        let data = df!(
            "x1" => [1.0, 2.0, 3.0],
            "x2" => [0.1, 0.2, 0.3],
            "species" => [1.0, 2.0, 3.0],
        )
        .unwrap();
        let config = TrainingConfig {
            label_names: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            ..TrainingConfig::default()
        };
        let plan = TrainingPlan::new(&config, &data, "species").unwrap();
        let mut outputs = EngineOutputs::new();
        outputs.insert_matrix(COEFFICIENTS_OUT, array![[0.1, 0.2], [0.3, 0.4]]);
        hydrate(outputs, &plan).unwrap()
    }

    fn probabilities_2x3() -> Array2<f64> {
        array![[0.7, 0.2, 0.1], [0.1, 0.3, 0.6]]
    }

    #[test]
    fn frame_with_response_column_resolves_to_evaluation() {
        let model = trained_model();
        let with_labels = df!("x1" => [1.0], "x2" => [0.1], "species" => [2.0]).unwrap();
        let without = df!("x1" => [1.0], "x2" => [0.1]).unwrap();
        assert!(PredictionRequest::resolve(&model, &with_labels).is_evaluation());
        assert!(!PredictionRequest::resolve(&model, &without).is_evaluation());
    }

    #[test]
    fn scoring_mode_sends_features_only() {
        let model = trained_model();
        let data = df!("x1" => [1.0, 2.0], "x2" => [0.1, 0.2]).unwrap();
        let engine = StubEngine::new(probabilities_2x3());
        let dir = tempdir().unwrap();
        let stats_path = dir.path().join("stats.csv");

        let result = predict(&engine, &model, &data, &stats_path).unwrap();
        let bundle = engine.seen_bundle();

        assert_eq!(
            bundle.param("scoring_only"),
            Some(&ParamValue::Str("yes".to_string()))
        );
        assert!(bundle.input("X").is_some());
        assert!(bundle.input("Y").is_none());
        assert!(result.statistics.is_none());
    }

    #[test]
    fn evaluation_mode_sends_features_and_labels() {
        let model = trained_model();
        let data = df!(
            "x1" => [1.0, 2.0],
            "x2" => [0.1, 0.2],
            "species" => [1.0, 3.0],
        )
        .unwrap();
        let engine = StubEngine::new(probabilities_2x3());
        let dir = tempdir().unwrap();
        let stats_path = dir.path().join("stats.csv");

        let result = predict(&engine, &model, &data, &stats_path).unwrap();
        let bundle = engine.seen_bundle();

        assert_eq!(
            bundle.param("scoring_only"),
            Some(&ParamValue::Str("no".to_string()))
        );
        assert_eq!(bundle.input("X").unwrap().dim(), (2, 2));
        assert_eq!(bundle.input("Y").unwrap().dim(), (2, 1));
        assert_eq!(bundle.param("dfam"), Some(&ParamValue::Int(3)));

        let stats = result.statistics.unwrap();
        assert_eq!(Statistics::columns(), STATISTICS_COLUMNS);
        assert_eq!(stats.rows().len(), 2);
        assert_eq!(stats.rows()[0].name, "LOGLHOOD_Z");
        assert_eq!(stats.rows()[0].y_column, 1);
        assert_eq!(stats.rows()[0].scaled, 1);
        assert_abs_diff_eq!(stats.rows()[0].value, -42.5);
        assert_eq!(stats.rows()[1].name, "ACCURACY");
        assert_eq!(stats.rows()[1].scaled, 0);
    }

    #[test]
    fn probabilities_are_labeled_with_model_classes() {
        let model = trained_model();
        let data = df!("x1" => [1.0, 2.0], "x2" => [0.1, 0.2]).unwrap();
        let engine = StubEngine::new(probabilities_2x3());
        let dir = tempdir().unwrap();

        let result = predict(&engine, &model, &data, &dir.path().join("stats.csv")).unwrap();
        assert_eq!(result.probabilities.column_names(), &["A", "B", "C"]);
        assert_eq!(result.probabilities.nrows(), 2);
        assert_abs_diff_eq!(result.probabilities.values()[[1, 2]], 0.6);
    }

    #[test]
    fn probability_column_mismatch_is_rejected() {
        let model = trained_model();
        let data = df!("x1" => [1.0], "x2" => [0.1]).unwrap();
        let engine = StubEngine::new(array![[0.5, 0.5]]);
        let dir = tempdir().unwrap();

        let err = predict(&engine, &model, &data, &dir.path().join("stats.csv")).unwrap_err();
        assert!(matches!(
            err,
            PredictError::Hydration(HydrationError::ProbabilityColumnMismatch {
                columns: 2,
                classes: 3
            })
        ));
    }

    #[test]
    fn malformed_statistics_rows_are_reported_with_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        fs::write(&path, "LOGLHOOD_Z,1,1,-42.5\nACCURACY,1,0\n").unwrap();
        let err = Statistics::from_file(&path).unwrap_err();
        match err {
            PredictError::MalformedStatistics { row, .. } => assert_eq!(row, 2),
            other => panic!("expected MalformedStatistics, got {other:?}"),
        }
    }
}
