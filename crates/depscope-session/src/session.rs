//! The pipeline session: an explicit state machine over the stages
//! load → preprocess → train → evaluate.
//!
//! Each transition checks its precondition, computes the next stage's data
//! from borrowed state, and only then swaps the new state in. A failed
//! transition therefore leaves the session exactly as it was.

use std::fmt;
use std::mem;
use std::path::Path;

use depscope_io::{Table, TableReader};
use depscope_prep::split::feature_matrix;
use depscope_prep::{
    FittedPreprocessor, PreprocessConfig, PreprocessReport, SplitConfig, SplitData, preprocess,
    split,
};
use depscope_rf::{EvaluationResult, RandomForest, RandomForestConfig, evaluate};
use tracing::{info, instrument};

use crate::artifacts::{ArtifactStore, PersistOutcome};
use crate::error::SessionError;

/// Named pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No dataset.
    Unloaded,
    /// A raw table is loaded.
    Loaded,
    /// The table has been preprocessed.
    Preprocessed,
    /// A classifier has been trained.
    Trained,
    /// The classifier has been evaluated.
    Evaluated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unloaded => "unloaded",
            Stage::Loaded => "loaded",
            Stage::Preprocessed => "preprocessed",
            Stage::Trained => "trained",
            Stage::Evaluated => "evaluated",
        };
        f.write_str(name)
    }
}

/// The raw dataset.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// The table as read.
    pub table: Table,
    /// Where it came from.
    pub source: String,
}

/// Output of the preprocessing stage.
#[derive(Debug, Clone)]
pub struct PreprocessedData {
    /// The processed table.
    pub table: Table,
    /// Config that produced it.
    pub config: PreprocessConfig,
    /// Per-step counts.
    pub report: PreprocessReport,
    /// Replayable transforms for scoring.
    pub fitted: FittedPreprocessor,
    /// Processed CSV outcome, if persistence is configured.
    pub persisted: Option<PersistOutcome>,
}

/// Output of the training stage.
#[derive(Debug, Clone)]
pub struct TrainedData {
    /// The fitted classifier.
    pub forest: RandomForest,
    /// Partitions used for fitting and evaluation.
    pub split: SplitData,
    /// Target column name.
    pub target: String,
    /// Model archive outcome, if persistence is configured.
    pub persisted: Option<PersistOutcome>,
}

/// Inputs of the training stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    split: SplitConfig,
    forest: RandomForestConfig,
}

impl TrainRequest {
    /// Combine a split config and forest config.
    #[must_use]
    pub fn new(split: SplitConfig, forest: RandomForestConfig) -> Self {
        Self { split, forest }
    }

    /// Split settings.
    #[must_use]
    pub fn split(&self) -> &SplitConfig {
        &self.split
    }

    /// Forest hyperparameters.
    #[must_use]
    pub fn forest(&self) -> &RandomForestConfig {
        &self.forest
    }
}

/// Prediction for one scored row.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Prediction {
    /// Row index in the scored table.
    pub row: usize,
    /// Most probable class.
    pub predicted_class: usize,
    /// Probability per class label.
    pub probabilities: Vec<f64>,
}

enum State {
    Unloaded,
    Loaded(LoadedData),
    Preprocessed(LoadedData, PreprocessedData),
    Trained(LoadedData, PreprocessedData, TrainedData),
    Evaluated(LoadedData, PreprocessedData, TrainedData, EvaluationResult),
}

/// Exclusively owned pipeline state.
///
/// | Transition | Requires | Leads to |
/// |---|---|---|
/// | [`load`](Self::load) | any stage | `Loaded` |
/// | [`preprocess`](Self::preprocess) | `Loaded` or later | `Preprocessed` |
/// | [`train`](Self::train) | `Preprocessed` or later | `Trained` |
/// | [`evaluate`](Self::evaluate) | `Trained` or later | `Evaluated` |
/// | [`score`](Self::score) | `Trained` or later | unchanged |
///
/// Re-running a stage discards every later stage.
pub struct Session {
    state: State,
    artifacts: Option<ArtifactStore>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// An unloaded session that persists nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Unloaded,
            artifacts: None,
        }
    }

    /// Persist the processed table and model archive to `store`.
    #[must_use]
    pub fn with_artifacts(mut self, store: ArtifactStore) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self.state {
            State::Unloaded => Stage::Unloaded,
            State::Loaded(..) => Stage::Loaded,
            State::Preprocessed(..) => Stage::Preprocessed,
            State::Trained(..) => Stage::Trained,
            State::Evaluated(..) => Stage::Evaluated,
        }
    }

    /// The raw dataset, once loaded.
    #[must_use]
    pub fn loaded(&self) -> Option<&LoadedData> {
        match &self.state {
            State::Unloaded => None,
            State::Loaded(l)
            | State::Preprocessed(l, ..)
            | State::Trained(l, ..)
            | State::Evaluated(l, ..) => Some(l),
        }
    }

    /// Preprocessing output, once preprocessed.
    #[must_use]
    pub fn preprocessed(&self) -> Option<&PreprocessedData> {
        match &self.state {
            State::Unloaded | State::Loaded(_) => None,
            State::Preprocessed(_, p) | State::Trained(_, p, _) | State::Evaluated(_, p, ..) => {
                Some(p)
            }
        }
    }

    /// Training output, once trained.
    #[must_use]
    pub fn trained(&self) -> Option<&TrainedData> {
        match &self.state {
            State::Trained(_, _, t) | State::Evaluated(_, _, t, _) => Some(t),
            _ => None,
        }
    }

    /// Evaluation result, once evaluated.
    #[must_use]
    pub fn evaluation(&self) -> Option<&EvaluationResult> {
        match &self.state {
            State::Evaluated(.., e) => Some(e),
            _ => None,
        }
    }

    fn require<T>(
        &self,
        found: Option<T>,
        operation: &'static str,
        required: Stage,
    ) -> Result<T, SessionError> {
        found.ok_or(SessionError::Precondition {
            operation,
            required,
            current: self.stage(),
        })
    }

    /// Move the state out, leaving `Unloaded` until it is put back.
    fn take_state(&mut self) -> State {
        mem::replace(&mut self.state, State::Unloaded)
    }

    /// Replace the dataset. Allowed from any stage; later stages are discarded.
    #[instrument(skip_all, fields(source = %source.as_ref(), n_rows = table.n_rows()))]
    pub fn load(&mut self, table: Table, source: impl AsRef<str>) {
        info!(n_columns = table.n_columns(), "dataset loaded");
        self.state = State::Loaded(LoadedData {
            table,
            source: source.as_ref().to_string(),
        });
    }

    /// Read a CSV file and [`load`](Self::load) it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Load`] if the file cannot be read or parsed;
    /// the session is unchanged.
    pub fn load_path(&mut self, path: &Path, reader: &TableReader) -> Result<(), SessionError> {
        let table = reader.read_path(path)?;
        self.load(table, path.display().to_string());
        Ok(())
    }

    /// Preprocess the loaded table with `config`.
    ///
    /// Always starts from the raw table, so repeated calls with different
    /// configs do not compound. Writes the processed CSV if artifacts are
    /// configured.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SessionError::Precondition`] | Nothing is loaded |
    /// | [`SessionError::Prep`] | A preprocessing step failed |
    #[instrument(skip_all)]
    pub fn preprocess(&mut self, config: &PreprocessConfig) -> Result<&PreprocessReport, SessionError> {
        let loaded = self.require(self.loaded(), "preprocess", Stage::Loaded)?;
        let output = preprocess(&loaded.table, config)?;
        let persisted = self
            .artifacts
            .as_ref()
            .map(|store| store.persist_table(&output.table));

        let data = PreprocessedData {
            table: output.table,
            config: config.clone(),
            report: output.report,
            fitted: output.fitted,
            persisted,
        };
        self.state = match self.take_state() {
            State::Loaded(l)
            | State::Preprocessed(l, ..)
            | State::Trained(l, ..)
            | State::Evaluated(l, ..) => State::Preprocessed(l, data),
            State::Unloaded => State::Unloaded,
        };
        let report = self.preprocessed().map(|p| &p.report);
        self.require(report, "preprocess", Stage::Loaded)
    }

    /// Split the processed table and fit a forest.
    ///
    /// Writes the model archive if artifacts are configured.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SessionError::Precondition`] | Not yet preprocessed |
    /// | [`SessionError::Validation`] | Target, features, or split are invalid |
    /// | [`SessionError::Training`] | The forest could not be fitted |
    #[instrument(skip_all)]
    pub fn train(&mut self, request: &TrainRequest) -> Result<&TrainedData, SessionError> {
        let prepared = self.require(self.preprocessed(), "train", Stage::Preprocessed)?;
        let data = split(&prepared.table, &request.split)?;
        let forest = request
            .forest
            .fit(&data.train_features, &data.train_labels, &data.feature_names)?;
        let persisted = self.artifacts.as_ref().map(|store| store.persist_model(&forest));
        info!(
            n_train = data.train_labels.len(),
            n_test = data.test_labels.len(),
            n_features = data.feature_names.len(),
            "classifier trained"
        );

        let trained = TrainedData {
            forest,
            split: data,
            target: request.split.target().to_string(),
            persisted,
        };
        self.state = match self.take_state() {
            State::Preprocessed(l, p) | State::Trained(l, p, _) | State::Evaluated(l, p, ..) => {
                State::Trained(l, p, trained)
            }
            other => other,
        };
        self.require(self.trained(), "train", Stage::Preprocessed)
    }

    /// Evaluate the trained forest on its train and test partitions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SessionError::Precondition`] | Not yet trained |
    /// | [`SessionError::Training`] | Prediction failed |
    #[instrument(skip_all)]
    pub fn evaluate(&mut self) -> Result<&EvaluationResult, SessionError> {
        let trained = self.require(self.trained(), "evaluate", Stage::Trained)?;
        let s = &trained.split;
        let result = evaluate(
            &trained.forest,
            &s.train_features,
            &s.train_labels,
            &s.test_features,
            &s.test_labels,
        )?;

        self.state = match self.take_state() {
            State::Trained(l, p, t) | State::Evaluated(l, p, t, _) => State::Evaluated(l, p, t, result),
            other => other,
        };
        self.require(self.evaluation(), "evaluate", Stage::Trained)
    }

    /// Predict new rows with the trained forest.
    ///
    /// The fitted imputation and encoding are replayed on `table`; unseen
    /// categories get their encoder's reserved unknown code. Columns not
    /// used as features are ignored.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SessionError::Precondition`] | Not yet trained |
    /// | [`SessionError::Prep`] | Replaying the transforms failed |
    /// | [`SessionError::Validation`] | A feature column is absent, non-numeric, or missing a value |
    /// | [`SessionError::Training`] | Prediction failed |
    #[instrument(skip_all, fields(n_rows = table.n_rows()))]
    pub fn score(&self, table: &Table) -> Result<Vec<Prediction>, SessionError> {
        let trained = self.require(self.trained(), "score", Stage::Trained)?;
        let prepared = self.require(self.preprocessed(), "score", Stage::Trained)?;
        let transformed = prepared.fitted.transform(table)?;
        let features = feature_matrix(&transformed, trained.forest.feature_names())?;
        let probabilities = trained.forest.predict_proba_batch(&features)?;
        info!(n_scored = probabilities.len(), "rows scored");
        Ok(probabilities
            .into_iter()
            .enumerate()
            .map(|(row, p)| Prediction {
                row,
                predicted_class: p.predicted_class(),
                probabilities: p.as_slice().to_vec(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use depscope_io::Column;

    use super::*;

    fn table() -> Table {
        let n = 20;
        Table::new(vec![
            Column::numeric("x", (0..n).map(|i| Some(i as f64)).collect()),
            Column::numeric("Depression", (0..n).map(|i| Some(f64::from(u8::from(i >= 10)))).collect()),
        ])
        .unwrap()
    }

    fn request() -> TrainRequest {
        TrainRequest::new(
            SplitConfig::new(0.25).unwrap(),
            RandomForestConfig::new(5).unwrap(),
        )
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Unloaded < Stage::Loaded);
        assert!(Stage::Trained < Stage::Evaluated);
        assert_eq!(Stage::Preprocessed.to_string(), "preprocessed");
    }

    #[test]
    fn preprocess_before_load_is_refused() {
        let mut session = Session::new();
        let err = session.preprocess(&PreprocessConfig::new()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Precondition {
                required: Stage::Loaded,
                current: Stage::Unloaded,
                ..
            }
        ));
        assert_eq!(session.stage(), Stage::Unloaded);
    }

    #[test]
    fn full_walk_through_stages() {
        let mut session = Session::new();
        session.load(table(), "memory");
        assert_eq!(session.stage(), Stage::Loaded);
        session.preprocess(&PreprocessConfig::new()).unwrap();
        assert_eq!(session.stage(), Stage::Preprocessed);
        session.train(&request()).unwrap();
        assert_eq!(session.stage(), Stage::Trained);
        let n_test = session.evaluate().unwrap().n_test;
        assert_eq!(n_test, 5);
        assert_eq!(session.stage(), Stage::Evaluated);
        assert!(session.trained().unwrap().persisted.is_none());
    }

    #[test]
    fn rerunning_a_stage_discards_later_ones() {
        let mut session = Session::new();
        session.load(table(), "memory");
        session.preprocess(&PreprocessConfig::new()).unwrap();
        session.train(&request()).unwrap();
        session.evaluate().unwrap();

        session.preprocess(&PreprocessConfig::new()).unwrap();
        assert_eq!(session.stage(), Stage::Preprocessed);
        assert!(session.trained().is_none());
        assert!(session.evaluation().is_none());
    }
}
