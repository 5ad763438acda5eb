//! Offline training run: split, cross-validated search over C, refit,
//! held-out evaluation and artifact construction.

use chrono::Utc;
use fd_data::{train_test_split, StratifiedKFold};
use fd_optimizer::{
    Candidate, CrossValidatedSearch, SearchId, SearchRunConfig, SearchSpace,
};
use fd_types::{DataError, FdResult, LabeledDataset, ModelError, SearchConfig};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::artifact::{ArtifactMetadata, ArtifactStore, ModelArtifact};
use crate::logistic::LogisticParams;
use crate::metrics::{recall_macro, EvaluationReport};
use crate::pipeline::{PipelineParams, ScoringPipeline};

/// Name of the searched hyperparameter.
pub const PARAM_C: &str = "C";

/// Mean and spread of one candidate's fold scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub c: f64,
    pub mean_score: f64,
    pub std_dev: f64,
    pub fold_scores: Vec<f64>,
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub search_id: SearchId,
    pub selected_c: f64,
    pub best_cv_score: f64,
    pub candidates: Vec<CandidateSummary>,
    /// Held-out diagnostics. Not used for selection.
    pub evaluation: EvaluationReport,
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_features: usize,
    pub converged: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: TrainingReport,
}

pub struct Trainer {
    config: SearchConfig,
}

impl Trainer {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn pipeline_params(&self, c: f64) -> PipelineParams {
        PipelineParams {
            standardize: self.config.standardize,
            classifier: LogisticParams::balanced(c)
                .with_max_iter(self.config.max_iter)
                .with_tol(self.config.tolerance),
        }
    }

    fn candidate_c(candidate: &Candidate) -> FdResult<f64> {
        candidate.get(PARAM_C).ok_or_else(|| {
            ModelError::InvalidParameter {
                parameter: PARAM_C.to_string(),
                message: format!("missing from candidate {}", candidate),
            }
            .into()
        })
    }

    /// Fit and select a model on `dataset`. Nothing is written to disk.
    pub fn train(&self, dataset: &LabeledDataset) -> FdResult<TrainingOutcome> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(DataError::Empty {
                message: "training dataset has no rows".to_string(),
            }
            .into());
        }

        let started = Instant::now();
        let [legit, fraud] = dataset.class_counts();
        info!(
            rows = dataset.len(),
            features = dataset.n_features(),
            legitimate = legit,
            fraud,
            "Starting training run"
        );

        let split = train_test_split(dataset, self.config.test_ratio, self.config.split_seed)?;
        let train = &split.train;
        let test = &split.test;

        let folds = StratifiedKFold::new(self.config.cv_folds).split(train.labels())?;

        let space = SearchSpace::new().add_values(PARAM_C, self.config.c_grid.clone());
        let run_config = SearchRunConfig::new("logistic-regression-c".to_string(), space)
            .with_cv_folds(self.config.cv_folds)
            .with_objective("recall_macro");
        let search = CrossValidatedSearch::new(run_config);

        let outcome = search.run(&folds, |candidate, fold| {
            let params = self.pipeline_params(Self::candidate_c(candidate)?);
            let fit_rows = train.select(&fold.train);
            let held_out = train.select(&fold.validation);
            let pipeline = ScoringPipeline::fit(fit_rows.features(), fit_rows.labels(), &params)?;
            let predicted = pipeline.predict(held_out.features());
            Ok(recall_macro(held_out.labels(), &predicted))
        })?;

        let selected_c = Self::candidate_c(&outcome.best.candidate)?;
        let pipeline =
            ScoringPipeline::fit(train.features(), train.labels(), &self.pipeline_params(selected_c))?;
        let converged = pipeline.classifier().converged();

        let predicted = pipeline.predict(test.features());
        let evaluation = EvaluationReport::evaluate(test.labels(), &predicted);
        info!(
            c = selected_c,
            cv_score = outcome.best.objective,
            holdout_recall_macro = evaluation.recall_macro,
            test_rows = test.len(),
            "Held-out evaluation"
        );
        for class in &evaluation.classes {
            info!(
                class = %class.label,
                precision = class.precision,
                recall = class.recall,
                f1 = class.f1,
                support = class.support,
                "Class report"
            );
        }

        let candidates = outcome
            .status
            .trials
            .iter()
            .filter_map(|trial| trial.result.as_ref())
            .map(|result| {
                Ok(CandidateSummary {
                    c: Self::candidate_c(&result.candidate)?,
                    mean_score: result.objective,
                    std_dev: result.std_dev,
                    fold_scores: result.fold_scores.clone(),
                })
            })
            .collect::<FdResult<Vec<_>>>()?;

        let artifact = ModelArtifact {
            metadata: ArtifactMetadata {
                n_features: dataset.n_features(),
                feature_names: dataset.feature_names().to_vec(),
                c: selected_c,
                cv_score: outcome.best.objective,
                trained_at: Utc::now(),
            },
            pipeline,
        };

        let report = TrainingReport {
            search_id: outcome.status.id,
            selected_c,
            best_cv_score: outcome.best.objective,
            candidates,
            evaluation,
            train_rows: train.len(),
            test_rows: test.len(),
            n_features: dataset.n_features(),
            converged,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            c = report.selected_c,
            cv_score = report.best_cv_score,
            duration_ms = report.duration_ms,
            "Training run finished"
        );

        Ok(TrainingOutcome { artifact, report })
    }

    /// Train and persist the artifact. On any failure no artifact is written.
    pub fn train_and_save(
        &self,
        dataset: &LabeledDataset,
        store: &ArtifactStore,
    ) -> FdResult<TrainingReport> {
        let outcome = self.train(dataset)?;
        store.save(&outcome.artifact)?;
        Ok(outcome.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::Scorer;
    use fd_types::{ErrorKind, FdError, Label};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;
    use tempfile::tempdir;

    /// Two noisy clusters; fraud rows are shifted on every feature.
    fn synthetic(n_legit: usize, n_fraud: usize, seed: u64) -> LabeledDataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let total = n_legit + n_fraud;
        let step = total / n_fraud;
        let mut rows = Vec::with_capacity(total);
        let mut labels = Vec::with_capacity(total);
        for i in 0..total {
            let label = if i % step == 0 && i / step < n_fraud {
                Label::Fraud
            } else {
                Label::Legitimate
            };
            let shift = if label == Label::Fraud { 1.5 } else { 0.0 };
            rows.push((0..3).map(|_| rng.gen_range(-1.0..1.0) + shift).collect());
            labels.push(label);
        }
        LabeledDataset::from_rows(rows, labels).unwrap()
    }

    fn small_config() -> SearchConfig {
        SearchConfig {
            cv_folds: 3,
            c_grid: vec![1e-2, 1.0, 1e2],
            ..SearchConfig::default()
        }
    }

    #[test]
    fn trains_a_useful_model() {
        let dataset = synthetic(240, 60, 7);
        let outcome = Trainer::new(small_config()).train(&dataset).unwrap();
        let report = &outcome.report;

        assert_eq!(report.test_rows, 60);
        assert_eq!(report.train_rows, 240);
        assert_eq!(report.candidates.len(), 3);
        assert!(small_config().c_grid.contains(&report.selected_c));
        assert!(report.best_cv_score > 0.7);
        assert!(report.evaluation.recall_macro > 0.7);
        assert_eq!(outcome.artifact.metadata.n_features, 3);

        let best = report
            .candidates
            .iter()
            .map(|c| c.mean_score)
            .fold(f64::MIN, f64::max);
        assert_eq!(report.best_cv_score, best);
    }

    #[test]
    fn training_is_deterministic() {
        let dataset = synthetic(240, 60, 11);
        let trainer = Trainer::new(small_config());
        let first = trainer.train(&dataset).unwrap();
        let second = trainer.train(&dataset).unwrap();

        assert_eq!(first.artifact.pipeline, second.artifact.pipeline);
        assert_eq!(first.report.selected_c, second.report.selected_c);
        assert_eq!(first.report.candidates, second.report.candidates);
        assert_eq!(first.report.evaluation, second.report.evaluation);
    }

    #[test]
    fn too_few_fraud_rows_is_a_data_error() {
        let dataset = synthetic(95, 5, 1);
        let err = Trainer::new(SearchConfig::default()).train(&dataset).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn empty_dataset_is_a_data_error() {
        let dataset = LabeledDataset::from_rows(Vec::new(), Vec::new()).unwrap();
        let err = Trainer::new(SearchConfig::default()).train(&dataset).unwrap_err();
        assert!(matches!(err, FdError::Data(DataError::Empty { .. })));
    }

    #[test]
    fn trained_artifact_serves_scores() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("model.json"));
        let dataset = synthetic(240, 60, 5);

        Trainer::new(small_config()).train_and_save(&dataset, &store).unwrap();
        let scorer = Scorer::load(&store).unwrap();
        assert_eq!(scorer.n_features(), 3);

        let scores = scorer
            .score(&json!({ "features": [[0.0, 0.0, 0.0], [1.5, 1.5, 1.5]] }))
            .unwrap();
        assert!(scores[0] < scores[1]);
    }

    #[test]
    fn failed_run_writes_no_artifact() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("model.json"));
        let dataset = synthetic(95, 5, 2);

        assert!(Trainer::new(SearchConfig::default())
            .train_and_save(&dataset, &store)
            .is_err());
        assert!(!store.path().exists());
    }
}
