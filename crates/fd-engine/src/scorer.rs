//! Request-facing scoring over an immutable loaded model.

use fd_types::{
    internal_error, validation_error, FdError, FdResult, FeatureBatch, ModelError, NO_FEATURES_MESSAGE,
    NO_FEATURE_VALUES_MESSAGE,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::artifact::{ArtifactStore, ModelArtifact};

/// A fitted model able to produce fraud probabilities for a batch of rows.
///
/// Implementations are read-only after construction and shared across
/// concurrent requests.
pub trait FraudModel: Send + Sync {
    /// Number of features every row must carry.
    fn n_features(&self) -> usize;

    /// Probability of the fraud class for each row, in row order.
    fn predict_proba(&self, batch: &FeatureBatch) -> Result<Vec<f64>, ModelError>;
}

/// The `features` value of a scoring request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeaturesInput {
    Single(Vec<f64>),
    Batch(Vec<Vec<f64>>),
}

impl FeaturesInput {
    pub fn into_batch(self) -> FeatureBatch {
        match self {
            FeaturesInput::Single(row) => FeatureBatch::single(row),
            FeaturesInput::Batch(rows) => FeatureBatch::new(rows),
        }
    }
}

/// Validate a raw request object and decode its `features` value.
pub fn parse_request(raw: &Value) -> FdResult<FeaturesInput> {
    let features = raw
        .as_object()
        .and_then(|object| object.get("features"))
        .ok_or_else(|| FdError::Validation(NO_FEATURES_MESSAGE.to_string()))?;

    match features.as_array() {
        Some(values) if !values.is_empty() => {}
        _ => return Err(FdError::Validation(NO_FEATURE_VALUES_MESSAGE.to_string())),
    }

    FeaturesInput::deserialize(features).map_err(|_| {
        validation_error!("features must be a list of numbers or a list of lists of numbers")
    })
}

/// Scores requests against a model loaded once at startup.
#[derive(Clone)]
pub struct Scorer {
    model: Arc<dyn FraudModel>,
}

impl Scorer {
    pub fn new(model: Arc<dyn FraudModel>) -> Self {
        Self { model }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self::new(Arc::new(artifact.pipeline))
    }

    /// Load the artifact from `store`; failures are model errors.
    pub fn load(store: &ArtifactStore) -> FdResult<Self> {
        Ok(Self::from_artifact(store.load()?))
    }

    pub fn n_features(&self) -> usize {
        self.model.n_features()
    }

    pub fn score(&self, raw: &Value) -> FdResult<Vec<f64>> {
        let input = parse_request(raw)?;
        self.score_input(input)
    }

    pub fn score_input(&self, input: FeaturesInput) -> FdResult<Vec<f64>> {
        let batch = input.into_batch();
        let scores = self.model.predict_proba(&batch)?;
        if scores.len() != batch.len() {
            return Err(internal_error!(
                "model returned {} scores for {} rows",
                scores.len(),
                batch.len()
            ));
        }
        debug!(rows = batch.len(), "Scored batch");
        Ok(scores)
    }
}

impl std::fmt::Debug for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scorer")
            .field("n_features", &self.model.n_features())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_types::ErrorKind;
    use serde_json::json;

    /// Scores each row by the logistic of its sum.
    struct SumModel {
        n_features: usize,
    }

    impl FraudModel for SumModel {
        fn n_features(&self) -> usize {
            self.n_features
        }

        fn predict_proba(&self, batch: &FeatureBatch) -> Result<Vec<f64>, ModelError> {
            let x = batch.to_matrix(self.n_features)?;
            Ok(x.rows()
                .into_iter()
                .map(|row| 1.0 / (1.0 + (-row.sum()).exp()))
                .collect())
        }
    }

    fn scorer(n_features: usize) -> Scorer {
        Scorer::new(Arc::new(SumModel { n_features }))
    }

    #[test]
    fn scores_a_single_vector() {
        let scores = scorer(30).score(&json!({ "features": vec![0.0; 30] })).unwrap();
        assert_eq!(scores, vec![0.5]);
    }

    #[test]
    fn scores_a_batch_in_order() {
        let scores = scorer(2)
            .score(&json!({ "features": [[1.0, 1.0], [-3.0, 0.0], [0.0, 0.0]] }))
            .unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores[0] > 0.5);
        assert!(scores[1] < 0.5);
        assert_eq!(scores[2], 0.5);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn batch_score_matches_individual_scores() {
        let scorer = scorer(3);
        let a = vec![0.3, -1.2, 4.0];
        let b = vec![2.0, 0.0, -0.5];
        let batch = scorer.score(&json!({ "features": [a.clone(), b.clone()] })).unwrap();
        assert_eq!(batch[0], scorer.score(&json!({ "features": a })).unwrap()[0]);
        assert_eq!(batch[1], scorer.score(&json!({ "features": b })).unwrap()[0]);
    }

    #[test]
    fn scoring_is_idempotent() {
        let scorer = scorer(2);
        let request = json!({ "features": [[0.5, 0.25], [1.0, -2.0]] });
        assert_eq!(scorer.score(&request).unwrap(), scorer.score(&request).unwrap());
    }

    #[test]
    fn missing_features_is_a_validation_error() {
        for request in [json!({}), json!([1.0, 2.0]), json!({ "feature": [1.0] })] {
            match scorer(2).score(&request) {
                Err(FdError::Validation(message)) => assert_eq!(message, NO_FEATURES_MESSAGE),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn null_or_empty_features_is_a_validation_error() {
        for request in [
            json!({ "features": null }),
            json!({ "features": [] }),
            json!({ "features": 3.0 }),
            json!({ "features": "1,2" }),
        ] {
            match scorer(2).score(&request) {
                Err(FdError::Validation(message)) => assert_eq!(message, NO_FEATURE_VALUES_MESSAGE),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn mixed_or_non_numeric_entries_are_rejected() {
        for request in [
            json!({ "features": [1.0, [2.0]] }),
            json!({ "features": [1.0, "x"] }),
            json!({ "features": [[1.0, null]] }),
        ] {
            let err = scorer(2).score(&request).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn dimension_mismatch_is_a_model_error() {
        let err = scorer(30).score(&json!({ "features": [0.0, 1.0] })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Model);

        let err = scorer(2)
            .score(&json!({ "features": [[0.0, 1.0], [0.0]] }))
            .unwrap_err();
        assert!(matches!(
            err,
            FdError::Model(ModelError::DimensionMismatch { row: 1, .. })
        ));
    }

    #[test]
    fn integer_features_are_accepted() {
        let scores = scorer(2).score(&json!({ "features": [0, 0] })).unwrap();
        assert_eq!(scores, vec![0.5]);
    }
}
