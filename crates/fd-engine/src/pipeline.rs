use fd_types::{FdResult, FeatureBatch, Label, ModelError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::logistic::{sigmoid, LogisticParams, LogisticRegression};
use crate::preprocessing::StandardScaler;
use crate::scorer::FraudModel;

/// Settings for fitting one pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub standardize: bool,
    pub classifier: LogisticParams,
}

/// Optional standardization followed by a logistic classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPipeline {
    scaler: Option<StandardScaler>,
    classifier: LogisticRegression,
}

impl ScoringPipeline {
    pub fn fit(x: &Array2<f64>, y: &[Label], params: &PipelineParams) -> FdResult<Self> {
        let scaler = params.standardize.then(|| StandardScaler::fit(x));
        let classifier = match &scaler {
            Some(scaler) => LogisticRegression::fit(&scaler.transform(x), y, &params.classifier)?,
            None => LogisticRegression::fit(x, y, &params.classifier)?,
        };
        Ok(Self { scaler, classifier })
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    pub fn is_standardized(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    /// Classifier decision value per row, after any scaling.
    pub fn decision_matrix(&self, x: &Array2<f64>) -> Array1<f64> {
        match &self.scaler {
            Some(scaler) => self.classifier.decision_function(&scaler.transform(x)),
            None => self.classifier.decision_function(x),
        }
    }

    /// Fraud probability per row of an already-shaped matrix.
    pub fn predict_proba_matrix(&self, x: &Array2<f64>) -> Array1<f64> {
        self.decision_matrix(x).mapv(sigmoid)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<Label> {
        match &self.scaler {
            Some(scaler) => self.classifier.predict(&scaler.transform(x)),
            None => self.classifier.predict(x),
        }
    }

    /// Check that the scaler and classifier agree on dimensionality.
    pub fn check_consistency(&self) -> Result<(), ModelError> {
        if let Some(scaler) = &self.scaler {
            if scaler.n_features() != self.classifier.n_features() {
                return Err(ModelError::Corrupt {
                    message: format!(
                        "scaler has {} features but classifier has {}",
                        scaler.n_features(),
                        self.classifier.n_features()
                    ),
                });
            }
        }
        if !self.classifier.intercept().is_finite()
            || self.classifier.coefficients().iter().any(|c| !c.is_finite())
        {
            return Err(ModelError::Corrupt {
                message: "classifier has non-finite parameters".to_string(),
            });
        }
        Ok(())
    }
}

impl FraudModel for ScoringPipeline {
    fn n_features(&self) -> usize {
        ScoringPipeline::n_features(self)
    }

    fn predict_proba(&self, batch: &FeatureBatch) -> Result<Vec<f64>, ModelError> {
        let x = batch.to_matrix(self.n_features())?;
        let decision = self.decision_matrix(&x);
        // Finite inputs can still overflow the dot product.
        if let Some(row) = decision.iter().position(|z| !z.is_finite()) {
            return Err(ModelError::NonFiniteScore { row });
        }
        Ok(decision.mapv(sigmoid).to_vec())
    }
}
