//! Process configuration for the trainer and the scoring service.
//!
//! Values come from environment variables (optionally seeded from a `.env`
//! file by the binaries). Unset variables fall back to defaults; set but
//! unparseable variables are configuration errors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{FdError, FdResult};

pub const ENV_DATASET_PATH: &str = "FRAUD_DATASET_PATH";
pub const ENV_ARTIFACT_PATH: &str = "FRAUD_ARTIFACT_PATH";
pub const ENV_SERVICE_ADDR: &str = "FRAUD_SERVICE_ADDR";
pub const ENV_CV_FOLDS: &str = "FRAUD_CV_FOLDS";
pub const ENV_TEST_RATIO: &str = "FRAUD_TEST_RATIO";
pub const ENV_SPLIT_SEED: &str = "FRAUD_SPLIT_SEED";
pub const ENV_C_GRID: &str = "FRAUD_C_GRID";
pub const ENV_MAX_ITER: &str = "FRAUD_MAX_ITER";
pub const ENV_TOLERANCE: &str = "FRAUD_TOLERANCE";
pub const ENV_STANDARDIZE: &str = "FRAUD_STANDARDIZE";

/// Top-level configuration shared by `fd-train` and `fd-serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudDetectConfig {
    /// Location of the labeled CSV dataset.
    pub dataset_path: PathBuf,
    /// Location of the serialized model artifact.
    pub artifact_path: PathBuf,
    /// Bind address for the scoring service.
    pub service_addr: String,
    pub search: SearchConfig,
}

impl Default for FraudDetectConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/creditcard.csv"),
            artifact_path: PathBuf::from("models/model.json"),
            service_addr: "0.0.0.0:8080".to_string(),
            search: SearchConfig::default(),
        }
    }
}

impl FraudDetectConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> FdResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> FdResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let search_defaults = SearchConfig::default();

        let c_grid = match lookup(ENV_C_GRID) {
            Some(raw) => parse_grid(&raw)?,
            None => search_defaults.c_grid,
        };

        let config = Self {
            dataset_path: lookup(ENV_DATASET_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),
            artifact_path: lookup(ENV_ARTIFACT_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_path),
            service_addr: lookup(ENV_SERVICE_ADDR).unwrap_or(defaults.service_addr),
            search: SearchConfig {
                cv_folds: parse_or(&lookup, ENV_CV_FOLDS, search_defaults.cv_folds)?,
                test_ratio: parse_or(&lookup, ENV_TEST_RATIO, search_defaults.test_ratio)?,
                split_seed: parse_or(&lookup, ENV_SPLIT_SEED, search_defaults.split_seed)?,
                c_grid,
                max_iter: parse_or(&lookup, ENV_MAX_ITER, search_defaults.max_iter)?,
                tolerance: parse_or(&lookup, ENV_TOLERANCE, search_defaults.tolerance)?,
                standardize: parse_or(&lookup, ENV_STANDARDIZE, search_defaults.standardize)?,
            },
        };

        config.search.validate()?;
        Ok(config)
    }
}

/// Hyperparameter search and split settings for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of stratified cross-validation folds.
    pub cv_folds: usize,
    /// Fraction of rows held out for the diagnostic evaluation.
    pub test_ratio: f64,
    /// Seed for the train/test shuffle.
    pub split_seed: u64,
    /// Candidate inverse regularization strengths, evaluated in this order.
    pub c_grid: Vec<f64>,
    /// Newton iteration cap for a single fit.
    pub max_iter: usize,
    /// Convergence threshold on the max-abs gradient.
    pub tolerance: f64,
    /// Fit a standard scaler ahead of the classifier.
    pub standardize: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv_folds: 10,
            test_ratio: 0.2,
            split_seed: 42,
            c_grid: vec![1e-4, 1e-2, 1e0, 1e2, 1e4],
            max_iter: 100,
            tolerance: 1e-4,
            standardize: false,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> FdResult<()> {
        if self.cv_folds < 2 {
            return Err(FdError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(FdError::Config(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.c_grid.is_empty() {
            return Err(FdError::Config("c_grid must not be empty".to_string()));
        }
        if let Some(c) = self.c_grid.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
            return Err(FdError::Config(format!(
                "c_grid values must be positive and finite, got {c}"
            )));
        }
        if self.max_iter == 0 {
            return Err(FdError::Config("max_iter must be at least 1".to_string()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(FdError::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> FdResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| FdError::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

fn parse_grid(raw: &str) -> FdResult<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|e| FdError::Config(format!("{ENV_C_GRID}: '{s}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = FraudDetectConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, FraudDetectConfig::default());
        assert_eq!(config.search.cv_folds, 10);
        assert_eq!(config.search.split_seed, 42);
        assert_eq!(config.search.c_grid, vec![1e-4, 1e-2, 1e0, 1e2, 1e4]);
    }

    #[test]
    fn paths_and_search_settings_are_overridable() {
        let config = FraudDetectConfig::from_lookup(lookup_from(&[
            (ENV_DATASET_PATH, "/data/tx.csv"),
            (ENV_ARTIFACT_PATH, "/srv/model.json"),
            (ENV_CV_FOLDS, "5"),
            (ENV_C_GRID, "0.1, 1, 10"),
            (ENV_STANDARDIZE, "true"),
        ]))
        .unwrap();

        assert_eq!(config.dataset_path, PathBuf::from("/data/tx.csv"));
        assert_eq!(config.artifact_path, PathBuf::from("/srv/model.json"));
        assert_eq!(config.search.cv_folds, 5);
        assert_eq!(config.search.c_grid, vec![0.1, 1.0, 10.0]);
        assert!(config.search.standardize);
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let result = FraudDetectConfig::from_lookup(lookup_from(&[(ENV_CV_FOLDS, "ten")]));
        assert!(matches!(result, Err(FdError::Config(_))));

        let result = FraudDetectConfig::from_lookup(lookup_from(&[(ENV_C_GRID, "1,abc")]));
        assert!(matches!(result, Err(FdError::Config(_))));
    }

    #[test]
    fn validate_rejects_degenerate_search() {
        let mut search = SearchConfig::default();
        search.cv_folds = 1;
        assert!(search.validate().is_err());

        let mut search = SearchConfig::default();
        search.test_ratio = 1.0;
        assert!(search.validate().is_err());

        let mut search = SearchConfig::default();
        search.c_grid = vec![1.0, -1.0];
        assert!(search.validate().is_err());

        let mut search = SearchConfig::default();
        search.c_grid.clear();
        assert!(search.validate().is_err());
    }
}
