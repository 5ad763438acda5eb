//! Trial tracking and search run management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search::{Candidate, SearchSpace};

/// Unique search run identifier.
pub type SearchId = Uuid;

/// Top-level configuration for a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRunConfig {
    pub id: SearchId,
    pub name: String,

    /// The hyperparameter search space.
    pub search_space: SearchSpace,

    /// Number of cross-validation folds per candidate.
    pub cv_folds: usize,

    /// Name of the maximized metric (e.g. "recall_macro").
    pub objective_metric: String,

    pub created_at: DateTime<Utc>,
}

impl SearchRunConfig {
    pub fn new(name: String, search_space: SearchSpace) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            search_space,
            cv_folds: 10,
            objective_metric: "recall_macro".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn with_cv_folds(mut self, n: usize) -> Self {
        self.cv_folds = n;
        self
    }

    pub fn with_objective(mut self, metric: &str) -> Self {
        self.objective_metric = metric.to_string();
        self
    }
}

/// Lifecycle state for a search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate status of a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStatus {
    pub id: SearchId,
    pub config: SearchRunConfig,
    pub state: SearchState,
    pub trials: Vec<Trial>,
    pub best_trial: Option<TrialResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SearchStatus {
    pub fn new(config: SearchRunConfig) -> Self {
        Self {
            id: config.id,
            config,
            state: SearchState::Pending,
            trials: Vec::new(),
            best_trial: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = SearchState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = SearchState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = SearchState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn trials_completed(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Completed)
            .count()
    }

    /// Update the best trial if `result` has a strictly higher objective.
    ///
    /// Equal objectives keep the earlier trial, so the winner of a tie is the
    /// candidate that appears first in grid order.
    pub fn update_best(&mut self, result: &TrialResult) {
        let improves = match &self.best_trial {
            None => true,
            Some(current_best) => result.objective > current_best.objective,
        };
        if improves {
            self.best_trial = Some(result.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Individual trial
// ---------------------------------------------------------------------------

/// A single trial (one candidate evaluated across all folds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: Uuid,
    pub search_id: SearchId,
    pub trial_number: usize,
    pub candidate: Candidate,
    pub status: TrialStatus,
    pub result: Option<TrialResult>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Trial {
    pub fn new(search_id: SearchId, trial_number: usize, candidate: Candidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            search_id,
            trial_number,
            candidate,
            status: TrialStatus::Pending,
            result: None,
            created_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_completed(&mut self, result: TrialResult) {
        self.status = TrialStatus::Completed;
        self.finished_at = Some(Utc::now());
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = TrialStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Completed,
    Failed,
}

/// Cross-validated result of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: Uuid,
    pub candidate: Candidate,
    /// Mean of the fold scores.
    pub objective: f64,
    /// Population standard deviation of the fold scores.
    pub std_dev: f64,
    pub fold_scores: Vec<f64>,
}

impl TrialResult {
    pub fn from_fold_scores(trial_id: Uuid, candidate: Candidate, fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len().max(1) as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let variance = fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            trial_id,
            candidate,
            objective: mean,
            std_dev: variance.sqrt(),
            fold_scores,
        }
    }
}
