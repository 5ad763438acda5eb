//! Cross-validated grid search.
//!
//! Every (candidate, fold) pair is evaluated independently on the rayon pool.
//! Scores are then folded back into trials in grid order, so the selected
//! candidate does not depend on scheduling.

use fd_data::Fold;
use fd_types::{FdError, FdResult};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::search::{Candidate, GridSearch};
use crate::trial::{SearchRunConfig, SearchStatus, Trial, TrialResult};

/// Outcome of a completed search: the full status plus the winning trial.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub best: TrialResult,
}

/// Runs an evaluator over every candidate of a grid and every CV fold.
pub struct CrossValidatedSearch {
    config: SearchRunConfig,
    grid: GridSearch,
}

impl CrossValidatedSearch {
    pub fn new(config: SearchRunConfig) -> Self {
        let grid = GridSearch::new(config.search_space.clone());
        Self { config, grid }
    }

    pub fn grid(&self) -> &GridSearch {
        &self.grid
    }

    /// Evaluate each candidate on each fold and pick the best mean score.
    ///
    /// `evaluate` returns the fold score for one candidate; any error aborts
    /// the whole search and is returned unchanged.
    pub fn run<F>(&self, folds: &[Fold], evaluate: F) -> FdResult<SearchOutcome>
    where
        F: Fn(&Candidate, &Fold) -> FdResult<f64> + Sync,
    {
        let mut status = SearchStatus::new(self.config.clone());

        if self.grid.is_empty() {
            return Err(FdError::Config("search space has no candidates".to_string()));
        }
        if folds.is_empty() {
            return Err(FdError::Config("no cross-validation folds supplied".to_string()));
        }

        status.mark_running();
        info!(
            search = %self.config.name,
            candidates = self.grid.len(),
            folds = folds.len(),
            metric = %self.config.objective_metric,
            "Starting cross-validated grid search"
        );
        let started = Instant::now();

        let jobs: Vec<(usize, usize)> = (0..self.grid.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();

        let scores: Vec<FdResult<f64>> = jobs
            .par_iter()
            .map(|&(c, f)| {
                let candidate = &self.grid.candidates()[c];
                let score = evaluate(candidate, &folds[f]);
                if let Ok(s) = &score {
                    debug!(candidate = %candidate, fold = f, score = *s, "Fold evaluated");
                }
                score
            })
            .collect();

        let mut scores = scores.into_iter();
        for (number, candidate) in self.grid.candidates().iter().enumerate() {
            let mut trial = Trial::new(status.id, number, candidate.clone());
            let mut fold_scores = Vec::with_capacity(folds.len());

            for _ in 0..folds.len() {
                match scores.next() {
                    Some(Ok(score)) => fold_scores.push(score),
                    Some(Err(e)) => {
                        warn!(candidate = %candidate, error = %e, "Trial failed");
                        trial.mark_failed(e.to_string());
                        status.trials.push(trial);
                        status.mark_failed(e.to_string());
                        return Err(e);
                    }
                    None => {
                        return Err(FdError::Internal(
                            "fold score count does not match the search grid".to_string(),
                        ))
                    }
                }
            }

            let result = TrialResult::from_fold_scores(trial.id, candidate.clone(), fold_scores);
            info!(
                candidate = %candidate,
                mean = result.objective,
                std = result.std_dev,
                "Trial completed"
            );
            status.update_best(&result);
            trial.mark_completed(result);
            status.trials.push(trial);
        }

        status.mark_completed();
        let best = status
            .best_trial
            .clone()
            .ok_or_else(|| FdError::Internal("search completed without a best trial".to_string()))?;

        info!(
            best = %best.candidate,
            score = best.objective,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Grid search finished"
        );

        Ok(SearchOutcome { status, best })
    }
}
