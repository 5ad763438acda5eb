//! # fd-optimizer
//!
//! Hyperparameter search for FraudDetect.
//!
//! Provides search space definitions, exhaustive grid enumeration, trial
//! tracking, and a cross-validated search runner that evaluates every
//! (candidate, fold) pair in parallel while keeping selection deterministic.

mod cv;
mod search;
mod trial;

pub use cv::{CrossValidatedSearch, SearchOutcome};
pub use search::{Candidate, GridSearch, ParameterDef, SearchSpace};
pub use trial::{
    SearchId, SearchRunConfig, SearchState, SearchStatus, Trial, TrialResult, TrialStatus,
};
