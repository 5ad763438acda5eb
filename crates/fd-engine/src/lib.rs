// FraudDetect engine
// Logistic scoring model, training run, artifact persistence and scoring

pub mod artifact;
pub mod logistic;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod scorer;
pub mod trainer;

pub use artifact::{ArtifactMetadata, ArtifactStore, ModelArtifact};
pub use logistic::{ClassWeight, LogisticParams, LogisticRegression};
pub use metrics::{recall_macro, ClassReport, ConfusionMatrix, EvaluationReport};
pub use pipeline::{PipelineParams, ScoringPipeline};
pub use preprocessing::StandardScaler;
pub use scorer::{parse_request, FeaturesInput, FraudModel, Scorer};
pub use trainer::{CandidateSummary, Trainer, TrainingOutcome, TrainingReport};
