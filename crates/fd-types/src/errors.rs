use thiserror::Error;

/// Message returned when a scoring request carries no `features` key.
pub const NO_FEATURES_MESSAGE: &str = "No features found in input";

/// Message returned when `features` is present but null, empty or not a list.
pub const NO_FEATURE_VALUES_MESSAGE: &str = "No feature values available";

/// Main error type for the FraudDetect system
#[derive(Error, Debug)]
pub enum FdError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used at process and service boundaries.
///
/// `Validation` is the caller's fault, `Model` is an operational/deployment
/// fault, `Data` and `Io` are fatal to a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Model,
    Data,
    Io,
    Config,
    Internal,
}

impl FdError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FdError::Data(_) => ErrorKind::Data,
            FdError::Model(_) => ErrorKind::Model,
            FdError::Validation(_) => ErrorKind::Validation,
            FdError::Config(_) => ErrorKind::Config,
            FdError::Io(_) => ErrorKind::Io,
            FdError::Serialization(_) | FdError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the failure was caused by the request rather than the deployment.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Training dataset errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Dataset is empty: {message}")]
    Empty { message: String },

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Row at line {line} has {found} columns, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Data parsing error at line {line}, column '{column}': cannot parse '{value}' as a number")]
    ParseError {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Invalid label at line {line}: '{value}' (expected 0 or 1)")]
    InvalidLabel { line: usize, value: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },
}

/// Model artifact and prediction errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model artifact not found: {path}")]
    ArtifactNotFound { path: String },

    #[error("Model artifact is corrupt: {message}")]
    Corrupt { message: String },

    #[error("Feature count mismatch in row {row}: model expects {expected}, got {found}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} produced a non-finite score; feature values are out of range for the model")]
    NonFiniteScore { row: usize },

    #[error("Invalid model parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Model fitting failed: {message}")]
    FitFailed { message: String },
}

/// Result type alias for FraudDetect operations
pub type FdResult<T> = Result<T, FdError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::FdError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::FdError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::FdError::Config(format!($($arg)*))
    };
}
