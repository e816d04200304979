//! Resource graph error types

use thiserror::Error;

/// Errors raised while building or rendering a resource graph
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Logical id already declared: {0}")]
    DuplicateLogicalId(String),

    #[error("'{from}' references '{target}', which has not been declared")]
    DanglingReference { from: String, target: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Invalid property '{key}' on '{id}': {message}")]
    InvalidProperty {
        id: String,
        key: String,
        message: String,
    },

    #[error("Import '{id}' has no attribute '{attribute}'")]
    UnknownAttribute { id: String, attribute: String },

    #[error("No value supplied for parameter '{0}'")]
    MissingParameterValue(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
