use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainError>;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigFormat(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("checkpoint error at {}: {source}", path.display())]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model error: {0}")]
    Model(String),

    #[error("invalid data: {0}")]
    Data(String),

    #[error("non-finite loss value: {0}")]
    NonFiniteLoss(f64),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("training failed: {0}")]
    Runtime(String),
}

impl TrainError {
    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation(messages)
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// Wraps a filesystem failure under the checkpoint tree with the path it hit.
    pub fn checkpoint(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Checkpoint {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for TrainError {
    fn from(value: toml::de::Error) -> Self {
        TrainError::ConfigFormat(value.to_string())
    }
}
