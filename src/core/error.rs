use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrainError {
    #[error("Agent not found: {0}")]
    AgentNotFound(crate::core::types::AgentId),

    #[error("Policy initialisation failed: {0}")]
    PolicyInit(String),

    #[error("Policy inference failed: {0}")]
    Inference(String),

    #[error("Policy fit failed: {0}")]
    Fit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BrainError>;
