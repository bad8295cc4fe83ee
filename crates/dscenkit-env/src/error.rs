use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("system '{0}' has not been initialized")]
    NotInitialized(String),

    #[error("action {action} is not available from the current state")]
    ActionNotAvailable { action: String },

    #[error("unknown system info id: {0}")]
    UnknownInfoId(String),

    #[error("invalid configuration for system '{system}': {reason}")]
    InvalidConfiguration { system: String, reason: String },
}

pub type EnvResult<T> = Result<T, EnvError>;
