use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent configuration: {0}")]
    InvalidConfiguration(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
