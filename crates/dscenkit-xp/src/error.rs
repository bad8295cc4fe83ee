use thiserror::Error;

#[derive(Debug, Error)]
pub enum XpError {
    #[error("i/o error while reading or writing experience: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize experience: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type XpResult<T> = Result<T, XpError>;
