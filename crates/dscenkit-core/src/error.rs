use thiserror::Error;

/// Errors raised by the predicate, state, model, and role layers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown entity state type: {0}")]
    UnknownEntityStateType(String),

    #[error("property '{property}' is not declared on type '{type_name}'")]
    UndeclaredProperty { type_name: String, property: String },

    #[error("value '{value}' is not admitted for property '{property}' on type '{type_name}'")]
    DisallowedValue {
        type_name: String,
        property: String,
        value: String,
    },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
