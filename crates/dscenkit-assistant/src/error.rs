use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("no cyber system attached")]
    NoSystemAttached,

    #[error(transparent)]
    Env(#[from] dscenkit_env::EnvError),

    #[error(transparent)]
    Xp(#[from] dscenkit_xp::XpError),
}

pub type AssistantResult<T> = Result<T, AssistantError>;
