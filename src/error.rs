pub type TowerResult<T> = Result<T, TowerError>;

#[derive(thiserror::Error, Debug)]
pub enum TowerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("hardware error: {0}")]
    Hardware(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TowerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn hardware(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }

    /// The message delivered to drawing clients in a `DrawResponse`.
    ///
    /// Validation errors travel bare ("Unknown font", not
    /// "validation error: Unknown font"); everything else keeps its
    /// display form.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
