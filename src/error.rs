use thiserror::Error;

/// Everything that can go wrong between a page and the GraphQL backend.
///
/// The `Display` text is what ends up in front of the user, so keep it short.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("{0}")]
    Rejected(String),

    /// Well-formed response carrying a non-empty `errors` array; holds the first message.
    #[error("{0}")]
    GraphQl(String),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Subscription link: {0}")]
    Socket(String),

    #[error("{0}")]
    Validation(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Session storage: {0}")]
    Session(String),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChatError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(err.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
