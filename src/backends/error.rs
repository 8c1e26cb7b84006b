use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Decode(String),
    #[error("{0} catalog is read-only")]
    ReadOnly(&'static str),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied")]
    Forbidden,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("no service credential configured for signing")]
    NoServiceCredential,
    #[error("storage returned no url")]
    MissingUrl,
    #[error("object already exists: {0}")]
    AlreadyExists(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
