use reqwest::StatusCode;

/// Everything that can stop an attendance determination.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("login rejected with status {status}")]
    Auth { status: StatusCode },
    #[error("unexpected page shape: {0}")]
    Parse(String),
    #[error("gave up after {attempts} attempts: {last}")]
    Fetch { attempts: u32, last: String },
    #[error("cookie store error: {0}")]
    Cookie(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
