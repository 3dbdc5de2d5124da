//! Error types for xcat-web

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing command")]
    MissingCommand,

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Invalid response from dispatcher: {0}")]
    InvalidResponse(String),

    #[error("Dispatcher timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Reply exceeds {0} bytes")]
    ReplyTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::InvalidResponse(err.to_string())
    }
}
