use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("Environment variable {key} has an invalid value: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("Invalid run configuration: {0}")]
    InvalidRunConfig(String),

    #[error("Twitter API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}
