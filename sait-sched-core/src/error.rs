use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date/time parsing failed: {0}")]
    DateTime(#[from] chrono::ParseError),

    #[error("Upstream error: {source_name} - {message}")]
    Upstream { source_name: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("no conflict-free schedule exists for the requested courses")]
    NoValidSchedule,

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network timeout")]
    Timeout,

    #[error("ICS generation failed: {0}")]
    IcsGeneration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
