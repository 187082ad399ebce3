use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Fetch Error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Decode Error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Write Error: {0}")]
    Write(#[from] WriteError),
    #[error("Read Error: {0}")]
    Read(#[from] ReadError),
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Repository Error: {0}")]
    Repository(#[from] git2::Error),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Pipeline Error: {0}")]
    Pipeline(String),
}

impl AppError {
    /// Process exit code for this failure. Zero is reserved for success.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Fetch(_) => 2,
            AppError::Decode(_) => 3,
            AppError::Write(_) => 4,
            _ => 1,
        }
    }
}

// Fetch Error Type
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("Request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    #[error("Response from {url} is not an image (content type: {content_type:?})")]
    NotAnImage {
        url: String,
        content_type: Option<String>,
    },
    #[error("Fetch service failed: {0}")]
    Service(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid GIF data: {0}")]
    Gif(#[from] gif::DecodingError),
    #[error("Expected a GIF image, found {0}")]
    UnsupportedFormat(String),
    #[error("Image has no color palette")]
    MissingPalette,
    #[error("Image contains no frames")]
    NoFrames,
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode GIF: {0}")]
    Encode(#[from] gif::EncodingError),
}

#[derive(Error, Debug)]
#[error("Failed to read {path}: {source}")]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
