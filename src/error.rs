use thiserror::Error;

#[derive(Error, Debug)]
pub enum L10nError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Locale error: {0}")]
    Locale(String),

    #[error("Patch error: {0}")]
    Patch(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Media processing error: {0}")]
    Media(String),
}

pub type Result<T> = std::result::Result<T, L10nError>;
