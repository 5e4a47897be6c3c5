use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported language for file: {0}")]
    UnsupportedLanguage(String),

    #[error("Instrumentation error: {0}")]
    Instrumentation(String),

    #[error("Trace error: {0}")]
    Trace(String),
}

pub type Result<T> = std::result::Result<T, PulseGraphError>;
