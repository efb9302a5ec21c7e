use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RmlError {
    // Mapping document errors
    #[error("Expected {expected} {what}, found {found}")]
    Cardinality {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported logical source: {0}")]
    UnsupportedSource(String),

    #[error("Unsupported channel: {0}")]
    UnsupportedChannel(String),

    #[error("RDF graph error: {0}")]
    Graph(String),

    // Pipeline document errors
    #[error("Invalid binding: {0}")]
    Binding(String),

    // Engine errors
    #[error("Engine artifact not available offline: {}", .0.display())]
    ArtifactUnavailable(PathBuf),

    #[error("Engine artifact download failed: {0}")]
    Download(String),

    #[error("Engine exited with {}: {stderr}", status_label(.status))]
    EngineExecution { status: Option<i32>, stderr: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, RmlError>;
