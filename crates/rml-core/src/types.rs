use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A resolved data endpoint.
///
/// Only `File` and `Topic` can be wired into a mapping document or an engine
/// target; the other kinds are recognized so they can be rejected explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    File {
        path: String,
        #[serde(default)]
        on_replace: bool,
        #[serde(default)]
        encoding: Option<String>,
        #[serde(default)]
        read_first_content: bool,
    },
    Topic {
        broker: String,
        topic_name: String,
        consumer_group_id: String,
    },
    WebSocket {
        url: String,
    },
    Http {
        endpoint: String,
        method: String,
    },
}

impl ChannelConfig {
    /// A plain file channel with default flags.
    pub fn file(path: impl Into<String>) -> Self {
        ChannelConfig::File {
            path: path.into(),
            on_replace: false,
            encoding: None,
            read_first_content: false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChannelConfig::File { .. } => "file",
            ChannelConfig::Topic { .. } => "kafka",
            ChannelConfig::WebSocket { .. } => "ws",
            ChannelConfig::Http { .. } => "http",
        }
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelConfig::File { path, .. } => write!(f, "file:{path}"),
            ChannelConfig::Topic {
                broker, topic_name, ..
            } => write!(f, "kafka:{broker}/{topic_name}"),
            ChannelConfig::WebSocket { url } => write!(f, "ws:{url}"),
            ChannelConfig::Http { endpoint, method } => write!(f, "http:{method} {endpoint}"),
        }
    }
}

/// Explicit logical source settings that win over extension heuristics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOverrides {
    /// IRI of the reference formulation (e.g. `http://semweb.mmlab.be/ns/ql#JSONPath`).
    #[serde(default)]
    pub reference_formulation: Option<String>,
    #[serde(default)]
    pub iterator: Option<String>,
}

impl SourceOverrides {
    pub fn is_empty(&self) -> bool {
        self.reference_formulation.is_none() && self.iterator.is_none()
    }
}

/// Which stream a line of engine output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line observed on an engine subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub stream: OutputStream,
    pub line: String,
}

/// Outcome of an engine run that terminated successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineExit {
    pub status: Option<i32>,
    /// Tail of the captured stderr stream.
    pub stderr: String,
}

/// Locations an engine run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPaths {
    pub mapping: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}
