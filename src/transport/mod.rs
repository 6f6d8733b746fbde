//! Network side of a run: registration, output subscription, stdin forwarding and snapshots.

use std::{fmt, pin::Pin};

use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod chunk;
pub mod http;
#[cfg(test)]
pub mod memory;

pub use http::HttpTransport;

/// Code submitted for one run. Built fresh from the editor on every submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Runnable {
    #[serde(rename = "lang")]
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub source: String,
}

impl Runnable {
    pub fn new(language: impl Into<String>, version: Option<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            version: version.filter(|v| !v.trim().is_empty()),
            source: source.into(),
        }
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("lang", self.language.as_str()), ("source", self.source.as_str())];
        if let Some(v) = self.version.as_deref() {
            params.push(("version", v));
        }
        params
    }
}

// The backend stores runnables with an empty version string and a timeout field.
#[derive(Debug, Deserialize)]
struct SnapshotBody {
    lang: String,
    source: String,
    #[serde(default)]
    version: Option<String>,
}

impl From<SnapshotBody> for Runnable {
    fn from(body: SnapshotBody) -> Self {
        Runnable::new(body.lang, body.version, body.source)
    }
}

/// Handle naming one execution on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a saved snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One piece of program output. Only the order of chunks is meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk(pub String);

impl OutputChunk {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend returned an empty {0}")]
    Empty(&'static str),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("connection closed: {0}")]
    Closed(String),
}

/// Output of one run. `None` from the stream is the end signal, `Err` a transport failure.
pub type OutputStream = Pin<Box<dyn Stream<Item = Result<OutputChunk, TransportError>> + Send>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit code and receive the token naming the new execution.
    async fn register(&self, runnable: &Runnable) -> Result<SessionToken, TransportError>;

    /// Open the output stream of a registered execution.
    async fn subscribe(&self, token: &SessionToken) -> Result<OutputStream, TransportError>;

    /// Push one line to the program's stdin.
    async fn send_input(&self, token: &SessionToken, line: &str) -> Result<(), TransportError>;

    /// Store a snapshot. Passing `existing` updates that snapshot in place.
    async fn save(&self, runnable: &Runnable, existing: Option<&SnapshotId>) -> Result<SnapshotId, TransportError>;

    async fn fetch_snapshot(&self, id: &SnapshotId) -> Result<Runnable, TransportError>;

    /// Human readable list of languages and versions offered by the backend.
    async fn languages(&self) -> Result<String, TransportError>;
}
