//! Crate-wide error type.
//!
//! Grounded in `relay/src/types.rs`'s `RelayError`: one variant per failure
//! domain, `#[from]` conversions for the library errors we wrap. Failures
//! that must not cross the reactor boundary (framing, codec, type mismatch)
//! are logged and turned into a `bool`/`on_unhandled_message` call instead
//! of an `Err`; only operations whose contract is already fallible
//! (transport setup, HTTP fetch, pattern parsing) surface as `Error`.

use std::net::SocketAddr;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("framing error: {0}")]
    Framing(String),

    #[error("OSC codec error: {0}")]
    Codec(#[from] rosc::OscError),

    #[error("type mismatch: cannot coerce {found} into a value of type {expected}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("transport error connecting to {addr}: {source}")]
    Transport { addr: SocketAddr, #[source] source: std::io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid address pattern: {0}")]
    PatternParse(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn framing(msg: impl Into<String>) -> Self {
        Error::Framing(msg.into())
    }

    pub fn pattern_parse(msg: impl Into<String>) -> Self {
        Error::PatternParse(msg.into())
    }
}
