//! The OSC protocol configuration object, serializable so embedders can
//! load it from a config file via `toml` instead of constructing it in
//! code — mirroring how `core/src/protocol/device.rs` derives
//! `Serialize`/`Deserialize` on its wire/config structs.

use crate::net::Framing;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Udp,
    Tcp,
    Unix,
    Serial,
    WebSockets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Client,
    Server,
    Mirror,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscVersion {
    Osc1_0,
    Osc1_1,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramingKind {
    SizePrefix,
    Slip,
}

impl From<FramingKind> for Framing {
    fn from(kind: FramingKind) -> Self {
        match kind {
            FramingKind::SizePrefix => Framing::LengthPrefix,
            FramingKind::Slip => Framing::Slip,
        }
    }
}

/// Where to connect/bind. `Network` covers UDP/TCP/WebSockets; `Path`
/// covers Unix/serial endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Network(SocketAddr),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OscProtocolConfig {
    pub transport: TransportKind,
    pub mode: Mode,
    pub version: OscVersion,
    pub framing: FramingKind,
    pub endpoint: Endpoint,
}

impl OscProtocolConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(src)
    }

    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&contents)?)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn parses_a_udp_server_config_from_toml() {
        let src = r#"
            transport = "Udp"
            mode = "Server"
            version = "Osc1_1"
            framing = "SizePrefix"
            endpoint = "127.0.0.1:9000"
        "#;
        let config = OscProtocolConfig::from_toml_str(src).unwrap();
        assert_eq!(config.transport, TransportKind::Udp);
        assert_eq!(config.mode, Mode::Server);
        assert_eq!(config.endpoint, Endpoint::Network("127.0.0.1:9000".parse().unwrap()));
    }
}
