//! The OSC protocol family: wire codec, transport configuration, and the
//! [`protocol::OscProtocol`] binding to the device tree.

pub mod codec;
pub mod config;
pub mod protocol;

pub use config::{Endpoint, FramingKind, Mode, OscProtocolConfig, OscVersion, TransportKind};
pub use protocol::OscProtocol;

#[cfg(test)]
mod tests;
