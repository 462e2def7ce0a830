//! Networking: the cooperative reactor, stream framing, and socket
//! transports that every protocol binds to.

pub mod context;
pub mod framing;
pub mod transport;

pub use context::{Handle, NetworkContext};
pub use framing::Framing;
pub use transport::Transport;

#[cfg(test)]
mod tests;
