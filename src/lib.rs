//! `branchwire` — a device-tree and protocol runtime for real-time control
//! of audio/media/show-control parameters.
//!
//! Applications expose a hierarchical [`tree`] of named nodes; each node may
//! carry a typed [`value`] with a unit and a domain. Remote peers observe,
//! modify, and discover these parameters over heterogeneous wire protocols:
//! an [`osc`] family (UDP, TCP/SLIP, Unix) and an [`oscquery`] mirror
//! (HTTP + WebSocket). [`net`] hosts the single-threaded cooperative reactor
//! that drives every transport; [`state`] flattens successive writes into
//! one piecewise message per address.

pub mod device;
pub mod error;
pub mod logger;
pub mod net;
pub mod osc;
pub mod oscquery;
pub mod protocol;
pub mod state;
pub mod tree;
pub mod value;

pub use device::Device;
pub use error::{Error, Result};
pub use logger::{Log, LogRecord, Severity};
pub use protocol::Protocol;
