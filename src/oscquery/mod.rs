//! OSCQuery: the JSON tree document, the mirror (client) side, and the
//! host (authoritative) side.

pub mod host;
pub mod json;
pub mod mirror;

pub use host::Host;
pub use json::NodeDocument;
pub use mirror::{Mirror, MirrorState};

#[cfg(test)]
mod tests;
