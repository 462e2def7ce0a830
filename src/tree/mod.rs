//! The device tree: hierarchical nodes, parameters, and pattern-addressed
//! lookup.

pub mod node;
pub mod parameter;
pub mod pattern;

pub use node::Node;
pub use parameter::{AccessMode, BoundingMode, Domain, Parameter, RepetitionFilter, SubscriptionId};

#[cfg(test)]
mod tests;
