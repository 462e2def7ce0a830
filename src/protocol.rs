//! The abstract protocol contract a [`device::Device`] drives transports
//! through, independent of which wire format is behind it.

use crate::tree::Node;
use crate::value::Value;

/// Implemented by each wire-protocol binding (the OSC family, the
/// OSCQuery mirror). Every operation is a fire-and-forget request onto
/// the protocol's reactor; richer async variants (`pull` resolving to a
/// value, `update` resolving when a refetch completes) are additional,
/// protocol-specific methods layered on top rather than part of this
/// trait, since not every protocol needs them (plain OSC has no tree
/// discovery and its `update` is always immediately ready).
pub trait Protocol: Send {
    /// Requests the current value of `node`'s parameter from the remote
    /// peer. Returns `false` if the protocol cannot service pulls (no
    /// parameter, protocol stopped, transport down).
    fn pull(&mut self, node: &Node) -> bool;

    /// Pushes `node`'s current parameter value to the remote peer.
    fn push(&mut self, node: &Node) -> bool;

    /// Pushes a raw `(address, value)` pair with no tree lookup.
    fn push_raw(&mut self, address: &str, value: &Value) -> bool;

    /// Enables or disables change notifications for `node`.
    fn observe(&mut self, node: &Node, enable: bool) -> bool;

    /// Refreshes protocol-level state against `root` (e.g. an OSCQuery
    /// mirror's structural refetch). Plain OSC has no discovery step and
    /// always returns `true` immediately.
    fn update(&mut self, root: &Node) -> bool;

    fn stop(&mut self);
}
