//! The top-level handle embedders hold: owns the tree root, the active
//! protocol binding, and the `on_unhandled_message` hub for inbound
//! addresses that match no node.
//!
//! Grounded in `core/src/protocol/device.rs`'s `ProtocolDevice`, which
//! plays the same role of bundling a tree with its live protocol and
//! logger rather than leaving embedders to wire the two by hand.

use crate::logger::{default_logger, Log};
use crate::protocol::Protocol;
use crate::tree::parameter::{next_subscription_id, AccessMode, Parameter, SubscriptionId};
use crate::tree::Node;
use crate::value::Value;
use std::sync::{Arc, Mutex};

type UnhandledCallback = Box<dyn Fn(&str, &Value) + Send>;

struct UnhandledSlot {
    id: SubscriptionId,
    alive: bool,
    f: UnhandledCallback,
}

#[derive(Default)]
struct UnhandledHub {
    slots: Vec<UnhandledSlot>,
}

impl UnhandledHub {
    fn add(&mut self, f: UnhandledCallback) -> SubscriptionId {
        let id = next_subscription_id();
        self.slots.push(UnhandledSlot { id, alive: true, f });
        id
    }

    fn remove(&mut self, id: SubscriptionId) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.alive = false;
        }
    }

    fn fire(&mut self, address: &str, value: &Value) {
        let len = self.slots.len();
        for slot in &self.slots[..len] {
            if slot.alive {
                (slot.f)(address, value);
            }
        }
        self.slots.retain(|s| s.alive);
    }
}

/// The root handle an embedding application holds: the device tree, the
/// protocol bound to it, and the `on_unhandled_message` hub.
pub struct Device {
    root: Node,
    protocol: Mutex<Option<Box<dyn Protocol>>>,
    unhandled: Mutex<UnhandledHub>,
    logger: Arc<dyn Log>,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_logger(name, default_logger())
    }

    pub fn with_logger(name: impl Into<String>, logger: Arc<dyn Log>) -> Self {
        Device {
            root: Node::root(name),
            protocol: Mutex::new(None),
            unhandled: Mutex::new(UnhandledHub::default()),
            logger,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn find_node(&self, path: &str) -> Option<Node> {
        self.root.find_node(path)
    }

    /// Inserts a child node under `parent`, auto-suffixing on name
    /// collision. `parent` must belong to this device's tree.
    pub fn create_child(&self, parent: &Node, requested_name: &str) -> Node {
        parent.create_node(requested_name)
    }

    /// Creates a child under `parent` and gives it a parameter of the
    /// given initial value and access mode in one step.
    pub fn create_address(&self, parent: &Node, requested_name: &str, initial: Value, access: AccessMode) -> Node {
        let node = parent.create_node(requested_name);
        node.set_parameter(Parameter::new(initial, access));
        node
    }

    pub fn on_node_created(&self, f: impl Fn(&Node) + Send + 'static) -> SubscriptionId {
        self.root.on_node_created(f)
    }

    /// Registers a callback invoked whenever an inbound address matches
    /// no node in the tree.
    pub fn on_unhandled_message(&self, f: impl Fn(&str, &Value) + Send + 'static) -> SubscriptionId {
        self.unhandled.lock().unwrap().add(Box::new(f))
    }

    pub fn unsubscribe_unhandled_message(&self, id: SubscriptionId) {
        self.unhandled.lock().unwrap().remove(id);
    }

    /// Invoked by a protocol binding when an inbound address matches no
    /// tree node.
    pub fn dispatch_unhandled(&self, address: &str, value: &Value) {
        self.unhandled.lock().unwrap().fire(address, value);
    }

    pub fn set_protocol(&self, protocol: Box<dyn Protocol>) {
        *self.protocol.lock().unwrap() = Some(protocol);
    }

    pub fn clear_protocol(&self) {
        if let Some(mut protocol) = self.protocol.lock().unwrap().take() {
            protocol.stop();
        }
    }

    pub fn with_protocol<R>(&self, f: impl FnOnce(&mut dyn Protocol) -> R) -> Option<R> {
        self.protocol.lock().unwrap().as_deref_mut().map(f)
    }

    pub fn logger(&self) -> Arc<dyn Log> {
        self.logger.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn create_address_attaches_a_parameter() {
        let device = Device::new("root");
        let node = device.create_address(device.root(), "freq", Value::Float(440.0), AccessMode::Bi);
        assert_eq!(node.with_parameter(|p| p.value().clone()), Some(Value::Float(440.0)));
    }

    #[test]
    fn unhandled_message_hub_fires_for_unregistered_callers() {
        let device = Device::new("root");
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        device.on_unhandled_message(move |_addr, _value| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        device.dispatch_unhandled("/nope", &Value::Int(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn find_node_resolves_through_the_root() {
        let device = Device::new("root");
        let child = device.create_child(device.root(), "a");
        device.create_child(&child, "b");
        assert!(device.find_node("/a/b").is_some());
    }
}
