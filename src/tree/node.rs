//! The device tree: nodes, structural observers, and the `//`/`*`-capable
//! lookup built on [`super::pattern`].
//!
//! A node is a cheap, cloneable handle (`Arc<Mutex<Inner>>`) around shared
//! mutable state, the same shape the teacher reaches for whenever several
//! owners need to see one another's writes (see `ProtocolDevice`'s
//! `Arc<Mutex<_>>` fields in `core/src/protocol/device.rs`). Children are
//! owned by their parent's `Inner::children`; a child's `parent` link is a
//! `Weak` so the tree has no reference cycles.

use super::parameter::{next_subscription_id, Parameter, SubscriptionId};
use std::sync::{Arc, Mutex, Weak};

type NodeCallback = Box<dyn Fn(&Node) + Send>;
type AddressCallback = Box<dyn Fn(&str) + Send>;
type UnitCallback = Box<dyn Fn() + Send>;

struct Slot<F> {
    id: SubscriptionId,
    alive: bool,
    f: F,
}

struct Observers<F> {
    slots: Vec<Slot<F>>,
}

impl<F> Default for Observers<F> {
    fn default() -> Self {
        Observers { slots: Vec::new() }
    }
}

impl<F> Observers<F> {
    fn add(&mut self, f: F) -> SubscriptionId {
        let id = next_subscription_id();
        self.slots.push(Slot { id, alive: true, f });
        id
    }

    fn remove(&mut self, id: SubscriptionId) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.alive = false;
        }
    }
}

impl Observers<NodeCallback> {
    fn fire(&mut self, arg: &Node) {
        let len = self.slots.len();
        for slot in &self.slots[..len] {
            if slot.alive {
                (slot.f)(arg);
            }
        }
        self.slots.retain(|s| s.alive);
    }
}

impl Observers<AddressCallback> {
    fn fire(&mut self, arg: &str) {
        let len = self.slots.len();
        for slot in &self.slots[..len] {
            if slot.alive {
                (slot.f)(arg);
            }
        }
        self.slots.retain(|s| s.alive);
    }
}

impl Observers<UnitCallback> {
    fn fire(&mut self) {
        let len = self.slots.len();
        for slot in &self.slots[..len] {
            if slot.alive {
                (slot.f)();
            }
        }
        self.slots.retain(|s| s.alive);
    }
}

struct Inner {
    name: String,
    parent: Weak<Mutex<Inner>>,
    children: Vec<Node>,
    parameter: Option<Parameter>,
    tags: Vec<String>,
    description: Option<String>,
    priority: Option<i32>,
    critical: bool,
    refresh_rate: Option<f64>,
    node_created: Observers<NodeCallback>,
    node_removing: Observers<NodeCallback>,
    attribute_modified: Observers<AddressCallback>,
    address_created: Observers<AddressCallback>,
    about_to_be_deleted: Observers<UnitCallback>,
}

/// A handle into the device tree. Cloning shares the same underlying node;
/// it is the moral equivalent of the teacher's `Arc<Mutex<T>>` fields, just
/// named for what it references.
#[derive(Clone)]
pub struct Node(Arc<Mutex<Inner>>);

impl Node {
    /// Creates a standalone root node (no parent).
    pub fn root(name: impl Into<String>) -> Node {
        Node(Arc::new(Mutex::new(Inner {
            name: name.into(),
            parent: Weak::new(),
            children: Vec::new(),
            parameter: None,
            tags: Vec::new(),
            description: None,
            priority: None,
            critical: false,
            refresh_rate: None,
            node_created: Observers::default(),
            node_removing: Observers::default(),
            attribute_modified: Observers::default(),
            address_created: Observers::default(),
            about_to_be_deleted: Observers::default(),
        })))
    }

    pub fn name(&self) -> String {
        self.0.lock().unwrap().name.clone()
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.lock().unwrap().parent.upgrade().map(Node)
    }

    /// Full slash-separated address from the root down to this node.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let inner = node.0.lock().unwrap();
            let parent = inner.parent.upgrade().map(Node);
            if parent.is_some() {
                segments.push(inner.name.clone());
            }
            drop(inner);
            current = parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Stable snapshot of current children, independent of subsequent
    /// structural edits — the equivalent of walking `node.children_copy()`
    /// in the reference OSCQuery tree explorer rather than the live list.
    pub fn children_snapshot(&self) -> Vec<Node> {
        self.0.lock().unwrap().children.clone()
    }

    pub fn find_child(&self, name: &str) -> Option<Node> {
        self.0.lock().unwrap().children.iter().find(|c| c.name() == name).cloned()
    }

    /// Inserts a child under `self` with `requested_name`, auto-suffixing
    /// `.1`, `.2`, … on collision (smallest unused suffix).
    pub fn create_node(&self, requested_name: &str) -> Node {
        let name = {
            let inner = self.0.lock().unwrap();
            unique_name(&inner.children, requested_name)
        };
        let child = Node(Arc::new(Mutex::new(Inner {
            name: name.clone(),
            parent: Arc::downgrade(&self.0),
            children: Vec::new(),
            parameter: None,
            tags: Vec::new(),
            description: None,
            priority: None,
            critical: false,
            refresh_rate: None,
            node_created: Observers::default(),
            node_removing: Observers::default(),
            attribute_modified: Observers::default(),
            address_created: Observers::default(),
            about_to_be_deleted: Observers::default(),
        })));
        {
            let mut inner = self.0.lock().unwrap();
            inner.children.push(child.clone());
        }
        let address = child.path();
        {
            let mut inner = self.0.lock().unwrap();
            inner.node_created.fire(&child);
            inner.address_created.fire(&address);
        }
        child
    }

    /// Detaches `child` from `self`: fires the child's
    /// `about_to_be_deleted` broadcast, then `self`'s `node_removing`,
    /// then releases the child from the children list.
    pub fn remove_child(&self, child: &Node) -> bool {
        child.0.lock().unwrap().about_to_be_deleted.fire();
        {
            let mut inner = self.0.lock().unwrap();
            inner.node_removing.fire(child);
        }
        let mut inner = self.0.lock().unwrap();
        let before = inner.children.len();
        inner.children.retain(|c| !Arc::ptr_eq(&c.0, &child.0));
        inner.children.len() != before
    }

    pub fn has_parameter(&self) -> bool {
        self.0.lock().unwrap().parameter.is_some()
    }

    pub fn set_parameter(&self, parameter: Parameter) {
        self.0.lock().unwrap().parameter = Some(parameter);
    }

    pub fn clear_parameter(&self) {
        self.0.lock().unwrap().parameter = None;
    }

    pub fn with_parameter<R>(&self, f: impl FnOnce(&Parameter) -> R) -> Option<R> {
        self.0.lock().unwrap().parameter.as_ref().map(f)
    }

    pub fn with_parameter_mut<R>(&self, f: impl FnOnce(&mut Parameter) -> R) -> Option<R> {
        self.0.lock().unwrap().parameter.as_mut().map(f)
    }

    /// Applies a value write to this node's parameter, if any, firing
    /// `attribute_modified` on success. Returns `false` if the node has no
    /// parameter or the write was suppressed by the repetition filter.
    pub fn push_value(&self, value: crate::value::Value) -> bool {
        let accepted = self.with_parameter_mut(|p| p.push_value(value)).unwrap_or(false);
        if accepted {
            let address = self.path();
            self.0.lock().unwrap().attribute_modified.fire(&address);
        }
        accepted
    }

    pub fn tags(&self) -> Vec<String> {
        self.0.lock().unwrap().tags.clone()
    }

    pub fn set_tags(&self, tags: Vec<String>) {
        self.0.lock().unwrap().tags = tags;
    }

    pub fn description(&self) -> Option<String> {
        self.0.lock().unwrap().description.clone()
    }

    pub fn set_description(&self, description: Option<String>) {
        self.0.lock().unwrap().description = description;
    }

    pub fn priority(&self) -> Option<i32> {
        self.0.lock().unwrap().priority
    }

    pub fn set_priority(&self, priority: Option<i32>) {
        self.0.lock().unwrap().priority = priority;
    }

    pub fn critical(&self) -> bool {
        self.0.lock().unwrap().critical
    }

    pub fn set_critical(&self, critical: bool) {
        self.0.lock().unwrap().critical = critical;
    }

    pub fn refresh_rate(&self) -> Option<f64> {
        self.0.lock().unwrap().refresh_rate
    }

    pub fn set_refresh_rate(&self, rate: Option<f64>) {
        self.0.lock().unwrap().refresh_rate = rate;
    }

    pub fn on_node_created(&self, f: impl Fn(&Node) + Send + 'static) -> SubscriptionId {
        self.0.lock().unwrap().node_created.add(Box::new(f))
    }

    pub fn on_node_removing(&self, f: impl Fn(&Node) + Send + 'static) -> SubscriptionId {
        self.0.lock().unwrap().node_removing.add(Box::new(f))
    }

    pub fn on_attribute_modified(&self, f: impl Fn(&str) + Send + 'static) -> SubscriptionId {
        self.0.lock().unwrap().attribute_modified.add(Box::new(f))
    }

    pub fn on_address_created(&self, f: impl Fn(&str) + Send + 'static) -> SubscriptionId {
        self.0.lock().unwrap().address_created.add(Box::new(f))
    }

    pub fn on_about_to_be_deleted(&self, f: impl Fn() + Send + 'static) -> SubscriptionId {
        self.0.lock().unwrap().about_to_be_deleted.add(Box::new(f))
    }

    pub fn unsubscribe_node_created(&self, id: SubscriptionId) {
        self.0.lock().unwrap().node_created.remove(id);
    }

    pub fn unsubscribe_node_removing(&self, id: SubscriptionId) {
        self.0.lock().unwrap().node_removing.remove(id);
    }

    pub fn unsubscribe_attribute_modified(&self, id: SubscriptionId) {
        self.0.lock().unwrap().attribute_modified.remove(id);
    }

    /// Depth-first walk collecting every node whose path matches `pattern`.
    pub fn find_nodes(&self, pattern: &str) -> Result<Vec<Node>, crate::error::Error> {
        let mut out = Vec::new();
        self.collect_matches(pattern, &mut out)?;
        Ok(out)
    }

    pub fn find_node(&self, path: &str) -> Option<Node> {
        self.find_nodes(path).ok()?.into_iter().next()
    }

    fn collect_matches(&self, pattern: &str, out: &mut Vec<Node>) -> Result<(), crate::error::Error> {
        if super::pattern::matches(pattern, &self.path())? {
            out.push(self.clone());
        }
        for child in self.children_snapshot() {
            child.collect_matches(pattern, out)?;
        }
        Ok(())
    }
}

/// Smallest unused `.k` suffix (k≥1) for `requested` among `siblings`; the
/// bare name if it is not already taken.
fn unique_name(siblings: &[Node], requested: &str) -> String {
    if siblings.iter().all(|s| s.name() != requested) {
        return requested.to_string();
    }
    let mut k = 1u64;
    loop {
        let candidate = format!("{requested}.{k}");
        if siblings.iter().all(|s| s.name() != candidate) {
            return candidate;
        }
        k += 1;
    }
}
