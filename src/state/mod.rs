//! State composition and flattening: successive writes at differently
//! indexed sub-components of a destination collapse into one piecewise
//! message per address.

use crate::value::{merge, Value};

/// A node address plus an optional sub-component index (`[]` selects the
/// whole value).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub address: String,
    pub index: Vec<usize>,
}

impl Destination {
    pub fn whole(address: impl Into<String>) -> Self {
        Destination { address: address.into(), index: Vec::new() }
    }

    pub fn at(address: impl Into<String>, index: Vec<usize>) -> Self {
        Destination { address: address.into(), index }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub destination: Destination,
    pub value: Value,
}

/// An address plus a list value with holes (`None`) at positions no write
/// has touched yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseMessage {
    pub address: String,
    pub slots: Vec<Option<Value>>,
}

impl PiecewiseMessage {
    fn new(address: String) -> Self {
        PiecewiseMessage { address, slots: Vec::new() }
    }

    /// Writes `value` into the slot selected by `index[0]`, merging at
    /// any remaining levels of `index` so a destination index deeper than
    /// one level (e.g. selecting a component of a compound value stored
    /// at a slot) still only disturbs the addressed sub-component.
    fn set(&mut self, index: &[usize], value: Value) {
        let (first, rest) = index.split_first().expect("top-level destination index must have at least one component");
        if *first >= self.slots.len() {
            self.slots.resize(first + 1, None);
        }
        let current = self.slots[*first].take().unwrap_or(Value::Impulse);
        self.slots[*first] = Some(merge(&current, value, rest));
    }

    /// Merges another piecewise message into this one, position by
    /// position; `other`'s holes leave the current value at that position
    /// untouched.
    fn merge_from(&mut self, other: &PiecewiseMessage) {
        for (i, slot) in other.slots.iter().enumerate() {
            if let Some(v) = slot {
                self.set(i, v.clone());
            }
        }
    }

    /// Collapses into a single `Value`: a `List` of the filled positions,
    /// holes padded with [`Value::Impulse`] — the same merge convention
    /// `value::merge` uses for extend-with-nulls.
    pub fn to_value(&self) -> Value {
        Value::List(self.slots.iter().cloned().map(|s| s.unwrap_or(Value::Impulse)).collect())
    }
}

/// One element of a composed [`State`]: a scalar message, a piecewise
/// message, or a nested state. A tagged variant rather than a trait object
/// — the set of shapes is closed and matching beats downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum StateElement {
    Message(Message),
    Piecewise(PiecewiseMessage),
    Nested(State),
}

/// An ordered list of state elements; composes via [`State::push`] and
/// collapses to one piecewise message per address via [`State::flatten`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    elements: Vec<StateElement>,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    pub fn push(&mut self, element: StateElement) {
        self.elements.push(element);
    }

    /// Flattens this state (recursing into nested states in order) into
    /// one piecewise message per address, applying `flatten_and_filter`
    /// semantics: scalar writes at the same index overwrite, at a
    /// different index promote to piecewise, and a whole-value write
    /// (`index == []`) clears any prior entry for that address.
    pub fn flatten(&self) -> Vec<PiecewiseMessage> {
        let mut order: Vec<String> = Vec::new();
        let mut by_address: std::collections::HashMap<String, FlattenEntry> = std::collections::HashMap::new();
        self.flatten_into(&mut order, &mut by_address);
        order
            .into_iter()
            .map(|addr| match by_address.remove(&addr).unwrap() {
                FlattenEntry::Scalar(index, value) => {
                    let mut p = PiecewiseMessage::new(addr);
                    if index.is_empty() {
                        p.slots = vec![Some(value)];
                    } else {
                        p.set(&index, value);
                    }
                    p
                }
                FlattenEntry::Piecewise(p) => p,
            })
            .collect()
    }

    fn flatten_into(&self, order: &mut Vec<String>, by_address: &mut std::collections::HashMap<String, FlattenEntry>) {
        for element in &self.elements {
            match element {
                StateElement::Message(m) => apply_message(order, by_address, m),
                StateElement::Piecewise(p) => apply_piecewise(order, by_address, p),
                StateElement::Nested(nested) => nested.flatten_into(order, by_address),
            }
        }
    }
}

enum FlattenEntry {
    Scalar(Vec<usize>, Value),
    Piecewise(PiecewiseMessage),
}

fn apply_message(order: &mut Vec<String>, by_address: &mut std::collections::HashMap<String, FlattenEntry>, m: &Message) {
    let addr = &m.destination.address;
    if m.destination.index.is_empty() {
        // Whole-value write: clear any prior entry, start fresh.
        if !by_address.contains_key(addr) {
            order.push(addr.clone());
        }
        by_address.insert(addr.clone(), FlattenEntry::Scalar(Vec::new(), m.value.clone()));
        return;
    }
    match by_address.get_mut(addr) {
        None => {
            order.push(addr.clone());
            by_address.insert(addr.clone(), FlattenEntry::Scalar(m.destination.index.clone(), m.value.clone()));
        }
        Some(FlattenEntry::Scalar(existing_index, existing_value)) => {
            if *existing_index == m.destination.index {
                *existing_value = m.value.clone();
            } else {
                let mut p = PiecewiseMessage::new(addr.clone());
                p.set(existing_index, existing_value.clone());
                p.set(&m.destination.index, m.value.clone());
                by_address.insert(addr.clone(), FlattenEntry::Piecewise(p));
            }
        }
        Some(FlattenEntry::Piecewise(p)) => {
            p.set(&m.destination.index, m.value.clone());
        }
    }
}

fn apply_piecewise(order: &mut Vec<String>, by_address: &mut std::collections::HashMap<String, FlattenEntry>, incoming: &PiecewiseMessage) {
    match by_address.get_mut(&incoming.address) {
        None => {
            order.push(incoming.address.clone());
            by_address.insert(incoming.address.clone(), FlattenEntry::Piecewise(incoming.clone()));
        }
        Some(FlattenEntry::Piecewise(p)) => p.merge_from(incoming),
        Some(FlattenEntry::Scalar(existing_index, existing_value)) => {
            let mut p = PiecewiseMessage::new(incoming.address.clone());
            if existing_index.is_empty() {
                p.set(&[0], existing_value.clone());
            } else {
                p.set(existing_index, existing_value.clone());
            }
            p.merge_from(incoming);
            by_address.insert(incoming.address.clone(), FlattenEntry::Piecewise(p));
        }
    }
}

/// Applies `partial` to `current` at `destination.index`, via [`merge`].
/// Used once a flattened piecewise message's slot is ready to be written
/// into a parameter's live value.
pub fn apply_to_value(current: &Value, partial: Value, destination: &Destination) -> Value {
    merge(current, partial, &destination.index)
}

#[cfg(test)]
mod tests;
