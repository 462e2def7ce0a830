use crate::state::{Destination, Message, PiecewiseMessage, State, StateElement};
use crate::value::Value;

fn msg(index: usize, value: f64) -> StateElement {
    StateElement::Message(Message { destination: Destination::at("/n1", vec![index]), value: Value::Float(value) })
}

/// All six orderings of three writes, written out rather than generated,
/// to exercise the commutativity property literally rather than via a
/// permutation-generating dependency.
fn all_orderings() -> [[(usize, f64); 3]; 6] {
    let w = [(0usize, 5.0), (1, 10.0), (2, 15.0)];
    [
        [w[0], w[1], w[2]],
        [w[0], w[2], w[1]],
        [w[1], w[0], w[2]],
        [w[1], w[2], w[0]],
        [w[2], w[0], w[1]],
        [w[2], w[1], w[0]],
    ]
}

#[test]
fn flattening_is_commutative_over_disjoint_indices() {
    let mut results = Vec::new();
    for ordering in all_orderings() {
        let mut state = State::new();
        for (idx, v) in ordering {
            state.push(msg(idx, v));
        }
        results.push(state.flatten());
    }
    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
    let flattened = &results[0];
    assert_eq!(flattened.len(), 1);
    assert_eq!(
        flattened[0].to_value(),
        Value::List(vec![Value::Float(5.0), Value::Float(10.0), Value::Float(15.0)])
    );
}

#[test]
fn overwrite_replaces_only_the_written_index() {
    let mut state = State::new();
    state.push(msg(0, 5.0));
    state.push(msg(1, 10.0));
    state.push(msg(2, 15.0));
    state.push(msg(0, 7.0));
    let flattened = state.flatten();
    assert_eq!(flattened.len(), 1);
    assert_eq!(
        flattened[0].to_value(),
        Value::List(vec![Value::Float(7.0), Value::Float(10.0), Value::Float(15.0)])
    );
}

#[test]
fn whole_value_write_clears_prior_indexed_entries() {
    let mut state = State::new();
    state.push(msg(0, 5.0));
    state.push(StateElement::Message(Message {
        destination: Destination::whole("/n1"),
        value: Value::String("reset".into()),
    }));
    let flattened = state.flatten();
    assert_eq!(flattened.len(), 1);
    assert_eq!(flattened[0].to_value(), Value::List(vec![Value::String("reset".into())]));
}

#[test]
fn at_most_one_entry_per_address_after_flatten() {
    let mut state = State::new();
    state.push(msg(0, 1.0));
    state.push(StateElement::Message(Message { destination: Destination::at("/n2", vec![0]), value: Value::Float(2.0) }));
    state.push(msg(1, 3.0));
    let flattened = state.flatten();
    let addrs: std::collections::HashSet<_> = flattened.iter().map(|p| p.address.clone()).collect();
    assert_eq!(addrs.len(), 2);
}

#[test]
fn nested_state_recurses() {
    let mut inner = State::new();
    inner.push(msg(0, 1.0));
    let mut outer = State::new();
    outer.push(StateElement::Nested(inner));
    outer.push(msg(1, 2.0));
    let flattened = outer.flatten();
    assert_eq!(flattened.len(), 1);
    assert_eq!(flattened[0].to_value(), Value::List(vec![Value::Float(1.0), Value::Float(2.0)]));
}

#[test]
fn piecewise_state_element_merges_into_existing_entry() {
    let mut state = State::new();
    state.push(msg(0, 1.0));
    let mut incoming = PiecewiseMessage { address: "/n1".into(), slots: vec![None, Some(Value::Float(2.0))] };
    incoming.address = "/n1".into();
    state.push(StateElement::Piecewise(incoming));
    let flattened = state.flatten();
    assert_eq!(flattened.len(), 1);
    assert_eq!(flattened[0].to_value(), Value::List(vec![Value::Float(1.0), Value::Float(2.0)]));
}
