use crate::value::{merge, Value};

#[test]
fn empty_index_replaces_whole_value() {
    let current = Value::Int(1);
    let out = merge(&current, Value::Float(2.5), &[]);
    assert_eq!(out, Value::Float(2.5));
}

#[test]
fn writes_one_position_of_a_list() {
    let current = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    let out = merge(&current, Value::Int(99), &[1]);
    assert_eq!(out, Value::List(vec![Value::Int(1), Value::Int(99), Value::Int(3)]));
}

#[test]
fn index_past_end_extends_with_impulse() {
    let current = Value::List(vec![Value::Int(1)]);
    let out = merge(&current, Value::Int(9), &[3]);
    assert_eq!(
        out,
        Value::List(vec![Value::Int(1), Value::Impulse, Value::Impulse, Value::Int(9)])
    );
}

#[test]
fn nested_index_merges_component_of_a_vec() {
    let current = Value::Vec3f([1.0, 2.0, 3.0]);
    let out = merge(&current, Value::Float(9.0), &[1]);
    assert_eq!(out, Value::Vec3f([1.0, 9.0, 3.0]));
}

#[test]
fn disjoint_indices_commute() {
    let base = Value::List(vec![Value::Impulse, Value::Impulse, Value::Impulse]);
    let order1 = merge(&merge(&base, Value::Float(5.0), &[0]), Value::Float(10.0), &[1]);
    let order2 = merge(&merge(&base, Value::Float(10.0), &[1]), Value::Float(5.0), &[0]);
    assert_eq!(order1, order2);
}
