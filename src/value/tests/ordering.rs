use crate::value::Value;
use std::cmp::Ordering;

#[test]
fn variant_rank_dominates_content() {
    assert_eq!(Value::Int(1_000_000).cmp(&Value::Float(0.0)), Ordering::Less);
    assert_eq!(Value::Bool(false).cmp(&Value::Int(999)), Ordering::Greater);
}

#[test]
fn float_ordering_is_total_even_with_nan() {
    let nan = Value::Float(f64::NAN);
    let zero = Value::Float(0.0);
    assert_ne!(nan.cmp(&zero), Ordering::Equal);
    assert_eq!(nan.cmp(&nan), Ordering::Equal);
}

#[test]
fn lists_compare_lexicographically() {
    let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
    let b = Value::List(vec![Value::Int(1), Value::Int(3)]);
    assert_eq!(a.cmp(&b), Ordering::Less);
}

#[test]
fn display_matches_expected_textual_form() {
    assert_eq!(Value::Int(42).to_string(), "42");
    assert_eq!(Value::Vec2f([1.0, 2.0]).to_string(), "(1, 2)");
    assert_eq!(Value::String("hi".into()).to_string(), "\"hi\"");
}
