use crate::tree::parameter::{apply_bounding, BoundingMode, Domain};
use crate::value::Value;

#[test]
fn clip_saturates_at_bounds() {
    let out = apply_bounding(Value::Float(12.0), &Domain::Range(0.0, 10.0), BoundingMode::Clip);
    assert_eq!(out, Value::Float(10.0));
    let out = apply_bounding(Value::Float(-5.0), &Domain::Range(0.0, 10.0), BoundingMode::Clip);
    assert_eq!(out, Value::Float(0.0));
}

#[test]
fn wrap_goes_around() {
    let out = apply_bounding(Value::Float(11.0), &Domain::Range(0.0, 10.0), BoundingMode::Wrap);
    assert_eq!(out, Value::Float(1.0));
}

#[test]
fn fold_bounces_back() {
    let out = apply_bounding(Value::Float(12.0), &Domain::Range(0.0, 10.0), BoundingMode::Fold);
    assert_eq!(out, Value::Float(8.0));
}

#[test]
fn low_only_clamps_below() {
    let out = apply_bounding(Value::Float(-1.0), &Domain::Range(0.0, 10.0), BoundingMode::Low);
    assert_eq!(out, Value::Float(0.0));
    let out = apply_bounding(Value::Float(20.0), &Domain::Range(0.0, 10.0), BoundingMode::Low);
    assert_eq!(out, Value::Float(20.0));
}

#[test]
fn bounding_applies_per_component_of_a_vector() {
    let out = apply_bounding(Value::Vec3f([-1.0, 5.0, 11.0]), &Domain::Range(0.0, 10.0), BoundingMode::Clip);
    assert_eq!(out, Value::Vec3f([0.0, 5.0, 10.0]));
}

#[test]
fn unbounded_domain_passes_through() {
    let out = apply_bounding(Value::Float(999.0), &Domain::Unbounded, BoundingMode::Clip);
    assert_eq!(out, Value::Float(999.0));
}
