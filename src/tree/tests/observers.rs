use crate::tree::{AccessMode, Node, Parameter};
use crate::value::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn repetition_filter_suppresses_identical_consecutive_writes() {
    let mut p = Parameter::new(Value::Int(0), AccessMode::Bi);
    p.set_repetition_filter(true);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    p.on_value_changed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(p.push_value(Value::Int(5)));
    assert!(!p.push_value(Value::Int(5)));
    assert!(p.push_value(Value::Int(6)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn node_created_fires_on_parent() {
    let root = Node::root("dev");
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    root.on_node_created(move |_child| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    root.create_node("a");
    root.create_node("b");
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn remove_child_fires_about_to_be_deleted_and_detaches() {
    let root = Node::root("dev");
    let a = root.create_node("a");
    let deleted = Arc::new(AtomicUsize::new(0));
    let counter = deleted.clone();
    a.on_about_to_be_deleted(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(root.remove_child(&a));
    assert_eq!(deleted.load(Ordering::SeqCst), 1);
    assert!(root.find_child("a").is_none());
}

#[test]
fn push_value_fires_attribute_modified_with_address() {
    let root = Node::root("dev");
    let a = root.create_node("a");
    a.set_parameter(Parameter::new(Value::Int(0), AccessMode::Bi));
    let seen = Arc::new(std::sync::Mutex::new(String::new()));
    let slot = seen.clone();
    a.on_attribute_modified(move |addr| {
        *slot.lock().unwrap() = addr.to_string();
    });
    assert!(a.push_value(Value::Int(42)));
    assert_eq!(*seen.lock().unwrap(), "/a");
}
