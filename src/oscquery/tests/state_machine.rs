use crate::net::NetworkContext;
use crate::oscquery::{Mirror, MirrorState};
use crate::tree::Node;

#[test]
fn a_fresh_mirror_starts_disconnected() {
    let root = Node::root("root");
    let context = NetworkContext::new().unwrap();
    let mirror = Mirror::new(root, "ws://127.0.0.1:9999", context.handle());
    assert_eq!(mirror.state(), MirrorState::Disconnected);
}

#[test]
fn stop_transitions_to_stopped_regardless_of_prior_state() {
    let root = Node::root("root");
    let context = NetworkContext::new().unwrap();
    let mirror = Mirror::new(root, "ws://127.0.0.1:9999", context.handle());
    mirror.stop();
    assert_eq!(mirror.state(), MirrorState::Stopped);
}

#[test]
fn http_base_is_derived_by_swapping_the_ws_scheme() {
    let root = Node::root("root");
    let context = NetworkContext::new().unwrap();
    let mirror = Mirror::new(root, "ws://127.0.0.1:9999/", context.handle());
    assert_eq!(mirror.http_base(), "http://127.0.0.1:9999/");
}
