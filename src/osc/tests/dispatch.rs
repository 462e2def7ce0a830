use crate::net::{NetworkContext, Transport};
use crate::osc::codec::DecodedMessage;
use crate::osc::config::{Endpoint, FramingKind, Mode, OscProtocolConfig, OscVersion, TransportKind};
use crate::osc::protocol::OscProtocol;
use crate::tree::{AccessMode, Parameter};
use crate::value::Value;
use std::sync::{Arc, Mutex};

fn test_config() -> OscProtocolConfig {
    OscProtocolConfig {
        transport: TransportKind::Udp,
        mode: Mode::Server,
        version: OscVersion::Osc1_1,
        framing: FramingKind::SizePrefix,
        endpoint: Endpoint::Network("127.0.0.1:0".parse().unwrap()),
    }
}

async fn make_protocol() -> (OscProtocol, crate::tree::Node) {
    let root = crate::tree::Node::root("root");
    let transport = Transport::bind_udp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let context = NetworkContext::new().unwrap();
    let handle = context.handle();
    (OscProtocol::new(root.clone(), transport, handle, test_config()), root)
}

#[tokio::test]
async fn exact_match_writes_to_the_parameter() {
    let (protocol, root) = make_protocol().await;
    let child = root.create_node("freq");
    child.set_parameter(Parameter::new(Value::Float(0.0), AccessMode::Bi));

    protocol.dispatch_inbound(vec![DecodedMessage { address: "/freq".into(), value: Value::Float(440.0) }]);

    assert_eq!(child.with_parameter(|p| p.value().clone()), Some(Value::Float(440.0)));
}

#[tokio::test]
async fn pattern_address_fans_out_to_every_match() {
    let (protocol, root) = make_protocol().await;
    let group = root.create_node("osc");
    let a = group.create_node("a");
    let b = group.create_node("b");
    a.set_parameter(Parameter::new(Value::Float(0.0), AccessMode::Bi));
    b.set_parameter(Parameter::new(Value::Float(0.0), AccessMode::Bi));

    protocol.dispatch_inbound(vec![DecodedMessage { address: "/osc/*".into(), value: Value::Float(1.0) }]);

    assert_eq!(a.with_parameter(|p| p.value().clone()), Some(Value::Float(1.0)));
    assert_eq!(b.with_parameter(|p| p.value().clone()), Some(Value::Float(1.0)));
}

#[tokio::test]
async fn unmatched_address_invokes_the_unhandled_callback() {
    let (protocol, _root) = make_protocol().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    protocol.on_unhandled_message(move |addr, value| {
        seen_clone.lock().unwrap().push((addr.to_string(), value.clone()));
    });

    protocol.dispatch_inbound(vec![DecodedMessage { address: "/nope".into(), value: Value::Int(1) }]);

    let recorded = seen.lock().unwrap();
    assert_eq!(recorded.as_slice(), &[("/nope".to_string(), Value::Int(1))]);
}
