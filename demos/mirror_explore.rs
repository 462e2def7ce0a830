//! Connects to a remote OSCQuery host and prints tree structure and value
//! changes as they arrive — a small diagnostic tool in the same spirit as
//! the relay server's plain startup logging (`relay/src/main.rs`), minus
//! the argument parsing this crate has no dependency for.

use branchwire::net::NetworkContext;
use branchwire::oscquery::{Mirror, MirrorState};
use branchwire::tree::Node;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env().add_directive("branchwire=debug".parse().unwrap())).init();

    let ws_url = std::env::args().nth(1).unwrap_or_else(|| "ws://127.0.0.1:5678".to_string());

    let mut context = NetworkContext::new().expect("failed to start reactor");
    let handle = context.handle();

    let root = Node::root("mirror");
    root.on_node_created(|node| {
        tracing::info!("+ {}", node.path());
    });
    root.on_attribute_modified(|address| {
        tracing::info!("~ {address}");
    });

    let mirror = Mirror::new(root.clone(), ws_url.clone(), handle.clone());
    mirror.connect();

    handle.post({
        let mirror = mirror.clone();
        async move {
            loop {
                NetworkContext::sleep(Duration::from_secs(2)).await;
                tracing::debug!("mirror state: {:?}", mirror.state());
            }
        }
    });

    println!("mirroring {ws_url}, press Ctrl-C to stop");
    context.run();
}
