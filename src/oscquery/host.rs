//! The authoritative side: serves the device tree as an OSCQuery JSON
//! document over HTTP and broadcasts `PATH_CHANGED`/structural events to
//! connected mirrors over WebSocket.
//!
//! The HTTP tree endpoint and the WebSocket value channel are served on
//! separate listeners rather than multiplexed on one port behind a
//! `Connection: Upgrade` check (see `DESIGN.md`) — the teacher's own HTTP
//! server (`relay/src/relay.rs`) is a plain `hyper` service with no
//! WebSocket upgrade path to generalize from, and `tokio-tungstenite`'s
//! `accept_async` is the direct, already-dependent-on way to serve one.

use crate::net::Handle;
use crate::tree::{Node, SubscriptionId};
use crate::value::Value;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;

type WsSink = futures_util::stream::SplitSink<tokio_tungstenite::WebSocketStream<TcpStream>, WsMessage>;

/// One connected mirror: its send half plus the addresses it has asked
/// to stop receiving value-change notifications for via `IGNORE`.
struct ClientConnection {
    sink: WsSink,
    ignored: HashSet<String>,
}

/// A device tree published over OSCQuery to any number of mirrors.
#[derive(Clone)]
pub struct Host {
    root: Node,
    handle: Handle,
    clients: Arc<AsyncMutex<HashMap<u64, ClientConnection>>>,
    next_client_id: Arc<std::sync::atomic::AtomicU64>,
    next_unnamed_id: Arc<std::sync::atomic::AtomicU64>,
    subscription: Arc<StdMutex<Option<SubscriptionId>>>,
}

impl Host {
    pub fn new(root: Node, handle: Handle) -> Self {
        Host {
            root,
            handle,
            clients: Arc::new(AsyncMutex::new(HashMap::new())),
            next_client_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            next_unnamed_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            subscription: Arc::new(StdMutex::new(None)),
        }
    }

    /// Wires `attribute_modified` on the root so every committed write
    /// broadcasts a `PATH_CHANGED` frame to connected mirrors.
    pub fn start_broadcasting_changes(&self) {
        let this = self.clone();
        let id = self.root.on_attribute_modified(move |address| {
            if let Some(node) = this.root.find_node(address) {
                if let Some(value) = node.with_parameter(|p| p.value().clone()) {
                    this.broadcast_value_change(address, &value);
                }
            }
        });
        *self.subscription.lock().unwrap() = Some(id);
    }

    fn broadcast_value_change(&self, address: &str, value: &Value) {
        let this = self.clone();
        let address = address.to_string();
        let json = super::json::value_to_json(value);
        self.handle.post(async move {
            let payload = serde_json::json!({ address.clone(): json }).to_string();
            this.broadcast_to_listeners(&address, payload).await;
        });
    }

    /// Sends `text` to every client except those that `IGNORE`d `address`.
    async fn broadcast_to_listeners(&self, address: &str, text: String) {
        let mut clients = self.clients.lock().await;
        let mut dead = Vec::new();
        for (id, client) in clients.iter_mut() {
            if client.ignored.contains(address) {
                continue;
            }
            if client.sink.send(WsMessage::Text(text.clone())).await.is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            clients.remove(&id);
        }
    }

    /// Sends `text` to every connected client, regardless of `IGNORE`
    /// state — structural events (`PATH_ADDED` and friends) aren't
    /// value-change notifications, so `LISTEN`/`IGNORE` doesn't apply.
    async fn broadcast_text(&self, text: String) {
        let mut clients = self.clients.lock().await;
        let mut dead = Vec::new();
        for (id, client) in clients.iter_mut() {
            if client.sink.send(WsMessage::Text(text.clone())).await.is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            clients.remove(&id);
        }
    }

    /// Binds and serves the HTTP tree endpoint on `addr` until the
    /// returned task is dropped or the listener errors out.
    pub async fn serve_http(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        let root = self.root.clone();
        loop {
            let (socket, _peer) = listener.accept().await?;
            let root = root.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(socket);
                let service = service_fn(move |req| handle_http_request(req, root.clone()));
                if let Err(e) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!("oscquery HTTP connection error: {e}");
                }
            });
        }
    }

    /// Binds and serves the WebSocket value/event channel on `addr`.
    pub async fn serve_ws(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        loop {
            let (socket, _peer) = listener.accept().await?;
            let this = self.clone();
            tokio::spawn(async move {
                this.handle_ws_connection(socket).await;
            });
        }
    }

    async fn handle_ws_connection(&self, socket: TcpStream) {
        let Ok(stream) = tokio_tungstenite::accept_async(socket).await else {
            return;
        };
        let (sink, mut stream_rx) = stream.split();
        let id = self.next_client_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.clients.lock().await.insert(id, ClientConnection { sink, ignored: HashSet::new() });

        while let Some(message) = stream_rx.next().await {
            match message {
                Ok(WsMessage::Text(text)) => self.handle_client_request(id, &text).await,
                Ok(WsMessage::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
        self.clients.lock().await.remove(&id);
    }

    async fn handle_client_request(&self, id: u64, text: &str) {
        let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else { return };
        if let Some(command) = json.get("COMMAND").and_then(serde_json::Value::as_str) {
            if command == "PATH_ADD" {
                if let Some(full_path) = json.pointer("/DATA/FULL_PATH").and_then(serde_json::Value::as_str) {
                    self.handle_path_add(full_path);
                }
            }
            return;
        }
        if let Some(address) = json.get("LISTEN").and_then(serde_json::Value::as_str) {
            if let Some(client) = self.clients.lock().await.get_mut(&id) {
                client.ignored.remove(address);
            }
            return;
        }
        if let Some(address) = json.get("IGNORE").and_then(serde_json::Value::as_str) {
            if let Some(client) = self.clients.lock().await.get_mut(&id) {
                client.ignored.insert(address.to_string());
            }
        }
    }

    /// Creates the requested node, auto-suffixing on collision, and
    /// broadcasts a `PATH_ADDED` event reflecting the name actually used.
    fn handle_path_add(&self, full_path: &str) {
        let (parent_path, requested_name) = full_path.rsplit_once('/').unwrap_or(("", full_path));
        let parent_path = if parent_path.is_empty() { "/" } else { parent_path };
        let Some(parent) = self.root.find_node(parent_path) else { return };
        let name = if requested_name.is_empty() {
            format!("unnamed{}", self.next_unnamed_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
        } else {
            requested_name.to_string()
        };
        let child = parent.create_node(&name);
        let doc = super::json::encode_node(&child);
        let this = self.clone();
        self.handle.post(async move {
            let payload = serde_json::json!({ "COMMAND": "PATH_ADDED", "DATA": doc }).to_string();
            this.broadcast_text(payload).await;
        });
    }
}

async fn handle_http_request(_req: Request<Incoming>, root: Node) -> Result<Response<Full<Bytes>>, Infallible> {
    let doc = super::json::encode_node(&root);
    let body = serde_json::to_string(&doc).unwrap_or_else(|_| "{}".to_string());
    Ok(Response::new(Full::new(Bytes::from(body))))
}

#[cfg(test)]
mod host_tests {
    use super::*;
    use crate::net::NetworkContext;

    #[test]
    fn handle_path_add_creates_a_suffixed_sibling_on_collision() {
        let root = Node::root("root");
        let context = NetworkContext::new().unwrap();
        let host = Host::new(root.clone(), context.handle());

        host.handle_path_add("/layer");
        host.handle_path_add("/layer");

        let names: Vec<String> = root.children_snapshot().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["layer", "layer.1"]);
    }

    #[tokio::test]
    async fn ignore_then_listen_toggles_whether_a_client_receives_value_changes() {
        use crate::tree::{AccessMode, Parameter};
        use std::time::Duration;
        use tokio_tungstenite::tungstenite::Message as WsMessage;

        let root = Node::root("root");
        let level = root.create_node("level");
        level.set_parameter(Parameter::new(Value::Float(0.0), AccessMode::Bi));

        let mut context = NetworkContext::new().unwrap();
        let handle = context.handle();
        std::thread::spawn(move || context.run());

        let host = Host::new(root.clone(), handle.clone());
        host.start_broadcasting_changes();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let host_for_serve = host.clone();
        tokio::spawn(async move {
            let _ = host_for_serve.serve_ws(addr).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (ws_stream, _) = tokio_tungstenite::connect_async(format!("ws://{addr}")).await.unwrap();
        let (mut sink, mut stream) = ws_stream.split();

        sink.send(WsMessage::Text(r#"{"IGNORE":"/level"}"#.to_string())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        level.push_value(Value::Float(1.0));
        let ignored_result = tokio::time::timeout(Duration::from_millis(200), stream.next()).await;
        assert!(ignored_result.is_err(), "client should not receive a value change for an ignored address");

        sink.send(WsMessage::Text(r#"{"LISTEN":"/level"}"#.to_string())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        level.push_value(Value::Float(2.0));
        let message = tokio::time::timeout(Duration::from_millis(500), stream.next())
            .await
            .expect("client should receive the value change once listening again")
            .unwrap()
            .unwrap();
        match message {
            WsMessage::Text(text) => assert!(text.contains("/level")),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
