//! The OSCQuery mirror: acquires a remote tree via HTTP+JSON and keeps it
//! synchronized through a WebSocket value/event channel, reconnecting with
//! backoff on failure.

use super::json::{decode_into_tree, json_to_scalar_value, value_to_json, NodeDocument};
use crate::logger::{default_logger, Log};
use crate::net::Handle;
use crate::tree::Node;
use crate::value::Value;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as Json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const BACKOFF_STEPS_MS: [u64; 5] = [250, 500, 1000, 2000, 5000];
const RUNNING_RESET_THRESHOLD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    Disconnected,
    HttpFetching,
    WsConnecting,
    Running,
    Failed,
    Stopped,
}

type WsSink = futures_util::stream::SplitSink<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>, WsMessage>;

/// A local tree that tracks a remote authoritative tree over OSCQuery.
/// Cheap to clone; every clone shares the same connection state, the same
/// way [`crate::net::NetworkContext`]'s `Handle` shares one task queue.
#[derive(Clone)]
pub struct Mirror {
    root: Node,
    http_base: String,
    ws_base: String,
    handle: Handle,
    logger: Arc<dyn Log>,
    state: Arc<StdMutex<MirrorState>>,
    listening: Arc<StdMutex<HashSet<String>>>,
    backoff_index: Arc<std::sync::atomic::AtomicUsize>,
    running_since: Arc<StdMutex<Option<Instant>>>,
    sink: Arc<AsyncMutex<Option<WsSink>>>,
}

impl Mirror {
    /// `ws_url` is the WebSocket base, e.g. `ws://host:port`; the HTTP root
    /// is derived by swapping the scheme.
    pub fn new(root: Node, ws_url: impl Into<String>, handle: Handle) -> Self {
        let ws_base = ws_url.into();
        let http_base = ws_base.replacen("ws://", "http://", 1).replacen("wss://", "https://", 1);
        Mirror {
            root,
            http_base,
            ws_base,
            handle,
            logger: default_logger(),
            state: Arc::new(StdMutex::new(MirrorState::Disconnected)),
            listening: Arc::new(StdMutex::new(HashSet::new())),
            backoff_index: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            running_since: Arc::new(StdMutex::new(None)),
            sink: Arc::new(AsyncMutex::new(None)),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Log>) -> Self {
        self.logger = logger;
        self
    }

    pub fn state(&self) -> MirrorState {
        *self.state.lock().unwrap()
    }

    pub fn http_base(&self) -> &str {
        &self.http_base
    }

    fn set_state(&self, state: MirrorState) {
        *self.state.lock().unwrap() = state;
        if state == MirrorState::Running {
            *self.running_since.lock().unwrap() = Some(Instant::now());
        }
    }

    /// Posts the connect sequence onto the reactor: HTTP fetch, tree
    /// decode, WebSocket handshake, then the read loop.
    pub fn connect(&self) {
        let this = self.clone();
        self.handle.post(async move {
            this.run_connect_sequence().await;
        });
    }

    async fn run_connect_sequence(&self) {
        self.set_state(MirrorState::HttpFetching);
        match self.fetch_tree().await {
            Ok(()) => {}
            Err(e) => {
                self.logger.warn("oscquery", format!("tree fetch failed: {e}"));
                self.set_state(MirrorState::Failed);
                self.schedule_reconnect();
                return;
            }
        }

        self.set_state(MirrorState::WsConnecting);
        match tokio_tungstenite::connect_async(self.ws_base.as_str()).await {
            Ok((stream, _response)) => {
                let (sink, mut stream_rx) = stream.split();
                *self.sink.lock().await = Some(sink);
                self.set_state(MirrorState::Running);
                self.backoff_index.store(0, std::sync::atomic::Ordering::Relaxed);
                self.resubscribe_listening().await;

                while let Some(message) = stream_rx.next().await {
                    match message {
                        Ok(WsMessage::Text(text)) => self.handle_text_event(&text),
                        Ok(WsMessage::Binary(bytes)) => self.handle_binary_event(&bytes),
                        Ok(WsMessage::Close(_)) | Err(_) => break,
                        _ => {}
                    }
                }
                self.on_disconnected();
            }
            Err(e) => {
                self.logger.warn("oscquery", format!("websocket connect failed: {e}"));
                self.set_state(MirrorState::Failed);
                self.schedule_reconnect();
            }
        }
    }

    fn on_disconnected(&self) {
        let persisted_long_enough = self
            .running_since
            .lock()
            .unwrap()
            .map(|since| since.elapsed() >= RUNNING_RESET_THRESHOLD)
            .unwrap_or(false);
        if persisted_long_enough {
            self.backoff_index.store(0, std::sync::atomic::Ordering::Relaxed);
        }
        self.set_state(MirrorState::Disconnected);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&self) {
        let index = self.backoff_index.load(std::sync::atomic::Ordering::Relaxed).min(BACKOFF_STEPS_MS.len() - 1);
        let delay = Duration::from_millis(BACKOFF_STEPS_MS[index]);
        self.backoff_index.store((index + 1).min(BACKOFF_STEPS_MS.len() - 1), std::sync::atomic::Ordering::Relaxed);
        let this = self.clone();
        self.handle.post(async move {
            if this.state() == MirrorState::Stopped {
                return;
            }
            crate::net::NetworkContext::sleep(delay).await;
            this.connect();
        });
    }

    async fn fetch_tree(&self) -> Result<(), crate::error::Error> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        let body = client.get(&self.http_base).send().await?.text().await?;
        let doc: NodeDocument = serde_json::from_str(&body)?;
        let existing_children = self.root.children_snapshot();
        for child in existing_children {
            self.root.remove_child(&child);
        }
        let root_name = doc.full_path.clone().unwrap_or_else(|| self.root.name());
        if let Some(contents) = &doc.contents {
            for (name, child_json) in contents {
                if let Ok(child_doc) = serde_json::from_value::<NodeDocument>(child_json.clone()) {
                    decode_into_tree(&child_doc, &self.root, name);
                }
            }
        }
        let _ = root_name;
        Ok(())
    }

    fn handle_text_event(&self, text: &str) {
        let Ok(json) = serde_json::from_str::<Json>(text) else {
            self.logger.warn("oscquery", "malformed JSON event frame");
            return;
        };
        if let Some(command) = json.get("COMMAND").and_then(Json::as_str) {
            self.handle_command_event(command, &json);
            return;
        }
        if let Json::Object(map) = &json {
            for (address, value_json) in map {
                if let Some(node) = self.root.find_node(address) {
                    node.push_value(json_to_scalar_value(value_json));
                }
            }
        }
    }

    fn handle_command_event(&self, command: &str, json: &Json) {
        match command {
            "PATH_ADDED" => {
                let Some(data) = json.get("DATA") else { return };
                let Ok(doc) = serde_json::from_value::<NodeDocument>(data.clone()) else { return };
                let Some(full_path) = &doc.full_path else { return };
                let (parent_path, name) = split_parent(full_path);
                if let Some(parent) = self.root.find_node(&parent_path) {
                    decode_into_tree(&doc, &parent, name);
                }
            }
            "PATH_REMOVED" => {
                if let Some(path) = json.get("DATA").and_then(Json::as_str) {
                    if let Some(node) = self.root.find_node(path) {
                        if let Some(parent) = node.parent() {
                            parent.remove_child(&node);
                        }
                    }
                }
            }
            "PATH_RENAMED" => {
                // Renaming in place isn't expressible through the current
                // `Node` API without a dedicated rename op; treat as
                // remove+re-add, which the subsequent PATH_ADDED supplies.
                if let Some(old_path) = json.get("OLD_NAME").and_then(Json::as_str) {
                    if let Some(node) = self.root.find_node(old_path) {
                        if let Some(parent) = node.parent() {
                            parent.remove_child(&node);
                        }
                    }
                }
            }
            "ATTRIBUTES_CHANGED" => {
                if let Some(data) = json.get("DATA") {
                    if let Ok(doc) = serde_json::from_value::<NodeDocument>(data.clone()) {
                        if let Some(path) = &doc.full_path {
                            let (parent_path, name) = split_parent(path);
                            if let Some(parent) = self.root.find_node(&parent_path) {
                                decode_into_tree(&doc, &parent, name);
                            }
                        }
                    }
                }
            }
            other => {
                self.logger.debug("oscquery", format!("unhandled OSCQuery command: {other}"));
            }
        }
    }

    fn handle_binary_event(&self, bytes: &[u8]) {
        match crate::osc::codec::decode_packet(bytes) {
            Ok(messages) => {
                for crate::osc::codec::DecodedMessage { address, value } in messages {
                    if let Some(node) = self.root.find_node(&address) {
                        node.push_value(value);
                    }
                }
            }
            Err(e) => self.logger.warn("oscquery", format!("malformed OSC binary frame: {e}")),
        }
    }

    async fn send_text(&self, text: String) {
        if let Some(sink) = self.sink.lock().await.as_mut() {
            if let Err(e) = sink.send(WsMessage::Text(text)).await {
                self.logger.warn("oscquery", format!("websocket send failed: {e}"));
            }
        }
    }

    /// Subscribes to value change notifications for `address`. Addresses
    /// are remembered so a reconnect re-subscribes automatically.
    pub fn listen(&self, address: &str) {
        self.listening.lock().unwrap().insert(address.to_string());
        let this = self.clone();
        let address = address.to_string();
        self.handle.post(async move { this.send_text(format!("{{\"LISTEN\":\"{address}\"}}")).await });
    }

    pub fn ignore(&self, address: &str) {
        self.listening.lock().unwrap().remove(address);
        let this = self.clone();
        let address = address.to_string();
        self.handle.post(async move { this.send_text(format!("{{\"IGNORE\":\"{address}\"}}")).await });
    }

    async fn resubscribe_listening(&self) {
        let addresses: Vec<String> = self.listening.lock().unwrap().iter().cloned().collect();
        for address in addresses {
            self.send_text(format!("{{\"LISTEN\":\"{address}\"}}")).await;
        }
    }

    /// Pushes a local write to the remote host as `PATH_CHANGED`.
    pub fn push_raw(&self, address: &str, value: &Value) {
        let this = self.clone();
        let address = address.to_string();
        let json = value_to_json(value);
        this.handle.post(async move {
            let payload = serde_json::json!({ address.clone(): json }).to_string();
            this.send_text(payload).await;
        });
    }

    /// Requests the remote host add a child named `requested_name` under
    /// `parent_path`; the server may rename on collision, reflected back
    /// through a subsequent `PATH_ADDED` event.
    pub fn request_add_node(&self, parent_path: &str, requested_name: &str) {
        let this = self.clone();
        let payload = serde_json::json!({
            "COMMAND": "PATH_ADD",
            "DATA": { "FULL_PATH": format!("{parent_path}/{requested_name}") },
        })
        .to_string();
        this.handle.post(async move { this.send_text(payload).await });
    }

    /// Resolves once the full-tree refetch has completed.
    pub async fn update(&self) -> Result<(), crate::error::Error> {
        self.fetch_tree().await
    }

    pub fn stop(&self) {
        self.set_state(MirrorState::Stopped);
    }
}

fn split_parent(path: &str) -> (String, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name),
        Some((parent, name)) => (parent.to_string(), name),
        None => ("/".to_string(), path),
    }
}

#[cfg(test)]
mod mirror_tests {
    use super::*;

    #[test]
    fn split_parent_handles_top_level_and_nested_paths() {
        assert_eq!(split_parent("/layer"), ("/".to_string(), "layer"));
        assert_eq!(split_parent("/a/b"), ("/a".to_string(), "b"));
    }

    #[test]
    fn backoff_schedule_is_the_expected_five_step_ramp() {
        assert_eq!(BACKOFF_STEPS_MS, [250, 500, 1000, 2000, 5000]);
    }

    #[test]
    fn json_scalar_round_trips_through_value() {
        let value = Value::Float(1.5);
        let json = value_to_json(&value);
        assert_eq!(json_to_scalar_value(&json), value);
    }
}
