//! Binds the OSC codec to a transport and the device tree: inbound
//! addresses are looked up (exact match, or pattern fan-out for
//! pattern-bearing addresses) and routed to parameters; unmatched
//! addresses fall through to `on_unhandled_message`.

use super::codec::{decode_message_lenient, decode_packet, encode_message, DecodedMessage};
use super::config::OscProtocolConfig;
use crate::logger::{default_logger, Log};
use crate::net::{Handle, Transport};
use crate::protocol::Protocol;
use crate::tree::Node;
use crate::value::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;

type UnhandledCallback = Box<dyn Fn(&str, &Value) + Send + Sync>;

/// An OSC binding of a device tree to one transport (UDP, TCP+SLIP, or
/// Unix). `push`/`push_raw`/`observe` post work onto the owning
/// [`crate::net::NetworkContext`]; inbound dispatch happens on the
/// reactor thread via [`OscProtocol::dispatch_inbound`], called from the
/// transport's read loop.
pub struct OscProtocol {
    root: Node,
    transport: Arc<AsyncMutex<Transport>>,
    handle: Handle,
    logger: Arc<dyn Log>,
    strict: bool,
    observed: Arc<StdMutex<HashSet<String>>>,
    on_unhandled: Arc<StdMutex<Option<UnhandledCallback>>>,
    stopped: Arc<std::sync::atomic::AtomicBool>,
}

impl OscProtocol {
    pub fn new(root: Node, transport: Transport, handle: Handle, _config: OscProtocolConfig) -> Self {
        OscProtocol {
            root,
            transport: Arc::new(AsyncMutex::new(transport)),
            handle,
            logger: default_logger(),
            strict: false,
            observed: Arc::new(StdMutex::new(HashSet::new())),
            on_unhandled: Arc::new(StdMutex::new(None)),
            stopped: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Log>) -> Self {
        self.logger = logger;
        self
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn on_unhandled_message(&self, f: impl Fn(&str, &Value) + Send + Sync + 'static) {
        *self.on_unhandled.lock().unwrap() = Some(Box::new(f));
    }

    /// Applies one decoded packet's messages to the tree, exact-matching
    /// first and falling back to pattern fan-out only when the address
    /// itself carries pattern metacharacters.
    pub fn dispatch_inbound(&self, messages: Vec<DecodedMessage>) {
        for DecodedMessage { address, value } in messages {
            let is_pattern = address.contains(['*', '?', '[', '{']);
            let matched = if is_pattern {
                self.root.find_nodes(&address).unwrap_or_default()
            } else {
                self.root.find_node(&address).into_iter().collect()
            };
            if matched.is_empty() {
                if let Some(cb) = self.on_unhandled.lock().unwrap().as_ref() {
                    cb(&address, &value);
                } else {
                    self.logger.warn("osc", format!("unhandled OSC address: {address}"));
                }
                continue;
            }
            for node in matched {
                if !node.push_value(value.clone()) {
                    self.logger.debug("osc", format!("write to {address} suppressed or rejected"));
                }
            }
        }
    }

    fn send_async(&self, address: String, value: Value) {
        let transport = self.transport.clone();
        let logger = self.logger.clone();
        self.handle.post(async move {
            let Ok(bytes) = encode_message(&address, &value) else {
                logger.error("osc", format!("failed to encode value for {address}"));
                return;
            };
            if let Err(e) = transport.lock().await.send(&bytes).await {
                logger.warn("osc", format!("send to {address} failed: {e}"));
            }
        });
    }

    /// Feeds bytes read from the transport through the codec and
    /// dispatcher; intended to be driven by the transport's own read
    /// loop task.
    pub async fn poll_inbound_once(&self) -> bool {
        let frames = match self.transport.lock().await.recv().await {
            Ok(frames) => frames,
            Err(e) => {
                self.logger.warn("osc", format!("transport read failed: {e}"));
                return false;
            }
        };
        for frame in frames {
            match decode_packet(&frame) {
                Ok(messages) => self.dispatch_inbound(messages),
                Err(e) if self.strict => {
                    self.logger.error("osc", format!("codec error (strict), rejecting message: {e}"));
                }
                Err(e) => match decode_message_lenient(&frame) {
                    Some((message, substitutions)) if substitutions > 0 => {
                        self.logger.warn(
                            "osc",
                            format!("codec error: {e}; decoded {} with {substitutions} unrecognized tag(s) substituted", message.address),
                        );
                        self.dispatch_inbound(vec![message]);
                    }
                    Some((message, _)) => self.dispatch_inbound(vec![message]),
                    None => {
                        self.logger.warn("osc", format!("dropping malformed OSC packet: {e}"));
                    }
                },
            }
        }
        true
    }
}

impl Protocol for OscProtocol {
    fn pull(&mut self, node: &Node) -> bool {
        // Plain OSC has no query mechanism; the cached value is the best
        // available answer, so a pull always succeeds immediately.
        node.has_parameter()
    }

    fn push(&mut self, node: &Node) -> bool {
        let Some(value) = node.with_parameter(|p| p.value().clone()) else {
            return false;
        };
        self.send_async(node.path(), value);
        true
    }

    fn push_raw(&mut self, address: &str, value: &Value) -> bool {
        self.send_async(address.to_string(), value.clone());
        true
    }

    fn observe(&mut self, node: &Node, enable: bool) -> bool {
        let address = node.path();
        let mut observed = self.observed.lock().unwrap();
        if enable {
            observed.insert(address);
        } else {
            observed.remove(&address);
        }
        true
    }

    fn update(&mut self, _root: &Node) -> bool {
        true
    }

    fn stop(&mut self) {
        self.stopped.store(true, std::sync::atomic::Ordering::Release);
    }
}
