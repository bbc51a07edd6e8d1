//! Fire-and-forget messaging across the proxy/authority boundary.
//!
//! Only JSON text frames cross the boundary. A [`Transport`] moves frames out,
//! and inbound frames are routed by [`MessageKind`] to subscribed handlers.

use crate::{
    error::Error,
    messages::{Message, MessageKind},
};
use log::{debug, error, warn};
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::{sync::mpsc, task::JoinHandle};

pub trait Transport: Debug {
    fn send(&self, frame: String) -> Result<(), Error>;
}

/// Transport backed by an unbounded tokio channel; never blocks the sender.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: String) -> Result<(), Error> {
        self.sender.send(frame).map_err(|_| Error::TransportClosed)
    }
}

/// The proxy's side of an in-process boundary.
#[derive(Debug)]
pub struct PageEnd {
    pub transport: ChannelTransport,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// The authority's side of an in-process boundary.
#[derive(Debug)]
pub struct AuthorityEnd {
    pub transport: ChannelTransport,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// Builds both ends of a boundary: frames sent on one end arrive on the other.
pub fn duplex() -> (PageEnd, AuthorityEnd) {
    let (to_authority, authority_inbound) = mpsc::unbounded_channel();
    let (to_page, page_inbound) = mpsc::unbounded_channel();

    (
        PageEnd {
            transport: ChannelTransport::new(to_authority),
            inbound: page_inbound,
        },
        AuthorityEnd {
            transport: ChannelTransport::new(to_page),
            inbound: authority_inbound,
        },
    )
}

type Handler = Arc<dyn Fn(Message) + Send + Sync>;
type RejectionHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
pub struct Messenger {
    transport: Arc<dyn Transport + Send + Sync>,
    handlers: Arc<RwLock<HashMap<MessageKind, Vec<Handler>>>>,
    rejections: Arc<RwLock<HashMap<MessageKind, Vec<RejectionHandler>>>>,
}

impl Messenger {
    pub fn new(transport: Arc<dyn Transport + Send + Sync>) -> Self {
        Self {
            transport,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            rejections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Sends `message` out. Failures are logged here and never reach the caller.
    pub fn send(&self, message: &Message) {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("could not encode {} message: {}", message.kind(), e);
                return;
            }
        };

        if let Err(e) = self.transport.send(frame) {
            error!("could not send {} message: {}", message.kind(), e);
        }
    }

    /// Registers `handler` for every inbound message of `kind`.
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F)
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_insert_with(Vec::new)
            .push(Arc::new(handler));
    }

    /// Registers `handler` for inbound frames of `kind` that carry a
    /// `messageId` but fail to parse. The handler gets that id.
    pub fn on_rejected<F>(&self, kind: MessageKind, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.rejections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_insert_with(Vec::new)
            .push(Arc::new(handler));
    }

    /// Parses one inbound frame and runs the handlers subscribed to its kind.
    pub fn deliver(&self, frame: &str) {
        let message = match Message::from_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping malformed frame: {}", e);
                self.reject(frame);
                return;
            }
        };

        let kind = message.kind();
        // Handlers run without the lock held so they may subscribe in turn.
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!("no handler for {} message", kind);
            return;
        }

        for handler in handlers {
            handler(message.clone());
        }
    }

    fn reject(&self, frame: &str) {
        let value: Value = match serde_json::from_str(frame) {
            Ok(value) => value,
            Err(_) => return,
        };
        let kind = match value.get("type").and_then(Value::as_str).and_then(MessageKind::from_name) {
            Some(kind) => kind,
            None => return,
        };
        let id = match value.get("messageId").and_then(Value::as_str) {
            Some(id) => id,
            None => return,
        };

        let handlers: Vec<RejectionHandler> = self
            .rejections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for handler in handlers {
            handler(id);
        }
    }

    /// Spawns the pump that delivers inbound frames in arrival order.
    pub fn listen(&self, mut inbound: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let messenger = self.clone();

        tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                messenger.deliver(&frame);
            }
            debug!("inbound channel closed");
        })
    }
}

impl Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("transport", &self.transport)
            .finish()
    }
}
