//! The far side of the boundary: decides on intercepted requests and keeps
//! the log of observed responses.

use crate::{
    data::{Decision, InterceptedRequest, InterceptedResponseEvent},
    messages::Message,
    messenger::{AuthorityEnd, Messenger},
    toggle::Settings,
};
use log::{debug, info, warn};
use std::{
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};

/// Maps a request to an optional mock plus headers to inject. Opaque to the proxy.
pub trait DecisionMaker: Debug {
    fn decide(&self, request: &InterceptedRequest) -> Decision;
}

pub trait EventLog: Debug {
    fn record(&self, event: InterceptedResponseEvent);
}

#[derive(Debug, Default)]
pub struct LogEventLog;

impl EventLog for LogEventLog {
    fn record(&self, event: InterceptedResponseEvent) {
        info!(
            "{} {} {} -> {} ({:?}, {} bytes)",
            event.host,
            event.request.method,
            event.request.url,
            event.response.http_status_code,
            event.response.response_type,
            event.response.body.len()
        );
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<InterceptedResponseEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InterceptedResponseEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventLog for MemoryEventLog {
    fn record(&self, event: InterceptedResponseEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[derive(Debug, Clone)]
pub struct Authority {
    decision_maker: Arc<dyn DecisionMaker + Send + Sync>,
    event_log: Arc<dyn EventLog + Send + Sync>,
}

impl Authority {
    pub fn new(
        decision_maker: Arc<dyn DecisionMaker + Send + Sync>,
        event_log: Arc<dyn EventLog + Send + Sync>,
    ) -> Self {
        Self {
            decision_maker,
            event_log,
        }
    }

    /// Answers frames from the proxy until its side of the boundary closes.
    pub async fn serve(self, end: AuthorityEnd) {
        let AuthorityEnd {
            transport,
            mut inbound,
        } = end;
        let messenger = Messenger::new(Arc::new(transport));

        while let Some(frame) = inbound.recv().await {
            match Message::from_frame(&frame) {
                Ok(Message::RequestIntercepted(request)) => {
                    let mut decision = self.decision_maker.decide(&request);
                    decision.message_id = request.message_id;
                    debug!(
                        "{} {} -> {}",
                        request.method,
                        request.url,
                        if decision.mock.is_some() { "mock" } else { "network" }
                    );
                    messenger.send(&Message::RequestChecked(decision));
                }
                Ok(Message::ResponseIntercepted { event }) => self.event_log.record(event),
                Ok(other) => warn!("authority ignoring {} message", other.kind()),
                Err(e) => warn!("authority dropping malformed frame: {}", e),
            }
        }

        debug!("proxy side closed");
    }
}

/// Tells the proxy to turn interception on or off.
pub fn settings_changed(messenger: &Messenger, settings: Settings) {
    messenger.send(&Message::SettingsChanged { settings });
}
