//! Per-request context handed to resource handlers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mrcp_core::{EventName, RequestState, StatusCode};
use mrcp_protocol::{
    ChannelIdentifier, ConnectionHandle, MrcpEvent, MrcpResponse, MrcpResult, header,
};
use tracing::{debug, warn};

/// Events sent before the handler's response has been queued.
#[derive(Debug, Default)]
struct EventGate {
    open: bool,
    held: Vec<MrcpEvent>,
}

/// Lets a handler build its response and emit events for the request it
/// is serving. Cloneable, so a handler can move it into a background task
/// that finishes the request later.
///
/// Events always reach the client after the response: anything sent while
/// the handler is still running is held and flushed once the response has
/// been queued.
#[derive(Debug, Clone)]
pub struct MrcpSession {
    channel: ChannelIdentifier,
    request_id: u64,
    connection: ConnectionHandle,
    gate: Arc<Mutex<EventGate>>,
}

impl MrcpSession {
    pub(crate) fn new(
        channel: ChannelIdentifier,
        request_id: u64,
        connection: ConnectionHandle,
    ) -> Self {
        Self {
            channel,
            request_id,
            connection,
            gate: Arc::default(),
        }
    }

    fn gate(&self) -> MutexGuard<'_, EventGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by the dispatcher once the response is queued. Held events
    /// go out in the order they were sent.
    pub(crate) fn release_events(&self) {
        let mut gate = self.gate();
        gate.open = true;
        for event in gate.held.drain(..) {
            if let Err(err) = self.connection.send(event) {
                warn!(error = %err, request_id = self.request_id, "held event not sent");
            }
        }
    }

    pub fn channel(&self) -> &ChannelIdentifier {
        &self.channel
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn connection_id(&self) -> u64 {
        self.connection.id()
    }

    pub fn create_response(&self, status: StatusCode, state: RequestState) -> MrcpResponse {
        MrcpResponse::new(self.request_id, status, state, &self.channel)
    }

    pub fn create_event(&self, name: EventName, state: RequestState) -> MrcpEvent {
        MrcpEvent::new(name, self.request_id, state, &self.channel)
    }

    /// Writes an event to the client, or queues it behind the response. A
    /// missing `Channel-Identifier` is filled in from this session.
    pub fn send_event(&self, mut event: MrcpEvent) -> MrcpResult<()> {
        if event.header(header::CHANNEL_IDENTIFIER).is_none() {
            event.set_typed_header(
                header::CHANNEL_IDENTIFIER,
                mrcp_protocol::HeaderValue::ChannelIdentifier(self.channel.clone()),
            );
        }
        let mut gate = self.gate();
        if !gate.open {
            debug!(
                request_id = self.request_id,
                event = %event.event_name(),
                "holding event until the response is sent"
            );
            gate.held.push(event);
            return Ok(());
        }
        debug!(
            request_id = self.request_id,
            event = %event.event_name(),
            state = %event.request_state(),
            "sending event"
        );
        self.connection.send(event)
    }
}
