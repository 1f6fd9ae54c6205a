//! Client side of one MRCPv2 channel.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use mrcp_core::{Exchange, MethodName, RequestState};
use mrcp_protocol::{
    ChannelIdentifier, ChannelSink, ChannelTable, ConnectionHandle, HeaderValue, MrcpError,
    MrcpMessage, MrcpRequest, MrcpResponse, MrcpResult, header,
};
use tracing::{debug, instrument};

use crate::correlator::{RequestCorrelator, ResponseSlot};

/// Receives events and responses no request is waiting for.
pub type EventListener = Arc<dyn Fn(MrcpMessage) + Send + Sync>;

/// The part of a channel the connection pump delivers into.
pub(crate) struct ChannelState {
    channel: ChannelIdentifier,
    correlator: Arc<RequestCorrelator>,
    listener: RwLock<Option<EventListener>>,
    unsolicited: Exchange<MrcpMessage, MrcpError>,
    closed: AtomicBool,
}

impl ChannelState {
    pub(crate) fn new(channel: ChannelIdentifier, correlator: Arc<RequestCorrelator>) -> Self {
        Self {
            channel,
            correlator,
            listener: RwLock::new(None),
            unsolicited: Exchange::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn listener(&self) -> Option<EventListener> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notify(&self, message: MrcpMessage) {
        match self.listener() {
            Some(listener) => listener(message),
            None => self.unsolicited.put(message),
        }
    }
}

impl ChannelSink for ChannelState {
    fn deliver(&self, message: MrcpMessage, _connection: &ConnectionHandle) {
        if let Some(message) = self.correlator.handle(message) {
            debug!(channel = %self.channel, message = %message, "unsolicited message");
            self.notify(message);
        }
    }

    fn connection_closed(&self, _connection_id: u64, reason: &MrcpError) {
        self.correlator.fail_channel(self.channel.key(), reason);
        self.unsolicited
            .put_failure(MrcpError::connection_closed(reason.to_string()));
    }
}

/// A channel opened on a client session.
///
/// Request-ids are assigned on send from a per-channel counter starting at 1.
pub struct MrcpChannel {
    state: Arc<ChannelState>,
    connection: ConnectionHandle,
    table: ChannelTable,
    next_request_id: AtomicU64,
    request_timeout: Option<Duration>,
}

impl MrcpChannel {
    pub(crate) fn new(
        state: Arc<ChannelState>,
        connection: ConnectionHandle,
        table: ChannelTable,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            state,
            connection,
            table,
            next_request_id: AtomicU64::new(1),
            request_timeout,
        }
    }

    pub fn channel(&self) -> &ChannelIdentifier {
        &self.state.channel
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// A request for `method` carrying this channel's identifier.
    pub fn create_request(&self, method: MethodName) -> MrcpRequest {
        MrcpRequest::new(method, &self.state.channel)
    }

    /// Sends `request` and returns a handle on its outcome.
    ///
    /// The request-id is overwritten with the next one for this channel;
    /// a missing `Channel-Identifier` is filled in.
    #[instrument(skip_all, fields(channel = %self.state.channel, method = %request.method()))]
    pub fn invoke(&self, mut request: MrcpRequest) -> MrcpResult<PendingRequest> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        request.set_request_id(request_id);
        if request.header(header::CHANNEL_IDENTIFIER).is_none() {
            request.set_typed_header(
                header::CHANNEL_IDENTIFIER,
                HeaderValue::ChannelIdentifier(self.state.channel.clone()),
            );
        }

        let key = self.state.channel.key();
        let slot = self.state.correlator.register(key, request_id);
        // close() may have run since the check above
        if self.is_closed() {
            self.state.correlator.forget(key, request_id);
            return Err(self.closed_error());
        }
        if let Err(err) = self.connection.send(request) {
            self.state.correlator.forget(key, request_id);
            return Err(err);
        }
        debug!(request_id, "request sent");

        Ok(PendingRequest {
            request_id,
            slot,
            timeout: self.request_timeout,
        })
    }

    /// Sends `request` and waits for its response.
    ///
    /// Status codes outside `200..=299` come back as an invocation error
    /// carrying the response.
    pub async fn send_request(&self, request: MrcpRequest) -> MrcpResult<MrcpResponse> {
        self.invoke(request)?.response().await?.into_result()
    }

    /// Next message no request was waiting for. Only fed while no event
    /// listener is set.
    pub async fn next_event(&self) -> MrcpResult<MrcpMessage> {
        self.state.unsolicited.take().await
    }

    /// Like [`next_event`](Self::next_event), bounded by `timeout`.
    pub async fn next_event_timeout(&self, timeout: Duration) -> MrcpResult<MrcpMessage> {
        self.state
            .unsolicited
            .take_timeout(timeout)
            .await
            .map_err(|_| MrcpError::timeout(format!("no event within {timeout:?}")))?
    }

    pub fn try_next_event(&self) -> Option<MrcpResult<MrcpMessage>> {
        self.state.unsolicited.try_take()
    }

    /// Routes unsolicited messages to `listener` from now on. Messages
    /// already queued are handed to it first.
    pub fn set_event_listener<F>(&self, listener: F)
    where
        F: Fn(MrcpMessage) + Send + Sync + 'static,
    {
        let listener: EventListener = Arc::new(listener);
        *self
            .state
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&listener));

        while let Some(Ok(message)) = self.state.unsolicited.try_take() {
            listener(message);
        }
    }

    /// Goes back to queueing unsolicited messages for
    /// [`next_event`](Self::next_event).
    pub fn clear_event_listener(&self) {
        *self
            .state
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn pending_requests(&self) -> usize {
        self.state.correlator.pending_on(self.state.channel.key())
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    fn closed_error(&self) -> MrcpError {
        MrcpError::connection_closed(format!("channel {} is closed", self.state.channel))
    }

    /// Stops routing to this channel, fails its outstanding requests and
    /// releases anyone waiting in [`next_event`](Self::next_event). Later
    /// calls to [`invoke`](Self::invoke) fail.
    pub fn close(&self) {
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let key = self.state.channel.key();
        self.table.unregister(key);
        let reason = self.closed_error();
        self.state.correlator.fail_channel(key, &reason);
        self.state.unsolicited.put_failure(reason);
        debug!(channel = %self.state.channel, "channel closed");
    }
}

impl fmt::Debug for MrcpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MrcpChannel")
            .field("channel", &self.state.channel)
            .field("connection", &self.connection.id())
            .finish()
    }
}

/// Outcome of one sent request.
///
/// Holding this keeps the request's slot alive; dropping it sends any
/// later response or completion to the channel's event listener.
pub struct PendingRequest {
    request_id: u64,
    slot: Arc<ResponseSlot>,
    timeout: Option<Duration>,
}

impl PendingRequest {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    async fn next(&self) -> MrcpResult<MrcpMessage> {
        match self.timeout {
            Some(timeout) => self.slot.take_timeout(timeout).await.map_err(|_| {
                MrcpError::timeout(format!(
                    "request {} timed out after {timeout:?}",
                    self.request_id
                ))
            })?,
            None => self.slot.take().await,
        }
    }

    /// Waits for the response. It may be `IN-PROGRESS`; see
    /// [`completion`](Self::completion).
    pub async fn response(&self) -> MrcpResult<MrcpResponse> {
        expect_response(self.next().await?)
    }

    /// Waits until the request is complete and returns the message that
    /// completed it: a `COMPLETE` response or the completion event.
    /// A failed response is returned as an invocation error.
    pub async fn completion(&self) -> MrcpResult<MrcpMessage> {
        loop {
            if let Some(done) = completed(self.next().await?)? {
                return Ok(done);
            }
        }
    }

    /// [`response`](Self::response) for a plain thread. Ignores the
    /// request timeout.
    pub fn blocking_response(&self) -> MrcpResult<MrcpResponse> {
        expect_response(self.slot.blocking_take()?)
    }

    /// [`completion`](Self::completion) for a plain thread. Ignores the
    /// request timeout.
    pub fn blocking_completion(&self) -> MrcpResult<MrcpMessage> {
        loop {
            if let Some(done) = completed(self.slot.blocking_take()?)? {
                return Ok(done);
            }
        }
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("request_id", &self.request_id)
            .field("queued", &self.slot.len())
            .finish()
    }
}

fn expect_response(message: MrcpMessage) -> MrcpResult<MrcpResponse> {
    match message {
        MrcpMessage::Response(response) => Ok(response),
        other => Err(MrcpError::protocol_violation(format!(
            "expected a response, got {other}"
        ))),
    }
}

fn completed(message: MrcpMessage) -> MrcpResult<Option<MrcpMessage>> {
    match message {
        MrcpMessage::Response(response) if !response.is_success() => {
            Err(MrcpError::invocation(response))
        }
        message if message.request_state() == Some(RequestState::Complete) => Ok(Some(message)),
        _ => Ok(None),
    }
}
