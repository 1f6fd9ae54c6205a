//! One control connection carrying any number of channels.
//!
//! Each connection owns a read pump and a writer task. The pump decodes
//! messages and hands each one to the sink registered for its channel-id;
//! anything it cannot route goes to the owner's unrouted hook. Sinks are
//! called on the pump task and must only hand off.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::DEFAULT_MAX_MESSAGE_SIZE;
use crate::codec::MrcpCodec;
use crate::error::{MrcpError, MrcpResult};
use crate::header::ChannelIdentifier;
use crate::message::MrcpMessage;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Receives the messages addressed to one channel-id.
pub trait ChannelSink: Send + Sync {
    /// Called on the pump task, in arrival order.
    fn deliver(&self, message: MrcpMessage, connection: &ConnectionHandle);

    /// Called once when the connection stops, for every registered sink.
    fn connection_closed(&self, connection_id: u64, reason: &MrcpError);
}

/// Channel-id to sink map shared by the pump and channel owners.
#[derive(Clone, Default)]
pub struct ChannelTable {
    sinks: Arc<RwLock<HashMap<String, Arc<dyn ChannelSink>>>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink` under the channel's trimmed id, returning any sink
    /// it replaced.
    pub fn register(
        &self,
        channel: &ChannelIdentifier,
        sink: Arc<dyn ChannelSink>,
    ) -> Option<Arc<dyn ChannelSink>> {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.key().to_string(), sink)
    }

    pub fn unregister(&self, channel_id: &str) -> Option<Arc<dyn ChannelSink>> {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel_id.trim())
    }

    pub fn get(&self, channel_id: &str) -> Option<Arc<dyn ChannelSink>> {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel_id.trim())
            .cloned()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.get(channel_id).is_some()
    }

    /// Every registered sink, taken under one read lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn ChannelSink>> {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ChannelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelTable")
            .field("channels", &self.len())
            .finish()
    }
}

/// Why the pump could not hand a message to a sink.
#[derive(Debug)]
pub enum Unrouted {
    MissingChannel,
    InvalidChannel(MrcpError),
    UnknownChannel(ChannelIdentifier),
}

impl Unrouted {
    pub fn into_error(self) -> MrcpError {
        match self {
            Unrouted::MissingChannel => {
                MrcpError::protocol_violation("message has no Channel-Identifier header")
            }
            Unrouted::InvalidChannel(err) => err,
            Unrouted::UnknownChannel(channel) => {
                MrcpError::protocol_violation(format!("no channel registered for {channel}"))
            }
        }
    }
}

impl fmt::Display for Unrouted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unrouted::MissingChannel => f.write_str("missing Channel-Identifier"),
            Unrouted::InvalidChannel(err) => write!(f, "invalid Channel-Identifier: {err}"),
            Unrouted::UnknownChannel(channel) => write!(f, "unknown channel {channel}"),
        }
    }
}

/// Called on the pump task for every message no sink accepted.
pub type UnroutedHook = Arc<dyn Fn(MrcpMessage, Unrouted, &ConnectionHandle) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

struct HandleInner {
    id: u64,
    peer: String,
    outbound: mpsc::UnboundedSender<MrcpMessage>,
    closed: watch::Sender<bool>,
}

/// Cheap, cloneable reference to a running connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

impl ConnectionHandle {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn peer(&self) -> &str {
        &self.inner.peer
    }

    /// Queues a message for the writer task. Never blocks.
    pub fn send(&self, message: impl Into<MrcpMessage>) -> MrcpResult<()> {
        if self.is_closed() {
            return Err(MrcpError::connection_closed(format!(
                "connection {} to {} is closed",
                self.inner.id, self.inner.peer
            )));
        }
        self.inner
            .outbound
            .send(message.into())
            .map_err(|_| MrcpError::transport("connection writer has stopped"))
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Stops both tasks. Registered sinks are told through
    /// [`ChannelSink::connection_closed`].
    pub fn close(&self) {
        self.inner.closed.send_replace(true);
    }

    /// Resolves once the connection has stopped for any reason.
    pub async fn closed(&self) {
        wait_closed(&mut self.inner.closed.subscribe()).await;
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.inner.id)
            .field("peer", &self.inner.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub struct MrcpConnection;

impl MrcpConnection {
    /// Starts the pump and writer tasks for `stream`.
    pub fn spawn<S>(
        stream: S,
        peer: impl Into<String>,
        table: ChannelTable,
        unrouted: UnroutedHook,
        config: &ConnectionConfig,
    ) -> ConnectionHandle
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let peer = peer.into();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);

        let handle = ConnectionHandle {
            inner: Arc::new(HandleInner {
                id,
                peer: peer.clone(),
                outbound,
                closed,
            }),
        };

        let framed = Framed::new(stream, MrcpCodec::new(config.max_message_size));
        let (writer, reader) = framed.split();
        let span = info_span!("connection", id, peer = %peer);

        tokio::spawn(write_loop(writer, outbound_rx, handle.clone()).instrument(span.clone()));
        tokio::spawn(read_pump(reader, table, unrouted, handle.clone()).instrument(span));

        info!(id, peer = %peer, "connection opened");
        handle
    }
}

/// Resolves once the close flag is set, without holding on to the `watch::Ref`.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<MrcpMessage>,
    handle: ConnectionHandle,
) where
    W: futures::Sink<MrcpMessage, Error = MrcpError> + Unpin,
{
    let mut closed = handle.inner.closed.subscribe();
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                debug!(message = %message, "sending");
                if let Err(err) = writer.send(message).await {
                    warn!(error = %err, "write failed, closing connection");
                    handle.close();
                    break;
                }
            }
            () = wait_closed(&mut closed) => break,
        }
    }
    let _ = writer.close().await;
}

async fn read_pump<R>(
    mut reader: R,
    table: ChannelTable,
    unrouted: UnroutedHook,
    handle: ConnectionHandle,
) where
    R: futures::Stream<Item = Result<MrcpMessage, MrcpError>> + Unpin,
{
    let mut closed = handle.inner.closed.subscribe();
    let reason = loop {
        tokio::select! {
            next = reader.next() => match next {
                Some(Ok(message)) => route(message, &table, &unrouted, &handle),
                Some(Err(err)) => {
                    warn!(error = %err, "read failed, closing connection");
                    break err;
                }
                None => break MrcpError::connection_closed("peer closed the connection"),
            },
            () = wait_closed(&mut closed) => {
                break MrcpError::connection_closed("connection closed locally");
            }
        }
    };

    handle.close();
    info!(reason = %reason, "connection closed");
    for sink in table.snapshot() {
        sink.connection_closed(handle.id(), &reason);
    }
}

fn route(
    message: MrcpMessage,
    table: &ChannelTable,
    unrouted: &UnroutedHook,
    handle: &ConnectionHandle,
) {
    let channel = match message.channel_identifier() {
        Ok(channel) => channel,
        Err(err) => {
            let reason = if message.headers().contains(crate::header::CHANNEL_IDENTIFIER) {
                Unrouted::InvalidChannel(err)
            } else {
                Unrouted::MissingChannel
            };
            warn!(message = %message, reason = %reason, "cannot route message");
            unrouted(message, reason, handle);
            return;
        }
    };

    match table.get(channel.key()) {
        Some(sink) => {
            debug!(message = %message, channel = %channel, "routing");
            sink.deliver(message, handle);
        }
        None => {
            warn!(message = %message, channel = %channel, "message for unknown channel");
            unrouted(message, Unrouted::UnknownChannel(channel), handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::message::{MrcpRequest, MrcpResponse};
    use mrcp_core::{MethodName, RequestState, ResourceType, StatusCode};
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Debug)]
    enum Seen {
        Message(MrcpMessage),
        Closed(ErrorKind),
    }

    struct Recorder(mpsc::UnboundedSender<Seen>);

    impl ChannelSink for Recorder {
        fn deliver(&self, message: MrcpMessage, _connection: &ConnectionHandle) {
            let _ = self.0.send(Seen::Message(message));
        }

        fn connection_closed(&self, _connection_id: u64, reason: &MrcpError) {
            let _ = self.0.send(Seen::Closed(reason.kind()));
        }
    }

    fn channel(id: &str) -> ChannelIdentifier {
        ChannelIdentifier::new(id, ResourceType::SpeechSynth).unwrap()
    }

    struct Fixture {
        handle: ConnectionHandle,
        peer: Framed<tokio::io::DuplexStream, MrcpCodec>,
        seen: mpsc::UnboundedReceiver<Seen>,
        unrouted: mpsc::UnboundedReceiver<String>,
    }

    fn fixture() -> Fixture {
        let (local, remote) = tokio::io::duplex(64 * 1024);
        let (seen_tx, seen) = mpsc::unbounded_channel();
        let (unrouted_tx, unrouted) = mpsc::unbounded_channel();

        let table = ChannelTable::new();
        table.register(&channel("chan-1"), Arc::new(Recorder(seen_tx)));

        let hook: UnroutedHook = Arc::new(move |_message: MrcpMessage, reason: Unrouted, _handle: &ConnectionHandle| {
            let _ = unrouted_tx.send(reason.to_string());
        });
        let handle =
            MrcpConnection::spawn(local, "duplex", table, hook, &ConnectionConfig::default());
        Fixture {
            handle,
            peer: Framed::new(remote, MrcpCodec::default()),
            seen,
            unrouted,
        }
    }

    fn request(id: &str) -> MrcpMessage {
        MrcpRequest::new(MethodName::Speak, &channel(id)).into()
    }

    #[tokio::test]
    async fn delivers_to_registered_sink() {
        let mut fx = fixture();
        fx.peer.send(request("chan-1")).await.unwrap();

        let seen = timeout(Duration::from_secs(1), fx.seen.recv()).await.unwrap();
        assert!(matches!(seen, Some(Seen::Message(MrcpMessage::Request(_)))));
    }

    #[tokio::test]
    async fn unknown_and_missing_channels_go_to_hook() {
        let mut fx = fixture();
        fx.peer.send(request("other")).await.unwrap();
        let reason = timeout(Duration::from_secs(1), fx.unrouted.recv()).await.unwrap();
        assert_eq!(reason.as_deref(), Some("unknown channel other@speechsynth"));

        let mut bare = MrcpRequest::new(MethodName::Stop, &channel("x"));
        bare.headers_mut().remove("Channel-Identifier");
        fx.peer.send(MrcpMessage::from(bare)).await.unwrap();
        let reason = timeout(Duration::from_secs(1), fx.unrouted.recv()).await.unwrap();
        assert_eq!(reason.as_deref(), Some("missing Channel-Identifier"));

        assert!(!fx.handle.is_closed());
    }

    #[tokio::test]
    async fn send_reaches_peer() {
        let mut fx = fixture();
        let response =
            MrcpResponse::new(4, StatusCode::SUCCESS, RequestState::Complete, &channel("chan-1"));
        fx.handle.send(response.clone()).unwrap();

        let received = timeout(Duration::from_secs(1), fx.peer.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(received, MrcpMessage::Response(response));
    }

    #[tokio::test]
    async fn peer_eof_notifies_sinks() {
        let mut fx = fixture();
        drop(fx.peer);

        let seen = timeout(Duration::from_secs(1), fx.seen.recv()).await.unwrap();
        assert!(matches!(seen, Some(Seen::Closed(ErrorKind::ConnectionClosed))));
        timeout(Duration::from_secs(1), fx.handle.closed()).await.unwrap();

        let err = fx.handle.send(request("chan-1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
    }

    #[tokio::test]
    async fn framing_failure_closes_connection() {
        use tokio::io::AsyncWriteExt;

        let mut fx = fixture();
        fx.peer.get_mut().write_all(b"HTTP/1.1 200 OK\r\n\r\n").await.unwrap();

        let seen = timeout(Duration::from_secs(1), fx.seen.recv()).await.unwrap();
        assert!(matches!(seen, Some(Seen::Closed(ErrorKind::Framing))));
        assert!(fx.handle.is_closed());
    }

    #[tokio::test]
    async fn explicit_close() {
        let mut fx = fixture();
        fx.handle.close();

        let seen = timeout(Duration::from_secs(1), fx.seen.recv()).await.unwrap();
        assert!(matches!(seen, Some(Seen::Closed(ErrorKind::ConnectionClosed))));
        assert!(fx.handle.send(request("chan-1")).is_err());
    }

    #[test]
    fn table_keys_are_trimmed() {
        let table = ChannelTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        table.register(&channel("  padded  "), Arc::new(Recorder(tx)));
        assert!(table.contains("padded"));
        assert_eq!(table.len(), 1);
        assert!(table.unregister("padded").is_some());
        assert!(table.is_empty());
    }
}
