//! Connects to an MRCPv2 server and opens channels on the connection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mrcp_protocol::{
    ChannelIdentifier, ChannelTable, ConnectionConfig, ConnectionHandle, DEFAULT_MAX_MESSAGE_SIZE,
    MrcpConnection, MrcpError, MrcpMessage, MrcpResult, Unrouted, UnroutedHook, header,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

use crate::channel::{ChannelState, MrcpChannel};
use crate::correlator::RequestCorrelator;

/// Settings for one client connection.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub connect_timeout: Duration,
    /// Applied to every wait on a response or completion. `None` waits
    /// forever.
    pub request_timeout: Option<Duration>,
    pub max_message_size: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Some(Duration::from_secs(30)),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

pub struct MrcpProvider;

impl MrcpProvider {
    /// Opens a control connection to `addr`.
    pub async fn connect<A>(addr: A, config: &ProviderConfig) -> MrcpResult<MrcpClientSession>
    where
        A: ToSocketAddrs + fmt::Debug,
    {
        let label = format!("{addr:?}");
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                MrcpError::timeout(format!(
                    "connecting to {label} timed out after {:?}",
                    config.connect_timeout
                ))
            })?
            .map_err(|e| {
                MrcpError::transport(format!("failed to connect to {label}")).with_source(e)
            })?;
        stream.set_nodelay(true)?;

        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or(label);
        Ok(MrcpClientSession::attach(stream, peer, config))
    }
}

/// A client connection and the channels opened on it.
pub struct MrcpClientSession {
    connection: ConnectionHandle,
    table: ChannelTable,
    correlator: Arc<RequestCorrelator>,
    request_timeout: Option<Duration>,
}

impl MrcpClientSession {
    /// Runs a session over an already connected stream.
    pub fn attach<S>(stream: S, peer: impl Into<String>, config: &ProviderConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let table = ChannelTable::new();
        let connection = MrcpConnection::spawn(
            stream,
            peer,
            table.clone(),
            log_unrouted(),
            &ConnectionConfig::default().with_max_message_size(config.max_message_size),
        );
        info!(connection = connection.id(), peer = connection.peer(), "session started");

        Self {
            connection,
            table,
            correlator: Arc::new(RequestCorrelator::new()),
            request_timeout: config.request_timeout,
        }
    }

    /// Opens a channel given as `<channel-id>@<resource-type>`.
    pub fn open_channel(&self, channel: &str) -> MrcpResult<MrcpChannel> {
        let id = ChannelIdentifier::parse(channel)
            .map_err(|err| MrcpError::header_value(header::CHANNEL_IDENTIFIER, channel, err))?;
        self.open(id)
    }

    pub fn open(&self, channel: ChannelIdentifier) -> MrcpResult<MrcpChannel> {
        if self.connection.is_closed() {
            return Err(MrcpError::connection_closed(format!(
                "cannot open {channel}: connection is closed"
            )));
        }
        if self.table.contains(channel.key()) {
            return Err(MrcpError::config(format!("channel {channel} is already open")));
        }

        let state = Arc::new(ChannelState::new(channel.clone(), Arc::clone(&self.correlator)));
        self.table.register(&channel, state.clone());
        debug!(channel = %channel, "channel opened");

        Ok(MrcpChannel::new(
            state,
            self.connection.clone(),
            self.table.clone(),
            self.request_timeout,
        ))
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn channel_count(&self) -> usize {
        self.table.len()
    }

    /// Outstanding requests across every channel.
    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Closes the connection. Outstanding requests fail with a
    /// connection-closed error.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Resolves once the connection has stopped, then fails anything a
    /// closed channel left behind.
    pub async fn closed(&self) {
        self.connection.closed().await;
        self.correlator
            .fail_all(&MrcpError::connection_closed("connection closed"));
    }
}

impl fmt::Debug for MrcpClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MrcpClientSession")
            .field("connection", &self.connection)
            .field("channels", &self.table.len())
            .field("correlator", &self.correlator)
            .finish()
    }
}

fn log_unrouted() -> UnroutedHook {
    Arc::new(|message: MrcpMessage, reason: Unrouted, connection: &ConnectionHandle| {
        warn!(
            connection = connection.id(),
            message = %message,
            reason = %reason,
            "dropping message for no open channel"
        );
    })
}
