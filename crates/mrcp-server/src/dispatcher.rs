//! Routes inbound requests on a server channel to resource handlers.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use mrcp_core::{MethodName, RequestState, ResourceType, StatusCode};
use mrcp_protocol::{
    ChannelIdentifier, ChannelSink, ConnectionHandle, Headers, MrcpError, MrcpMessage,
    MrcpRequest, MrcpResponse, Unrouted, UnroutedHook, header,
};
use tracing::{debug, warn};

use crate::session::MrcpSession;

/// Future produced by a request handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = MrcpResponse> + Send>>;

/// Handles one method. Runs on its own task, never on the connection pump.
pub type RequestHandler = Arc<dyn Fn(MrcpRequest, MrcpSession) -> HandlerFuture + Send + Sync>;

/// The methods a server channel answers, for one resource type.
///
/// Methods not registered here, or not valid for the resource type, are
/// answered with `401` by the dispatcher.
#[derive(Clone)]
pub struct ResourceHandlers {
    resource_type: ResourceType,
    handlers: HashMap<MethodName, RequestHandler>,
}

impl ResourceHandlers {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `method`, replacing any previous one.
    #[must_use]
    pub fn on<F, Fut>(mut self, method: MethodName, handler: F) -> Self
    where
        F: Fn(MrcpRequest, MrcpSession) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MrcpResponse> + Send + 'static,
    {
        let handler: RequestHandler =
            Arc::new(move |request: MrcpRequest, session: MrcpSession| -> HandlerFuture {
                Box::pin(handler(request, session))
            });
        self.handlers.insert(method, handler);
        self
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn handles(&self, method: MethodName) -> bool {
        method.is_valid_for(self.resource_type) && self.handlers.contains_key(&method)
    }

    fn get(&self, method: MethodName) -> Option<RequestHandler> {
        if !method.is_valid_for(self.resource_type) {
            return None;
        }
        self.handlers.get(&method).cloned()
    }
}

impl fmt::Debug for ResourceHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.handlers.keys().collect();
        methods.sort();
        f.debug_struct("ResourceHandlers")
            .field("resource_type", &self.resource_type)
            .field("methods", &methods)
            .finish()
    }
}

/// A pre-agreed server channel, shared by every connection.
pub(crate) struct ServerChannel {
    channel: ChannelIdentifier,
    handlers: ResourceHandlers,
    /// Last request-id seen, per connection.
    last_request_ids: Mutex<HashMap<u64, u64>>,
}

impl ServerChannel {
    pub(crate) fn new(channel: ChannelIdentifier, handlers: ResourceHandlers) -> Self {
        Self {
            channel,
            handlers,
            last_request_ids: Mutex::new(HashMap::new()),
        }
    }

    /// Records `request_id` unless it does not exceed the last one seen on
    /// this connection.
    fn advance(&self, connection_id: u64, request_id: u64) -> bool {
        let mut ids = self
            .last_request_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match ids.get(&connection_id) {
            Some(last) if request_id <= *last => false,
            _ => {
                ids.insert(connection_id, request_id);
                true
            }
        }
    }

    fn reply(&self, connection: &ConnectionHandle, request_id: u64, status: StatusCode) {
        let response = MrcpResponse::new(request_id, status, RequestState::Complete, &self.channel);
        if let Err(err) = connection.send(response) {
            warn!(error = %err, request_id, %status, "failed to send error response");
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(channel = %self.channel, method = %request.method(), request_id = request.request_id())
    )]
    fn dispatch(&self, request: MrcpRequest, connection: &ConnectionHandle) {
        let request_id = request.request_id();

        if !self.advance(connection.id(), request_id) {
            warn!("request-id is not increasing");
            self.reply(connection, request_id, StatusCode::NON_MONOTONIC_SEQUENCE_NUMBER);
            return;
        }

        match request.channel_identifier() {
            Ok(channel) if channel.resource_type() == self.channel.resource_type() => {}
            _ => {
                warn!("resource type does not match the channel");
                self.reply(connection, request_id, StatusCode::RESOURCE_NOT_ALLOCATED);
                return;
            }
        }

        let Some(handler) = self.handlers.get(request.method()) else {
            debug!("method not handled on this channel");
            self.reply(connection, request_id, StatusCode::METHOD_NOT_ALLOWED);
            return;
        };

        let session = MrcpSession::new(self.channel.clone(), request_id, connection.clone());
        let channel = self.channel.clone();
        let connection = connection.clone();
        tokio::spawn(async move {
            let events = session.clone();
            let outcome = tokio::spawn(async move { handler(request, session).await }).await;
            let mut response = match outcome {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, request_id, "handler failed");
                    MrcpResponse::new(
                        request_id,
                        StatusCode::SERVER_INTERNAL_ERROR,
                        RequestState::Complete,
                        &channel,
                    )
                }
            };
            response.set_request_id(request_id);
            response.set_typed_header(
                header::CHANNEL_IDENTIFIER,
                mrcp_protocol::HeaderValue::ChannelIdentifier(channel),
            );
            debug!(
                request_id,
                status = %response.status_code(),
                state = %response.request_state(),
                "handler finished"
            );
            if let Err(err) = connection.send(response) {
                warn!(error = %err, request_id, "failed to send response");
            }
            events.release_events();
        });
    }
}

impl ChannelSink for ServerChannel {
    fn deliver(&self, message: MrcpMessage, connection: &ConnectionHandle) {
        match message {
            MrcpMessage::Request(request) => self.dispatch(request, connection),
            other => debug!(channel = %self.channel, message = %other, "ignoring non-request"),
        }
    }

    fn connection_closed(&self, connection_id: u64, reason: &MrcpError) {
        debug!(channel = %self.channel, connection_id, reason = %reason, "connection gone");
        self.last_request_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&connection_id);
    }
}

/// Answers requests the connection could not route to a channel.
pub(crate) fn unrouted_hook() -> UnroutedHook {
    Arc::new(|message: MrcpMessage, reason: Unrouted, connection: &ConnectionHandle| {
        let request = match message {
            MrcpMessage::Request(request) => request,
            other => {
                debug!(message = %other, reason = %reason, "dropping unroutable message");
                return;
            }
        };

        let mut headers = Headers::new();
        let status = match &reason {
            Unrouted::MissingChannel => StatusCode::MANDATORY_HEADER_MISSING,
            Unrouted::InvalidChannel(_) => {
                if let Some(raw) = request.header(header::CHANNEL_IDENTIFIER) {
                    headers.push(raw.clone());
                }
                StatusCode::ILLEGAL_VALUE_FOR_HEADER
            }
            Unrouted::UnknownChannel(channel) => {
                headers.push(mrcp_protocol::Header::typed(
                    header::CHANNEL_IDENTIFIER,
                    mrcp_protocol::HeaderValue::ChannelIdentifier(channel.clone()),
                ));
                StatusCode::RESOURCE_NOT_ALLOCATED
            }
        };

        let response = MrcpResponse::from_parts(
            request.request_id(),
            status,
            RequestState::Complete,
            headers,
            None,
        );
        if let Err(err) = connection.send(response) {
            warn!(error = %err, "failed to reject unroutable request");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_only_valid_registered_methods() {
        let handlers = ResourceHandlers::new(ResourceType::SpeechSynth)
            .on(MethodName::Speak, |_req, session: MrcpSession| async move {
                session.create_response(StatusCode::SUCCESS, RequestState::Complete)
            })
            .on(MethodName::Recognize, |_req, session: MrcpSession| async move {
                session.create_response(StatusCode::SUCCESS, RequestState::Complete)
            });

        assert!(handlers.handles(MethodName::Speak));
        assert!(!handlers.handles(MethodName::Stop));
        assert!(!handlers.handles(MethodName::Recognize));
        assert_eq!(handlers.resource_type(), ResourceType::SpeechSynth);
    }

    #[test]
    fn request_ids_must_increase_per_connection() {
        let channel = ChannelIdentifier::new("abc", ResourceType::Recorder).unwrap();
        let server_channel =
            ServerChannel::new(channel, ResourceHandlers::new(ResourceType::Recorder));

        assert!(server_channel.advance(1, 5));
        assert!(server_channel.advance(1, 6));
        assert!(!server_channel.advance(1, 6));
        assert!(!server_channel.advance(1, 2));
        // another connection has its own sequence
        assert!(server_channel.advance(2, 1));

        server_channel.connection_closed(1, &MrcpError::connection_closed("gone"));
        assert!(server_channel.advance(1, 1));
    }
}
