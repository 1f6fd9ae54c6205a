//! Matches inbound responses and completion events to outstanding requests.
//!
//! Every request sent on a connection is registered under its
//! `(channel-id, request-id)` pair. The entry walks a small state machine:
//!
//! ```text
//! Sent --response COMPLETE--> done
//! Sent --response IN-PROGRESS/PENDING--> AwaitingEvent --event COMPLETE--> done
//! ```
//!
//! Whatever does not fit (no entry, waiter gone, out-of-order transition)
//! is handed back to the caller for the channel's event listener.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use mrcp_core::{Exchange, RequestState};
use mrcp_protocol::{MrcpError, MrcpMessage};
use tracing::{debug, warn};

/// Where the correlator delivers the response and completion of one request.
pub type ResponseSlot = Exchange<MrcpMessage, MrcpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Sent,
    AwaitingEvent,
}

struct Entry {
    slot: Weak<ResponseSlot>,
    state: EntryState,
}

type Key = (String, u64);

/// Outstanding requests for one connection.
#[derive(Default)]
pub struct RequestCorrelator {
    entries: Mutex<HashMap<Key, Entry>>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a request about to be sent. The caller keeps the returned
    /// slot alive for as long as it wants the outcome.
    pub fn register(&self, channel_id: &str, request_id: u64) -> Arc<ResponseSlot> {
        let slot = Arc::new(ResponseSlot::new());
        let previous = self.lock().insert(
            (channel_id.trim().to_string(), request_id),
            Entry {
                slot: Arc::downgrade(&slot),
                state: EntryState::Sent,
            },
        );
        if previous.is_some() {
            warn!(channel = channel_id, request_id, "request-id registered twice");
        }
        slot
    }

    /// Drops an entry without completing it, e.g. when the send failed.
    pub fn forget(&self, channel_id: &str, request_id: u64) {
        self.lock().remove(&(channel_id.trim().to_string(), request_id));
    }

    /// Delivers `message` to its waiter, or returns it when nobody is
    /// waiting for it.
    pub fn handle(&self, message: MrcpMessage) -> Option<MrcpMessage> {
        let channel = match message.channel_identifier() {
            Ok(channel) => channel,
            Err(_) => return Some(message),
        };
        let key = (channel.key().to_string(), message.request_id());

        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(&key) else {
            debug!(message = %message, "no outstanding request");
            return Some(message);
        };

        let Some(slot) = entry.slot.upgrade() else {
            debug!(message = %message, "waiter went away");
            entries.remove(&key);
            return Some(message);
        };

        let done = match (&message, entry.state) {
            (MrcpMessage::Response(response), EntryState::Sent) => {
                match response.request_state() {
                    RequestState::Complete => true,
                    RequestState::InProgress | RequestState::Pending => {
                        entry.state = EntryState::AwaitingEvent;
                        false
                    }
                }
            }
            (MrcpMessage::Event(event), EntryState::AwaitingEvent) => {
                if event.request_state() != RequestState::Complete {
                    return Some(message);
                }
                true
            }
            (MrcpMessage::Event(event), EntryState::Sent)
                if event.request_state() != RequestState::Complete =>
            {
                return Some(message);
            }
            (_, state) => {
                warn!(
                    message = %message,
                    state = ?state,
                    "message does not fit the request's state"
                );
                return Some(message);
            }
        };

        if done {
            entries.remove(&key);
        }
        drop(entries);

        slot.put(message);
        None
    }

    /// Fails every outstanding request on one channel.
    pub fn fail_channel(&self, channel_id: &str, reason: &MrcpError) {
        let channel_id = channel_id.trim();
        let failed: Vec<Entry> = {
            let mut entries = self.lock();
            let keys: Vec<Key> = entries
                .keys()
                .filter(|(channel, _)| channel == channel_id)
                .cloned()
                .collect();
            keys.iter().filter_map(|key| entries.remove(key)).collect()
        };
        fail_entries(failed, reason);
    }

    /// Fails every outstanding request.
    pub fn fail_all(&self, reason: &MrcpError) {
        let failed: Vec<Entry> = self.lock().drain().map(|(_, entry)| entry).collect();
        fail_entries(failed, reason);
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Outstanding requests on one channel.
    pub fn pending_on(&self, channel_id: &str) -> usize {
        let channel_id = channel_id.trim();
        self.lock()
            .keys()
            .filter(|(channel, _)| channel == channel_id)
            .count()
    }
}

fn fail_entries(entries: Vec<Entry>, reason: &MrcpError) {
    for entry in entries {
        if let Some(slot) = entry.slot.upgrade() {
            slot.put_failure(MrcpError::connection_closed(reason.to_string()));
        }
    }
}

impl std::fmt::Debug for RequestCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrcp_core::{EventName, ResourceType, StatusCode};
    use mrcp_protocol::{ChannelIdentifier, ErrorKind, MrcpEvent, MrcpResponse};

    fn channel() -> ChannelIdentifier {
        ChannelIdentifier::new("32AECB23433801", ResourceType::SpeechRecog).unwrap()
    }

    fn response(id: u64, state: RequestState) -> MrcpMessage {
        MrcpResponse::new(id, StatusCode::SUCCESS, state, &channel()).into()
    }

    fn event(id: u64, state: RequestState) -> MrcpMessage {
        MrcpEvent::new(EventName::RecognitionComplete, id, state, &channel()).into()
    }

    #[test]
    fn complete_response_finishes_request() {
        let correlator = RequestCorrelator::new();
        let slot = correlator.register(channel().key(), 1);

        assert!(correlator.handle(response(1, RequestState::Complete)).is_none());
        assert_eq!(correlator.pending_count(), 0);
        assert_eq!(slot.try_take().unwrap().unwrap().request_id(), 1);
    }

    #[test]
    fn in_progress_waits_for_complete_event() {
        let correlator = RequestCorrelator::new();
        let slot = correlator.register(channel().key(), 7);

        assert!(correlator.handle(response(7, RequestState::InProgress)).is_none());
        assert_eq!(correlator.pending_count(), 1);

        // intermediate events belong to the listener
        let intermediate = event(7, RequestState::InProgress);
        assert_eq!(correlator.handle(intermediate.clone()), Some(intermediate));

        assert!(correlator.handle(event(7, RequestState::Complete)).is_none());
        assert_eq!(correlator.pending_count(), 0);

        let first = slot.try_take().unwrap().unwrap();
        let second = slot.try_take().unwrap().unwrap();
        assert!(matches!(first, MrcpMessage::Response(_)));
        assert!(matches!(second, MrcpMessage::Event(_)));
    }

    #[test]
    fn pending_response_is_treated_as_in_progress() {
        let correlator = RequestCorrelator::new();
        let _slot = correlator.register(channel().key(), 3);

        assert!(correlator.handle(response(3, RequestState::Pending)).is_none());
        assert!(correlator.handle(event(3, RequestState::Complete)).is_none());
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn unmatched_messages_are_returned() {
        let correlator = RequestCorrelator::new();
        let stray = event(99, RequestState::Complete);
        assert_eq!(correlator.handle(stray.clone()), Some(stray));
    }

    #[test]
    fn illegal_transitions_are_returned() {
        let correlator = RequestCorrelator::new();
        let slot = correlator.register(channel().key(), 4);

        // completion before any response
        let early = event(4, RequestState::Complete);
        assert_eq!(correlator.handle(early.clone()), Some(early));

        assert!(correlator.handle(response(4, RequestState::InProgress)).is_none());

        // second response
        let again = response(4, RequestState::Complete);
        assert_eq!(correlator.handle(again.clone()), Some(again));

        assert_eq!(slot.len(), 1);
        assert_eq!(correlator.pending_count(), 1);
    }

    #[test]
    fn dropped_waiter_hands_message_back() {
        let correlator = RequestCorrelator::new();
        drop(correlator.register(channel().key(), 5));

        let late = response(5, RequestState::Complete);
        assert_eq!(correlator.handle(late.clone()), Some(late));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn fail_channel_only_touches_that_channel() {
        let correlator = RequestCorrelator::new();
        let mine = correlator.register("a", 1);
        let other = correlator.register("b", 1);

        correlator.fail_channel("a", &MrcpError::connection_closed("channel closed"));

        let err = mine.try_take().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
        assert!(other.is_empty());
        assert_eq!(correlator.pending_on("a"), 0);
        assert_eq!(correlator.pending_on("b"), 1);

        correlator.fail_all(&MrcpError::transport("reset"));
        assert_eq!(other.try_take().unwrap().unwrap_err().kind(), ErrorKind::ConnectionClosed);
        assert_eq!(correlator.pending_count(), 0);
    }
}
