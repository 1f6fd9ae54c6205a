//! Canned handlers used by `mrcp serve` and by tests.

use mrcp_core::{EventName, MethodName, RequestState, ResourceType, StatusCode};
use mrcp_protocol::{CompletionCause, Content, HeaderValue, MrcpResponse, header};
use tracing::warn;

use crate::dispatcher::ResourceHandlers;
use crate::session::MrcpSession;

const NLSML_TYPE: &str = "application/nlsml+xml";

const NLSML_RESULT: &str = r#"<?xml version="1.0"?>
<result>
  <interpretation confidence="0.9">
    <instance>demo</instance>
    <input mode="speech">demo</input>
  </interpretation>
</result>
"#;

/// The event that completes `method`, for methods that finish
/// asynchronously.
pub fn completion_event(method: MethodName) -> Option<EventName> {
    match method {
        MethodName::Speak => Some(EventName::SpeakComplete),
        MethodName::Recognize => Some(EventName::RecognitionComplete),
        MethodName::Record => Some(EventName::RecordComplete),
        MethodName::Verify => Some(EventName::VerificationComplete),
        _ => None,
    }
}

/// Answers every method valid for `resource_type` with `200 COMPLETE`,
/// except the long-running ones, which answer `200 IN-PROGRESS` and send
/// their completion event right away. The session holds it back until the
/// response is on the wire.
pub fn demo_handlers(resource_type: ResourceType) -> ResourceHandlers {
    MethodName::all()
        .filter(|method| method.is_valid_for(resource_type))
        .fold(ResourceHandlers::new(resource_type), |handlers, method| {
            match completion_event(method) {
                Some(event) => handlers.on(method, move |_request, session: MrcpSession| {
                    complete_later(session, event)
                }),
                None => handlers.on(method, |_request, session: MrcpSession| async move {
                    session.create_response(StatusCode::SUCCESS, RequestState::Complete)
                }),
            }
        })
}

async fn complete_later(session: MrcpSession, event: EventName) -> MrcpResponse {
    let response = session.create_response(StatusCode::SUCCESS, RequestState::InProgress);

    tokio::spawn(async move {
        let mut complete = session.create_event(event, RequestState::Complete);
        match CompletionCause::new(0, "normal") {
            Ok(cause) => complete.set_typed_header(
                header::COMPLETION_CAUSE,
                HeaderValue::CompletionCause(cause),
            ),
            Err(err) => warn!(error = %err, "invalid completion cause"),
        }
        if event == EventName::RecognitionComplete {
            complete.set_content(Some(Content::new(NLSML_TYPE, NLSML_RESULT)));
        }

        if let Err(err) = session.send_event(complete) {
            warn!(error = %err, request_id = session.request_id(), "completion event not sent");
        }
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_valid_method() {
        for resource in ResourceType::all() {
            let handlers = demo_handlers(resource);
            for method in MethodName::all() {
                assert_eq!(
                    handlers.handles(method),
                    method.is_valid_for(resource),
                    "{method} on {resource}"
                );
            }
        }
    }

    #[test]
    fn long_running_methods_have_events() {
        assert_eq!(
            completion_event(MethodName::Recognize),
            Some(EventName::RecognitionComplete)
        );
        assert_eq!(completion_event(MethodName::Speak), Some(EventName::SpeakComplete));
        assert_eq!(completion_event(MethodName::SetParams), None);
    }
}
