//! Send command: one request, printed response and optional completion.

use std::time::Duration;

use tracing::debug;

use mrcp_core::{MethodName, RequestState};
use mrcp_protocol::{Content, MrcpMessage, MrcpRequest, encode_message};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::provider::MrcpProvider;

/// What to send, as given on the command line.
#[derive(Debug, Clone)]
pub struct SendArgs {
    pub server: Option<String>,
    pub channel: Option<String>,
    pub method: String,
    pub headers: Vec<String>,
    pub body: Option<String>,
    pub content_type: String,
    pub wait_complete: bool,
    pub timeout: Option<u64>,
}

pub async fn run(args: SendArgs, config: &ClientConfig) -> ClientResult<()> {
    let method: MethodName = args
        .method
        .parse()
        .map_err(|e| ClientError::Usage(format!("{e}")))?;
    let channel = args.channel.as_ref().or(config.channel.as_ref()).ok_or_else(|| {
        ClientError::Usage("no channel given; use --channel ID@TYPE or set `channel` in config.toml".into())
    })?;
    let address = args.server.as_deref().unwrap_or(&config.server.address);

    let mut provider_config = config.provider_config();
    if let Some(secs) = args.timeout {
        provider_config.request_timeout = Some(Duration::from_secs(secs));
    }

    let session = MrcpProvider::connect(address, &provider_config).await?;
    let channel = session.open_channel(channel)?;

    let mut request = channel.create_request(method);
    apply_headers(&mut request, &args.headers)?;
    if let Some(body) = args.body {
        request.set_content(Some(Content::new(args.content_type, body)));
    }

    let pending = channel.invoke(request)?;
    debug!(request_id = pending.request_id(), "waiting for response");

    let response = pending.response().await?;
    print_message(&MrcpMessage::from(response.clone()));
    let state = response.into_result()?.request_state();

    if args.wait_complete && state != RequestState::Complete {
        let done = pending.completion().await?;
        print_message(&done);
    }

    session.close();
    Ok(())
}

/// Adds `NAME:VALUE` headers, replacing any of the same name.
fn apply_headers(request: &mut MrcpRequest, headers: &[String]) -> ClientResult<()> {
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| ClientError::Usage(format!("header {header:?} is not NAME:VALUE")))?;
        request.set_header(name.trim(), value.trim());
    }
    Ok(())
}

fn print_message(message: &MrcpMessage) {
    print!("{}", String::from_utf8_lossy(&encode_message(message)));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrcp_core::ResourceType;
    use mrcp_protocol::ChannelIdentifier;

    fn request() -> MrcpRequest {
        let channel = ChannelIdentifier::new("abc", ResourceType::SpeechSynth).unwrap();
        MrcpRequest::new(MethodName::Speak, &channel)
    }

    #[test]
    fn headers_are_trimmed_and_replaced() {
        let mut request = request();
        apply_headers(
            &mut request,
            &["Voice-Age: 30".to_string(), "voice-age:40".to_string()],
        )
        .unwrap();
        assert_eq!(request.header("Voice-Age").unwrap().raw_value(), "40");
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let mut request = request();
        assert!(apply_headers(&mut request, &["no-colon".to_string()]).is_err());
        assert!(apply_headers(&mut request, &[":value".to_string()]).is_err());
    }
}
