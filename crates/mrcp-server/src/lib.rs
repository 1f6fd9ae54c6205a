//! MRCPv2 server.
//!
//! The server listens on TCP, serves pre-agreed channels and hands each
//! inbound request to the handler registered for its method:
//! - request-ids must increase per connection and channel (`410` otherwise)
//! - methods without a handler, or invalid for the resource, get `401`
//! - requests for unknown channels get `405`
//!
//! # Example
//!
//! ```rust,no_run
//! use mrcp_core::{MethodName, RequestState, ResourceType, StatusCode};
//! use mrcp_server::{MrcpServer, ResourceHandlers, ServerConfig, ShutdownHandle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = MrcpServer::bind(ServerConfig::default()).await?;
//!     let handlers = ResourceHandlers::new(ResourceType::SpeechSynth).on(
//!         MethodName::SetParams,
//!         |_request, session| async move {
//!             session.create_response(StatusCode::SUCCESS, RequestState::Complete)
//!         },
//!     );
//!     server.open_channel("32AECB23433801@speechsynth", handlers)?;
//!
//!     let shutdown = ShutdownHandle::new();
//!     shutdown.listen_for_signals();
//!     server.run_until_shutdown(shutdown.wait()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod demo;
mod dispatcher;
mod error;
mod session;
mod signals;
mod socket;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use demo::{completion_event, demo_handlers};
pub use dispatcher::{HandlerFuture, RequestHandler, ResourceHandlers};
pub use error::{ServerError, ServerResult};
pub use session::MrcpSession;
pub use signals::ShutdownHandle;
pub use socket::MrcpServer;
