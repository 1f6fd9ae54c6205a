//! Core MRCPv2 types: closed vocabularies, status codes, the exchange
//! primitive and logging setup.

pub mod event;
pub mod exchange;
pub mod method;
pub mod resource;
pub mod state;
pub mod status;
pub mod tracing;
mod vocabulary;

pub use event::EventName;
pub use exchange::Exchange;
pub use method::MethodName;
pub use resource::ResourceType;
pub use state::RequestState;
pub use status::StatusCode;
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use vocabulary::UnknownToken;
