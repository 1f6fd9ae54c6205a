//! MRCPv2 client: connections, channels and request correlation, plus the
//! `mrcp` command-line tool.
//!
//! # Example
//!
//! ```rust,no_run
//! use mrcp_core::MethodName;
//! use mrcp_client::{MrcpProvider, ProviderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = MrcpProvider::connect("127.0.0.1:1544", &ProviderConfig::default()).await?;
//!     let channel = session.open_channel("32AECB23433801@speechrecog")?;
//!
//!     let pending = channel.invoke(channel.create_request(MethodName::Recognize))?;
//!     let response = pending.response().await?;
//!     println!("{}", response.request_state());
//!     let result = pending.completion().await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod correlator;
pub mod error;
pub mod provider;

pub use channel::{EventListener, MrcpChannel, PendingRequest};
pub use cli::Cli;
pub use correlator::{RequestCorrelator, ResponseSlot};
pub use error::{ClientError, ClientResult};
pub use provider::{MrcpClientSession, MrcpProvider, ProviderConfig};
