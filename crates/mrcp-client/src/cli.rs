//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// mrcp - MRCPv2 client and demo server
#[derive(Debug, Parser)]
#[command(name = "mrcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MRCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log every message sent and received
    #[arg(long)]
    pub wire: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a demo server answering every method on the given channels
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:1544")]
        bind: SocketAddr,

        /// Channel to serve, as ID@TYPE (can be repeated)
        #[arg(long = "channel", required = true, action = clap::ArgAction::Append)]
        channels: Vec<String>,

        /// Maximum concurrent connections
        #[arg(long, default_value = "100")]
        max_connections: usize,
    },

    /// Send one request and print the response
    Send {
        /// Server address (host:port)
        #[arg(long, env = "MRCP_SERVER")]
        server: Option<String>,

        /// Channel to use, as ID@TYPE
        #[arg(long)]
        channel: Option<String>,

        /// Method name, e.g. SET-PARAMS or RECOGNIZE
        method: String,

        /// Header to add, as NAME:VALUE (can be repeated)
        #[arg(long = "header", short = 'H', action = clap::ArgAction::Append)]
        headers: Vec<String>,

        /// Message body
        #[arg(long)]
        body: Option<String>,

        /// Content-Type of the body
        #[arg(long, default_value = "text/plain")]
        content_type: String,

        /// Also wait for the completion event of an IN-PROGRESS request
        #[arg(long)]
        wait_complete: bool,

        /// Seconds to wait for the response (overrides the config file)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send() {
        let cli = Cli::try_parse_from([
            "mrcp",
            "send",
            "--channel",
            "abc@speechsynth",
            "-H",
            "Voice-Age:30",
            "--header",
            "Prosody-Rate:fast",
            "--wait-complete",
            "SPEAK",
        ])
        .unwrap();

        let Command::Send {
            channel,
            method,
            headers,
            wait_complete,
            ..
        } = cli.command
        else {
            panic!("expected send");
        };
        assert_eq!(channel.as_deref(), Some("abc@speechsynth"));
        assert_eq!(method, "SPEAK");
        assert_eq!(headers, ["Voice-Age:30", "Prosody-Rate:fast"]);
        assert!(wait_complete);
    }

    #[test]
    fn serve_needs_a_channel() {
        assert!(Cli::try_parse_from(["mrcp", "serve"]).is_err());

        let cli = Cli::try_parse_from([
            "mrcp",
            "serve",
            "--channel",
            "a@speechrecog",
            "--channel",
            "b@speechsynth",
        ])
        .unwrap();
        let Command::Serve { bind, channels, .. } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(bind.port(), 1544);
        assert_eq!(channels.len(), 2);
    }
}
