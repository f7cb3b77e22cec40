//! Asterisk Manager Interface connector
//!
//! Owns the TCP session to the switch, decodes the `Key: Value` wire format,
//! and turns terminating call events into `CallRecord`s:
//!
//! - [`AmiCodec`]: framed decoder/encoder for AMI messages and actions
//! - [`AmiConnection`]: dial, banner and login handshake
//! - [`AmiConnector`]: supervised connect-listen-reconnect loop
//! - [`translate`]: pure event to call record translation
//! - [`CallRecordHandler`]: sink-backed event handler

pub mod channel;
pub mod client;
pub mod codec;
pub mod connection;
pub mod event;
pub mod event_handler;
pub mod translator;

pub use client::{AmiConnector, ConnectorState};
pub use codec::{AmiAction, AmiCodec, AmiFrame};
pub use connection::AmiConnection;
pub use event::AmiEvent;
pub use event_handler::{CallRecordHandler, EventHandler};
pub use translator::translate;

use std::time::Duration;

/// Bound on the TCP dial plus banner read
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on waiting for the login response
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed wait between a failed session and the next attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Bound on the best-effort logoff during shutdown
pub const LOGOFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Largest single message the decoder accepts
pub const MAX_MESSAGE_LEN: usize = 64 * 1024;

/// Depth of the reader task's event queue
pub const EVENT_QUEUE_DEPTH: usize = 1024;

/// Event names the engine cares about
pub mod events {
    pub const HANGUP: &str = "Hangup";
    pub const FULLY_BOOTED: &str = "FullyBooted";
}
