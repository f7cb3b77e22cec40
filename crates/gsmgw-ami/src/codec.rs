//! AMI wire codec
//!
//! The session opens with a single banner line (`Asterisk Call Manager/x.y`),
//! after which every message is a run of `Key: Value` lines ended by a blank
//! line. Lines end in CRLF; bare LF is tolerated.

use crate::event::AmiEvent;
use crate::MAX_MESSAGE_LEN;
use bytes::{Buf, BufMut, BytesMut};
use gsmgw_core::AppError;
use tokio_util::codec::{Decoder, Encoder};

/// One decoded unit of the inbound stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmiFrame {
    /// Greeting line, only ever first
    Banner(String),
    /// Asynchronous event (`Event:` present)
    Event(AmiEvent),
    /// Reply to an action we sent
    Response(AmiEvent),
}

/// Outbound manager action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmiAction {
    name: String,
    fields: Vec<(String, String)>,
}

impl AmiAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn login(username: &str, secret: &str, action_id: &str) -> Self {
        Self::new("Login")
            .field("ActionID", action_id)
            .field("Username", username)
            .field("Secret", secret)
            .field("Events", "on")
    }

    pub fn logoff(action_id: &str) -> Self {
        Self::new("Logoff").field("ActionID", action_id)
    }
}

#[derive(Debug)]
pub struct AmiCodec {
    awaiting_banner: bool,
    max_len: usize,
}

impl AmiCodec {
    pub fn new() -> Self {
        Self {
            awaiting_banner: true,
            max_len: MAX_MESSAGE_LEN,
        }
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            awaiting_banner: true,
            max_len,
        }
    }

    fn too_long(&self, len: usize) -> AppError {
        AppError::AmiProtocol(format!(
            "message of {} bytes exceeds limit of {} bytes",
            len, self.max_len
        ))
    }
}

impl Default for AmiCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AmiCodec {
    type Item = AmiFrame;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.awaiting_banner {
            let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    return Err(self.too_long(src.len()));
                }
                return Ok(None);
            };

            let line = src.split_to(newline + 1);
            self.awaiting_banner = false;
            let banner = String::from_utf8_lossy(&line).trim().to_string();
            return Ok(Some(AmiFrame::Banner(banner)));
        }

        // Stray blank lines between messages
        loop {
            if src.starts_with(b"\r\n") {
                src.advance(2);
            } else if src.starts_with(b"\n") {
                src.advance(1);
            } else {
                break;
            }
        }

        let mut line_start = 0;
        loop {
            let Some(offset) = src[line_start..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    return Err(self.too_long(src.len()));
                }
                return Ok(None);
            };

            let newline = line_start + offset;
            let line = &src[line_start..newline];
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if line.is_empty() {
                if newline + 1 > self.max_len {
                    return Err(self.too_long(newline + 1));
                }
                let block = src.split_to(newline + 1);
                let event = AmiEvent::parse(&String::from_utf8_lossy(&block));
                let frame = if event.event_name().is_some() {
                    AmiFrame::Event(event)
                } else {
                    AmiFrame::Response(event)
                };
                return Ok(Some(frame));
            }

            line_start = newline + 1;
        }
    }
}

impl Encoder<AmiAction> for AmiCodec {
    type Error = AppError;

    fn encode(&mut self, action: AmiAction, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut put_line = |key: &str, value: &str| {
            dst.reserve(key.len() + value.len() + 4);
            dst.put_slice(key.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        };

        put_line("Action", &action.name);
        for (key, value) in &action.fields {
            put_line(key, value);
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
