//! Bounded response buffer for replies queued to the host
//!
//! Copyright 2019 Ryan Kurte

use core::fmt::{self, Write};

use heapless::{String, Vec};

/// Response buffer capacity in bytes
pub const TX_BUFF_LEN: usize = 1024;

/// Maximum length of a single formatted reply
pub const MSG_BUFF_LEN: usize = 128;

/// Returned when a write would not fit, the write is dropped in full
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Overflow;

/// Output buffer accumulating reply text until flushed to the host
///
/// Writes are all-or-nothing: a write that would fill the buffer is dropped
/// and reported as `Overflow`, the existing content is left intact.
#[derive(Default)]
pub struct Response {
    buff: Vec<u8, TX_BUFF_LEN>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes
    pub fn push(&mut self, data: &[u8]) -> Result<(), Overflow> {
        // One byte is always kept free, matching the firmware's transmit buffer
        if self.buff.len() + data.len() >= TX_BUFF_LEN {
            warn!("Response buffer full, dropping {} bytes", data.len());
            return Err(Overflow);
        }

        self.buff.extend_from_slice(data).map_err(|_| Overflow)
    }

    pub fn push_str(&mut self, s: &str) -> Result<(), Overflow> {
        self.push(s.as_bytes())
    }

    /// Format a reply and append it as a single write
    pub fn push_fmt(&mut self, args: fmt::Arguments) -> Result<(), Overflow> {
        let mut msg: String<MSG_BUFF_LEN> = String::new();
        if msg.write_fmt(args).is_err() {
            warn!("Response exceeds {} bytes, dropping", MSG_BUFF_LEN);
            return Err(Overflow);
        }

        self.push(msg.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buff
    }

    pub fn len(&self) -> usize {
        self.buff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buff.is_empty()
    }

    pub fn clear(&mut self) {
        self.buff.clear();
    }
}
