//! Line assembler splitting the host byte stream into command lines
//!
//! Copyright 2019 Ryan Kurte

use heapless::Vec;

/// Receive buffer length, one byte is reserved for the terminator
/// and one for the overflow marker so lines hold at most `MAX_LINE_LEN` bytes
pub const RX_BUFF_LEN: usize = 256;
pub const MAX_LINE_LEN: usize = RX_BUFF_LEN - 2;

/// Returned when a line exceeded `MAX_LINE_LEN` and was discarded
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Dropped;

/// Accumulates bytes into lines terminated by NUL, CR or LF
#[derive(Default)]
pub struct LineAssembler {
    buff: Vec<u8, RX_BUFF_LEN>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently held for the incomplete line
    pub fn pending(&self) -> &[u8] {
        &self.buff
    }

    /// Feed one byte, calling `dispatch` with the completed line on a terminator
    ///
    /// Empty lines are dispatched too, the interpreter ignores them.
    /// On overflow the partial line is discarded and accumulation restarts
    /// with the next byte.
    pub fn feed<F>(&mut self, byte: u8, dispatch: F) -> Result<(), Dropped>
    where
        F: FnOnce(&mut [u8]),
    {
        match byte {
            0x00 | b'\n' | b'\r' => {
                dispatch(&mut self.buff[..]);
                self.buff.clear();
            }
            _ => {
                if self.buff.len() >= MAX_LINE_LEN || self.buff.push(byte).is_err() {
                    self.buff.clear();
                    return Err(Dropped);
                }
            }
        }

        Ok(())
    }

    /// Feed a chunk of bytes, returning the number of lines dropped on overflow
    pub fn feed_all<F>(&mut self, data: &[u8], mut dispatch: F) -> usize
    where
        F: FnMut(&mut [u8]),
    {
        let mut dropped = 0;

        for b in data {
            if self.feed(*b, &mut dispatch).is_err() {
                warn!("Line overflow, dropping input");
                dropped += 1;
            }
        }

        dropped
    }
}
