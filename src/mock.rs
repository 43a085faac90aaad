//! Fake bus and delay implementations for driver tests

extern crate std;
use std::collections::{BTreeMap, VecDeque};
use std::vec;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayMs;

use crate::base::crc8;
use crate::bus::{Bus, Status};

/// Delay that records requested durations instead of sleeping
#[derive(Default, Debug)]
pub struct CountingDelay {
    pub calls: u32,
    pub total_ms: u32,
}

impl DelayMs<u16> for CountingDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.calls += 1;
        self.total_ms += ms as u32;
    }
}

/// Bus returning pre-programmed statuses
///
/// `issue` is consumed by each write/read, `poll` by each status call. Once a
/// queue is empty the matching default is returned.
pub struct ScriptedBus {
    pub issue: VecDeque<Status>,
    pub poll: VecDeque<Status>,
    pub issue_default: Status,
    pub poll_default: Status,
    pub response: Vec<u8>,
    pub writes: usize,
    pub reads: usize,
    pub polls: usize,
}

impl ScriptedBus {
    pub fn new(issue: &[Status], poll: &[Status]) -> Self {
        ScriptedBus {
            issue: issue.iter().cloned().collect(),
            poll: poll.iter().cloned().collect(),
            issue_default: Status::Complete,
            poll_default: Status::Complete,
            response: Vec::new(),
            writes: 0,
            reads: 0,
            polls: 0,
        }
    }

    fn fill(&self, data: &mut [u8]) {
        for (d, r) in data.iter_mut().zip(self.response.iter()) {
            *d = *r;
        }
    }
}

impl Bus for ScriptedBus {
    fn write(&mut self, _addr: u8, _data: &[u8]) -> Status {
        self.writes += 1;
        self.issue.pop_front().unwrap_or(self.issue_default)
    }

    fn read(&mut self, _addr: u8, data: &mut [u8]) -> Status {
        self.reads += 1;
        self.fill(data);
        self.issue.pop_front().unwrap_or(self.issue_default)
    }

    fn status(&mut self, data: &mut [u8]) -> Status {
        self.polls += 1;
        self.fill(data);
        self.poll.pop_front().unwrap_or(self.poll_default)
    }
}

/// Register loopback emulating the device word protocol
///
/// Word writes store `[msb, lsb, crc]` against the command, a command-only
/// write selects the register returned by the following read.
#[derive(Default)]
pub struct LoopbackBus {
    pub registers: BTreeMap<u16, Vec<u8>>,
    pub frames: Vec<Vec<u8>>,
    pub selected: u16,
    /// Flip all bits of this response byte on the next read
    pub corrupt: Option<usize>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a register with a checksummed word
    pub fn set_word(&mut self, command: u16, value: u16) {
        let b = value.to_be_bytes();
        self.registers.insert(command, vec![b[0], b[1], crc8(&b)]);
    }

    /// Preload a register with an arbitrary response
    pub fn set_response(&mut self, command: u16, response: &[u8]) {
        self.registers.insert(command, response.to_vec());
    }
}

impl Bus for LoopbackBus {
    fn write(&mut self, _addr: u8, data: &[u8]) -> Status {
        self.frames.push(data.to_vec());

        let command = u16::from_be_bytes([data[0], data[1]]);
        self.selected = command;
        if data.len() == 5 {
            self.registers.insert(command, data[2..5].to_vec());
        }

        Status::Complete
    }

    fn read(&mut self, _addr: u8, data: &mut [u8]) -> Status {
        let resp = self.registers.get(&self.selected).cloned().unwrap_or_default();
        for (d, r) in data.iter_mut().zip(resp.iter()) {
            *d = *r;
        }

        if let Some(i) = self.corrupt.take() {
            data[i] ^= 0xFF;
        }

        Status::Complete
    }

    fn status(&mut self, _data: &mut [u8]) -> Status {
        Status::Complete
    }
}
