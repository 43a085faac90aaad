//! Host link over standard input / output
//!
//! Input is read on a background thread so the control loop never blocks.
//! End of input only stops command reception, replies and measurement
//! reports keep flowing to the output.
//!
//! Copyright 2019 Ryan Kurte

use std::io::{self, Read, Stdout, Write};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::vec::Vec;

use crate::monitor::{Host, RX_CHUNK_LEN};

pub struct StdioHost<W> {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    input_open: bool,
    out: W,
}

impl StdioHost<Stdout> {
    /// Connect to the process stdin / stdout
    pub fn new() -> Self {
        let (tx, rx) = channel();

        std::thread::spawn(move || {
            let mut stdin = io::stdin();
            let mut buff = [0u8; RX_CHUNK_LEN];

            loop {
                match stdin.read(&mut buff) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buff[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error reading stdin: {:?}", e);
                        break;
                    }
                }
            }
        });

        Self::with_channel(rx, io::stdout())
    }
}

impl<W: Write> StdioHost<W> {
    /// Build a host from an input chunk channel and an output writer
    pub fn with_channel(rx: Receiver<Vec<u8>>, out: W) -> Self {
        StdioHost { rx, pending: Vec::new(), input_open: true, out }
    }

    /// Input side still connected
    pub fn input_open(&self) -> bool {
        self.input_open
    }

    pub fn free(self) -> W {
        self.out
    }
}

impl<W: Write> Host for StdioHost<W> {
    fn is_ready(&mut self) -> bool {
        true
    }

    fn receive(&mut self, data: &mut [u8]) -> usize {
        while self.input_open && self.pending.len() < data.len() {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Host input closed");
                    self.input_open = false;
                }
            }
        }

        let n = data.len().min(self.pending.len());
        data[..n].copy_from_slice(&self.pending[..n]);
        self.pending = self.pending.split_off(n);

        n
    }

    fn can_send(&mut self) -> bool {
        true
    }

    fn send(&mut self, data: &[u8]) {
        if let Err(e) = self.out.write_all(data).and_then(|_| self.out.flush()) {
            error!("Error writing to host: {:?}", e);
        }
    }
}
