//! Base communication implementation for interacting with Scd30 device
//!
//! Copyright 2019 Ryan Kurte

use embedded_hal::blocking::delay::DelayMs;

use crate::bus::{Bus, Status};
use crate::device::*;
use crate::{Error, Measurement};

/// Base API for reading and writing to the device
/// This should not be required by consumers, but is exposed to support alternate use (or in future provide ModBus support)
pub trait Base {
    /// Write a command to the device with optional data
    fn write_command(&mut self, command: Command, data: Option<u16>) -> Result<(), Error>;
    /// Read information from the device
    fn read_command(&mut self, command: Command, data: &mut [u8]) -> Result<(), Error>;

    /// Read a single checksummed word
    fn read_word(&mut self, command: Command) -> Result<u16, Error> {
        let mut buff = [0u8; 3];

        self.read_command(command, &mut buff)?;

        check_word(&buff)
    }

    /// Write a single word, appending its checksum
    fn write_word(&mut self, command: Command, value: u16) -> Result<(), Error> {
        self.write_command(command, Some(value))
    }

    /// Read a CO2 / temperature / humidity triple from the measurement buffer
    /// Any invalid checksum fails the whole read
    fn read_measurement(&mut self) -> Result<Measurement, Error> {
        let mut buff = [0u8; 18];

        self.read_command(Command::ReadMeasurement, &mut buff)?;

        let co2 = convert(&buff[0..6])?;
        let temp = convert(&buff[6..12])?;
        let rh = convert(&buff[12..18])?;

        Ok(Measurement { co2, temp, rh })
    }
}

/// Helper for device CRC-8 calculation
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;

    // For each byte
    for v in data {
        // XOR with current byte
        crc ^= v;

        // For each bit (in -ve order, but, doesn't actually matter here)
        for _bit in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    // Apply final xor
    crc ^ CRC_XOR
}

/// Validate a 3-byte (MSB, LSB, CRC) word and return its value
pub fn check_word(word: &[u8]) -> Result<u16, Error> {
    let crc = crc8(&word[..2]);
    if crc != word[2] {
        warn!("CRC mismatch (expected: {:#04x} received: {:#04x})", crc, word[2]);
        return Err(Error::Crc(crc, word[2]));
    }

    Ok(u16::from_be_bytes([word[0], word[1]]))
}

/// Convert from a 6-byte response line into an F32 value
/// Lines are (MMSB, MLSB, CRC, LMSB, LLSB, CRC)
pub fn convert(line: &[u8]) -> Result<f32, Error> {
    let msw = check_word(&line[0..3])?;
    let lsw = check_word(&line[3..6])?;

    // Note the returned data is _big endian_
    let u = (msw as u32) << 16 | (lsw as u32);

    Ok(f32::from_bits(u))
}

/// Transaction engine over a status-polled bus
///
/// Each transaction is issued and then polled until it leaves `Status::Pending`.
/// Not-acknowledged attempts are reissued from scratch up to `Config::retries`
/// times, the poll budget `Config::timeout_polls` is shared by all attempts of
/// one transaction.
pub struct Transport<B, D> {
    bus: B,
    delay: D,
    config: Config,
}

impl<B, D> Transport<B, D>
where
    B: Bus,
    D: DelayMs<u16>,
{
    pub fn new(bus: B, delay: D, config: Config) -> Self {
        Transport { bus, delay, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Release the underlying bus and delay
    pub fn free(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn delay_ms(&mut self, ms: u16) {
        self.delay.delay_ms(ms);
    }

    /// Execute a write transaction
    pub fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        let addr = self.config.address;
        trace!("Writing: {:02x?}", data);

        self.transact(&mut [0u8; 0], |bus, _| bus.write(addr, data))
    }

    /// Execute a read transaction filling `data`
    pub fn receive(&mut self, data: &mut [u8]) -> Result<(), Error> {
        let addr = self.config.address;

        self.transact(data, |bus, buff| bus.read(addr, buff))?;

        trace!("Read: {:02x?}", data);
        Ok(())
    }

    fn transact<F>(&mut self, data: &mut [u8], mut issue: F) -> Result<(), Error>
    where
        F: FnMut(&mut B, &mut [u8]) -> Status,
    {
        let mut polls = 0;
        let mut retries = 0;

        loop {
            let mut status = issue(&mut self.bus, data);

            while status == Status::Pending {
                if polls >= self.config.timeout_polls {
                    debug!("Transaction timed out after {} polls", polls);
                    return Err(Error::Timeout);
                }

                self.delay.delay_ms(self.config.poll_interval_ms);
                polls += 1;

                status = self.bus.status(data);
            }

            match status {
                Status::Complete => return Ok(()),
                Status::AddressNotAcknowledged | Status::DataNotAcknowledged
                    if retries < self.config.retries =>
                {
                    retries += 1;
                    debug!("Transaction not acknowledged ({:?}), retry {}", status, retries);
                }
                _ => {
                    debug!("Transaction failed: {:?} ({} retries)", status, retries);
                    return Err(Error::Bus(status));
                }
            }
        }
    }
}

/// Base implementation for status-polled bus transports
impl<B, D> Base for Transport<B, D>
where
    B: Bus,
    D: DelayMs<u16>,
{
    fn write_command(&mut self, command: Command, data: Option<u16>) -> Result<(), Error> {
        let c = command.bytes();

        let mut buff: [u8; 5] = [c[0], c[1], 0, 0, 0];

        let len = match data {
            Some(d) => {
                buff[2] = (d >> 8) as u8;
                buff[3] = (d & 0xFF) as u8;
                buff[4] = crc8(&buff[2..4]);
                5
            }
            None => 2,
        };

        trace!("Writing command: {:?} data: {:?}", command, data);

        let res = self.send(&buff[..len]);

        // Word writes need settling time whether or not they succeeded
        if data.is_some() {
            let d = self.config.write_delay_ms;
            self.delay.delay_ms(d);
        }

        res
    }

    fn read_command(&mut self, command: Command, data: &mut [u8]) -> Result<(), Error> {
        trace!("Reading command: {:?}", command);

        // First write the read command
        self.send(&command.bytes())?;

        // Give the device time to prepare the response
        let d = self.config.read_delay_ms;
        self.delay.delay_ms(d);

        // Then, read the data back
        self.receive(data)
    }
}
