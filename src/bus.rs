//! Bus transport interface consumed by the transaction engine
//!
//! Copyright 2019 Ryan Kurte

use core::fmt::Debug;

use embedded_hal::blocking::i2c;

/// Status of an outstanding bus transaction
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Status {
    /// Transaction issued but not yet finished
    Pending,
    /// Transaction completed successfully
    Complete,
    /// Fatal transaction failure, not retried
    Failed,
    /// Device did not acknowledge its address (usually busy)
    AddressNotAcknowledged,
    /// Device did not acknowledge a data byte (usually busy)
    DataNotAcknowledged,
}

/// Status-polled bus transport
///
/// Transactions are issued with `write` or `read` and then polled with `status`
/// until they leave `Status::Pending`. Asynchronous implementations must place
/// read data into the buffer passed to `status` once the read completes.
pub trait Bus {
    /// Issue a write transaction to the device at `addr`
    fn write(&mut self, addr: u8, data: &[u8]) -> Status;
    /// Issue a read transaction from the device at `addr`
    fn read(&mut self, addr: u8, data: &mut [u8]) -> Status;
    /// Poll the status of the outstanding transaction
    fn status(&mut self, data: &mut [u8]) -> Status;
}

/// Bus implementation over blocking embedded-hal I2C
///
/// Transactions complete before `write` / `read` return. As embedded-hal errors
/// carry no kind, any error is reported as a data NACK so the retry budget applies.
pub struct I2cBus<Conn> {
    conn: Conn,
    last: Status,
}

impl<Conn> I2cBus<Conn> {
    pub fn new(conn: Conn) -> Self {
        I2cBus { conn, last: Status::Complete }
    }

    /// Release the underlying connection
    pub fn free(self) -> Conn {
        self.conn
    }
}

impl<Conn, Err> Bus for I2cBus<Conn>
where
    Conn: i2c::Read<Error = Err> + i2c::Write<Error = Err>,
    Err: Debug,
{
    fn write(&mut self, addr: u8, data: &[u8]) -> Status {
        self.last = match self.conn.write(addr, data) {
            Ok(()) => Status::Complete,
            Err(e) => {
                debug!("I2C write error: {:?}", e);
                Status::DataNotAcknowledged
            }
        };
        self.last
    }

    fn read(&mut self, addr: u8, data: &mut [u8]) -> Status {
        self.last = match self.conn.read(addr, data) {
            Ok(()) => Status::Complete,
            Err(e) => {
                debug!("I2C read error: {:?}", e);
                Status::DataNotAcknowledged
            }
        };
        self.last
    }

    fn status(&mut self, _data: &mut [u8]) -> Status {
        self.last
    }
}
