//! Scd30 CO2 monitor core
//!
//! Driver for the Sensirion SCD30 CO2 / temperature / humidity sensor over a
//! status-polled bus, plus the line-oriented command protocol used to
//! configure it from a host.
//!
//! Copyright 2019 Ryan Kurte

#![no_std]

#[macro_use]
extern crate log;

extern crate embedded_hal;
use embedded_hal::blocking::delay::DelayMs;

pub mod base;
pub mod bus;
pub mod command;
pub mod device;
pub mod indicator;
pub mod line;
pub mod monitor;
pub mod response;

#[cfg(feature = "util")]
extern crate std;
#[cfg(feature = "util")]
pub mod stdio;

#[cfg(test)]
mod mock;

use crate::base::{Base, Transport};
use crate::bus::{Bus, Status};
use crate::device::*;

pub use crate::device::Config;

/// Scd30 sensor object
/// This is generic over a bus transport and a delay provider
pub struct Scd30<B, D> {
    conn: Transport<B, D>,
}

/// Scd30 error object
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Error {
    /// Bus transaction failed, carries the final transaction status
    Bus(Status),
    /// Bus transaction did not complete within the poll budget
    Timeout,
    /// Checksum mismatch (expected, received)
    Crc(u8, u8),
    /// Argument rejected before any bus transaction
    OutOfRange(u16),
    NoDevice,
}

/// Scd30 measurement object
#[derive(PartialEq, Clone, Debug)]
pub struct Measurement {
    /// CO2 concentration in parts-per-million (PPM)
    /// Range: 0 - 10,000
    pub co2: f32,
    /// Temperature in degrees celsius
    /// Range: -40 - 125 C
    pub temp: f32,
    /// Relative Humidity (%)
    /// Range: 0 - 100
    pub rh: f32,
}

/// Sensor operations used by the command interpreter and monitor loop
pub trait Sensor {
    /// Start continuous sensing mode with optional pressure compensation
    /// pressure_compensation should either be the current pressure in millibar or 0 to disable compensation
    fn start_continuous(&mut self, pressure_compensation: u16) -> Result<(), Error>;

    /// Stop continuous sensing mode
    fn stop_continuous(&mut self) -> Result<(), Error>;

    /// Configure measurement interval in seconds (2 - 1800)
    fn set_measurement_interval(&mut self, interval: u16) -> Result<(), Error>;
    fn measurement_interval(&mut self) -> Result<u16, Error>;

    /// Raw data ready status, non-zero when a measurement is available
    fn data_ready_status(&mut self) -> Result<u16, Error>;

    /// Read measurement data from the buffer
    fn read_data(&mut self) -> Result<Measurement, Error>;

    /// Read a measurement if one is ready, `None` otherwise
    fn read_ready_data(&mut self) -> Result<Option<Measurement>, Error> {
        if self.data_ready_status()? == 0 {
            return Ok(None);
        }

        self.read_data().map(Some)
    }

    /// Enable or disable Automatic Self-Calibration
    fn set_asc(&mut self, enabled: bool) -> Result<(), Error>;
    fn asc(&mut self) -> Result<u16, Error>;

    /// Set Forced Recalibration Value
    /// This allows the sensor to be recalibrates using a reference CO2 source
    fn set_frc(&mut self, cal_ppm: u16) -> Result<(), Error>;
    fn frc(&mut self) -> Result<u16, Error>;

    /// Set Temperature Compensation (raw device units)
    fn set_temp_offset(&mut self, offset: u16) -> Result<(), Error>;
    fn temp_offset(&mut self) -> Result<u16, Error>;

    /// Set Altitude Compensation in meters above sea level
    fn set_alt_offset(&mut self, altitude: u16) -> Result<(), Error>;
    fn alt_offset(&mut self) -> Result<u16, Error>;

    fn firmware_version(&mut self) -> Result<u16, Error>;

    /// Soft reset the underlying device
    fn soft_reset(&mut self) -> Result<(), Error>;
}

impl<B, D> Scd30<B, D>
where
    B: Bus,
    D: DelayMs<u16>,
{
    /// Create a new Scd30 sensor instance
    /// This does not communicate with the device, see `probe`
    pub fn new(bus: B, delay: D, config: Config) -> Self {
        Scd30 { conn: Transport::new(bus, delay, config) }
    }

    /// Check communication with the device
    pub fn probe(&mut self) -> Result<u16, Error> {
        let v = self.firmware_version()?;
        if v == 0x0000 || v == 0xFFFF {
            return Err(Error::NoDevice);
        }

        debug!("Found SCD30 firmware version {:#06x}", v);

        Ok(v)
    }

    /// Release the underlying bus and delay
    pub fn free(self) -> (B, D) {
        self.conn.free()
    }
}

impl<B, D> Sensor for Scd30<B, D>
where
    B: Bus,
    D: DelayMs<u16>,
{
    fn start_continuous(&mut self, pressure_compensation: u16) -> Result<(), Error> {
        if pressure_compensation != 0
            && !(PRESSURE_MIN_MBAR..=PRESSURE_MAX_MBAR).contains(&pressure_compensation)
        {
            return Err(Error::OutOfRange(pressure_compensation));
        }

        self.conn.write_word(Command::StartContinuousMode, pressure_compensation)
    }

    fn stop_continuous(&mut self) -> Result<(), Error> {
        self.conn.write_command(Command::StopContinuousMode, None)
    }

    fn set_measurement_interval(&mut self, interval: u16) -> Result<(), Error> {
        if !(INTERVAL_MIN_S..=INTERVAL_MAX_S).contains(&interval) {
            return Err(Error::OutOfRange(interval));
        }

        self.conn.write_word(Command::MeasurementInterval, interval)
    }

    fn measurement_interval(&mut self) -> Result<u16, Error> {
        self.conn.read_word(Command::MeasurementInterval)
    }

    fn data_ready_status(&mut self) -> Result<u16, Error> {
        self.conn.read_word(Command::GetDataReady)
    }

    fn read_data(&mut self) -> Result<Measurement, Error> {
        self.conn.read_measurement()
    }

    fn read_ready_data(&mut self) -> Result<Option<Measurement>, Error> {
        if self.data_ready_status()? == 0 {
            return Ok(None);
        }

        // Device needs a moment between the ready flag and the data read
        let d = self.conn.config().ready_delay_ms;
        self.conn.delay_ms(d);

        self.read_data().map(Some)
    }

    fn set_asc(&mut self, enabled: bool) -> Result<(), Error> {
        let v = match enabled {
            true => 1,
            false => 0,
        };

        self.conn.write_word(Command::Asc, v)
    }

    fn asc(&mut self) -> Result<u16, Error> {
        self.conn.read_word(Command::Asc)
    }

    fn set_frc(&mut self, cal_ppm: u16) -> Result<(), Error> {
        self.conn.write_word(Command::Frc, cal_ppm)
    }

    fn frc(&mut self) -> Result<u16, Error> {
        self.conn.read_word(Command::Frc)
    }

    fn set_temp_offset(&mut self, offset: u16) -> Result<(), Error> {
        self.conn.write_word(Command::TempOffset, offset)
    }

    fn temp_offset(&mut self) -> Result<u16, Error> {
        self.conn.read_word(Command::TempOffset)
    }

    fn set_alt_offset(&mut self, altitude: u16) -> Result<(), Error> {
        self.conn.write_word(Command::AltComp, altitude)
    }

    fn alt_offset(&mut self) -> Result<u16, Error> {
        self.conn.read_word(Command::AltComp)
    }

    fn firmware_version(&mut self) -> Result<u16, Error> {
        self.conn.read_word(Command::GetFirmwareVersion)
    }

    fn soft_reset(&mut self) -> Result<(), Error> {
        let res = self.conn.write_command(Command::SoftReset, None);

        let d = self.conn.config().write_delay_ms;
        self.conn.delay_ms(d);

        res
    }
}

#[cfg(test)]
mod test {
    extern crate std;
    use std::vec;

    use embedded_hal_mock::delay::MockNoop;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::bus::I2cBus;
    use crate::device::{Command, DEFAULT_ADDRESS};
    use crate::mock::{CountingDelay, LoopbackBus};

    fn sensor(i2c: &I2cMock) -> Scd30<I2cBus<I2cMock>, MockNoop> {
        Scd30::new(I2cBus::new(i2c.clone()), MockNoop::new(), Config::default())
    }

    fn loopback() -> Scd30<LoopbackBus, CountingDelay> {
        Scd30::new(LoopbackBus::new(), CountingDelay::default(), Config::default())
    }

    #[test]
    fn test_start_continuous() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x00, 0x10, 0x00, 0x00, 0x81]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Start continuous mode
        sensor.start_continuous(0).unwrap();

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn test_stop_continuous() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x01, 0x04]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Stop continuous mode
        sensor.stop_continuous().unwrap();

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn test_set_measurement_interval() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x46, 0x00, 0x00, 0x02, 0xE3]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Set measurement interval to 2s
        sensor.set_measurement_interval(2).unwrap();

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn test_set_frc() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x52, 0x04, 0x01, 0xc2, 0x50]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Set forced recalibration to 450ppm
        sensor.set_frc(450).unwrap();

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn set_temp_offset() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x54, 0x03, 0x01, 0xF4, 0x33]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Set temperature offset to 5 degrees
        sensor.set_temp_offset(500).unwrap();

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn set_alt_offset() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x51, 0x02, 0x03, 0xE8, 0xD4]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Set altitude to 1000m
        sensor.set_alt_offset(1000).unwrap();

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn test_set_asc_normalises() {
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x53, 0x06, 0x00, 0x01, 0xB0]),
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x53, 0x06, 0x00, 0x00, 0x81]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let mut sensor = sensor(&i2c);

        sensor.set_asc(true).unwrap();
        sensor.set_asc(false).unwrap();

        i2c.done();
    }

    #[test]
    fn test_soft_reset() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0xD3, 0x04]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Signal for soft reset
        sensor.soft_reset().unwrap();

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn test_read_data_ready() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x02, 0x02]),
            I2cTransaction::read(DEFAULT_ADDRESS, vec![0x00, 0x01, 0xB0]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Read data ready
        let ready = sensor.data_ready_status().unwrap();
        assert_eq!(ready, 1);

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn test_read_measurement() {
        // Set up expectations
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x03, 0x00]),
            I2cTransaction::read(DEFAULT_ADDRESS, vec![
                0x43, 0xDB, 0xCB, 0x8C, 0x2E, 0x8F, // CO2: 439 ppm
                0x41, 0xD9, 0x70, 0xE7, 0xFF, 0xF5, // Temperature: 27.2 C
                0x42, 0x43, 0xBF, 0x3A, 0x1B, 0x74, // Relative humidity, 48.8 %
            ]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        // Create sensor object
        let mut sensor = sensor(&i2c);

        // Read measurement
        let m = sensor.read_data().unwrap();

        assert_approx_eq!(m.co2, 439.0, 0.1);
        assert_approx_eq!(m.temp, 27.2, 0.1);
        assert_approx_eq!(m.rh, 48.8, 0.1);

        // Finalize expectations
        i2c.done();
    }

    #[test]
    fn test_read_ready_data_settles() {
        let mut bus = LoopbackBus::new();
        bus.set_word(Command::GetDataReady as u16, 0);
        let mut s = Scd30::new(bus, CountingDelay::default(), Config::default());

        // Not ready, no measurement read and no settle delay
        assert_eq!(s.read_ready_data(), Ok(None));
        let (mut bus, delay) = s.free();
        assert_eq!(bus.frames, [[0x02, 0x02]]);
        assert_eq!(delay.total_ms, 3);

        bus.frames.clear();
        bus.set_word(Command::GetDataReady as u16, 1);
        bus.set_response(Command::ReadMeasurement as u16, &[
            0x43, 0xDB, 0xCB, 0x8C, 0x2E, 0x8F, // CO2: 439 ppm
            0x41, 0xD9, 0x70, 0xE7, 0xFF, 0xF5, // Temperature: 27.2 C
            0x42, 0x43, 0xBF, 0x3A, 0x1B, 0x74, // Relative humidity, 48.8 %
        ]);
        let mut s = Scd30::new(bus, CountingDelay::default(), Config::default());

        let m = s.read_ready_data().unwrap().unwrap();
        assert_approx_eq!(m.co2, 439.0, 0.1);

        // Read settle, ready settle, read settle
        let (bus, delay) = s.free();
        assert_eq!(bus.frames, [[0x02, 0x02], [0x03, 0x00]]);
        assert_eq!(delay.calls, 3);
        assert_eq!(delay.total_ms, 9);
    }

    #[test]
    fn test_probe() {
        let expectations = [
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0xD1, 0x00]),
            I2cTransaction::read(DEFAULT_ADDRESS, vec![0x03, 0x42, 0xF3]),
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0xD1, 0x00]),
            I2cTransaction::read(DEFAULT_ADDRESS, vec![0xFF, 0xFF, 0xAC]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let mut sensor = sensor(&i2c);

        assert_eq!(sensor.probe(), Ok(0x0342));
        assert_eq!(sensor.probe(), Err(Error::NoDevice));

        i2c.done();
    }

    #[test]
    fn test_measurement_interval_bounds() {
        let mut s = loopback();

        assert_eq!(s.set_measurement_interval(1), Err(Error::OutOfRange(1)));
        assert_eq!(s.set_measurement_interval(1801), Err(Error::OutOfRange(1801)));
        assert!(s.conn.free().0.frames.is_empty());

        let mut s = loopback();
        assert_eq!(s.set_measurement_interval(2), Ok(()));
        assert_eq!(s.set_measurement_interval(1800), Ok(()));
        assert_eq!(s.measurement_interval(), Ok(1800));
    }

    #[test]
    fn test_start_pressure_bounds() {
        let mut s = loopback();

        assert_eq!(s.start_continuous(699), Err(Error::OutOfRange(699)));
        assert_eq!(s.start_continuous(1401), Err(Error::OutOfRange(1401)));
        assert!(s.conn.free().0.frames.is_empty());

        let mut s = loopback();
        for p in &[700, 1400, 0] {
            assert_eq!(s.start_continuous(*p), Ok(()));
        }

        let (bus, _) = s.free();
        assert_eq!(bus.frames.len(), 3);
        assert_eq!(bus.frames[0], vec![0x00, 0x10, 0x02, 0xBC, 0x9A]);
        assert_eq!(bus.frames[1], vec![0x00, 0x10, 0x05, 0x78, 0xB7]);
    }

    #[test]
    fn test_parameter_loopback() {
        let mut s = loopback();

        s.set_frc(450).unwrap();
        s.set_temp_offset(250).unwrap();
        s.set_alt_offset(1000).unwrap();
        s.set_asc(true).unwrap();

        assert_eq!(s.frc(), Ok(450));
        assert_eq!(s.temp_offset(), Ok(250));
        assert_eq!(s.alt_offset(), Ok(1000));
        assert_eq!(s.asc(), Ok(1));
    }
}
