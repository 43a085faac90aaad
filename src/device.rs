//! Scd30 device definitions
//!
//! Copyright 2019 Ryan Kurte

/// Scd30 default I2C address
/// (note this is shifted left 1 bit on the wire)
pub const DEFAULT_ADDRESS: u8 = 0x61;

pub const CRC_POLY: u8 = 0x31;
pub const CRC_INIT: u8 = 0xff;
pub const CRC_XOR: u8 = 0x00;

/// Valid ambient pressure compensation range in mBar (0 disables compensation)
pub const PRESSURE_MIN_MBAR: u16 = 700;
pub const PRESSURE_MAX_MBAR: u16 = 1400;

/// Valid continuous measurement interval range in seconds
pub const INTERVAL_MIN_S: u16 = 2;
pub const INTERVAL_MAX_S: u16 = 1800;

/// Scd30 I2C Command
/// Command and data are big endian 16-bit unsigned integers, all Command with data are followed by a CRC-8 checksum
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Command {
    /// Start continuous mode
    /// Data is a u16 representing pressure in mBar for compensation
    /// or zero for no pressure compensation
    StartContinuousMode = 0x0010,

    /// Stop continuous mode
    /// No associated data or CRC
    StopContinuousMode = 0x0104,

    /// Get or set interval for continuous measurement mode
    /// Data is a u16 in seconds between 2 and 1800
    MeasurementInterval = 0x4600,

    /// Fetch data ready status
    /// This returns 1 if data is available in the buffer, 0 otherwise
    GetDataReady = 0x0202,

    /// Read a measurement from the buffer
    ReadMeasurement = 0x0300,

    /// Enable or Disable Automatic Self Calibration (ASC)
    /// Data is a u16, 1 enables ASC and 0 disables ASC
    Asc = 0x5306,

    /// Forced Recalibration Value (FRC)
    /// This is used to compensate for sensor drift when a CO2 reference value is available
    /// Data is a u16 CO2 concentration in ppm
    Frc = 0x5204,

    /// Temperature offset
    /// Data is a raw u16 in the device's offset units (degrees celsius * 100)
    TempOffset = 0x5403,

    /// Altitude compensation
    /// This allows NDIR CO2 sensing to be calibrated by altitude
    /// Data is uint16 in meters above sea level
    AltComp = 0x5102,

    /// Soft Reset the device
    /// No associated data or CRC
    SoftReset = 0xd304,

    GetFirmwareVersion = 0xD100,
}

impl Command {
    /// Big endian command bytes as sent on the wire
    pub fn bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

/// Bus timing and retry configuration
#[derive(PartialEq, Clone, Debug)]
pub struct Config {
    /// Device I2C address
    pub address: u8,
    /// Number of retries after a not-acknowledged attempt
    pub retries: u16,
    /// Number of status polls allowed per transaction before timing out
    pub timeout_polls: u16,
    /// Delay between status polls (ms)
    pub poll_interval_ms: u16,
    /// Delay between sending a read command and reading the response (ms)
    pub read_delay_ms: u16,
    /// Delay following a write (ms)
    pub write_delay_ms: u16,
    /// Delay between a positive data ready status and reading the measurement (ms)
    pub ready_delay_ms: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: DEFAULT_ADDRESS,
            retries: 100,
            timeout_polls: 150,
            poll_interval_ms: 1,
            read_delay_ms: 3,
            write_delay_ms: 5,
            ready_delay_ms: 3,
        }
    }
}
