//! Scd30 CO2 monitor utility
//!
//! Runs the monitor control loop against a local Scd30 over I2C, using
//! stdin / stdout as the host command link.
//!
//! Copyright 2019 Ryan Kurte

use std::time::Instant;

extern crate embedded_hal;
extern crate linux_embedded_hal;
use linux_embedded_hal::{Delay, I2cdev};

extern crate structopt;
use structopt::StructOpt;

extern crate humantime;
use humantime::Duration as HumanDuration;

#[macro_use]
extern crate log;
extern crate simplelog;
use simplelog::{LevelFilter, WriteLogger};

extern crate scd30_monitor;
use scd30_monitor::bus::I2cBus;
use scd30_monitor::indicator::{Color, Indicator};
use scd30_monitor::monitor::{Monitor, Settings};
use scd30_monitor::stdio::StdioHost;
use scd30_monitor::{Config, Scd30, Sensor};

#[derive(StructOpt)]
#[structopt(name = "scd30-monitor")]
/// CO2 monitor for a local Scd30 environmental sensor over I2C, accepting text commands on stdin
pub struct Options {
    /// Specify the i2c interface to use to connect to the scd30 device
    #[structopt(short = "d", long = "i2c", default_value = "/dev/i2c-1", env = "SCD30_I2C")]
    i2c: String,

    /// Scd30 I2C address
    #[structopt(long = "address", default_value = "0x61", parse(try_from_str = "parse_hex"))]
    address: u8,

    /// Retries for not-acknowledged I2C transactions
    #[structopt(long = "retries", default_value = "100")]
    retries: u16,

    /// Status polls (1ms apart) allowed per I2C transaction
    #[structopt(long = "timeout", default_value = "150")]
    timeout: u16,

    /// Period between measurement ready checks
    #[structopt(short = "p", long = "period", default_value = "1s")]
    pub period: HumanDuration,

    /// Delay between control loop iterations
    #[structopt(long = "poll-delay", default_value = "10ms")]
    pub poll_delay: HumanDuration,

    /// Start continuous measurement at boot with this ambient pressure (mBar, 0 to disable compensation)
    #[structopt(long = "pressure")]
    pressure: Option<u16>,

    /// Enable verbose logging
    #[structopt(long = "log-level", default_value = "info")]
    level: LevelFilter,
}

fn parse_hex(s: &str) -> Result<u8, std::num::ParseIntError> {
    match s.trim_start_matches("0x") {
        v if v.len() != s.len() => u8::from_str_radix(v, 16),
        _ => s.parse(),
    }
}

/// Indicator reporting colour changes via the log
struct LogIndicator;

impl Indicator for LogIndicator {
    fn set(&mut self, color: Color) {
        info!("Indicator: ({}, {}, {})", color.r, color.g, color.b);
    }
}

fn main() {
    // Load options
    let opts = Options::from_args();

    // Setup logging, stdout is reserved for the command link
    WriteLogger::init(opts.level, simplelog::Config::default(), std::io::stderr()).unwrap();

    debug!("Connecting to I2C device");
    let i2c = match I2cdev::new(&opts.i2c) {
        Ok(v) => v,
        Err(e) => {
            error!("Error opening I2C device '{}': {:?}", &opts.i2c, e);
            std::process::exit(-1);
        }
    };

    let config = Config {
        address: opts.address,
        retries: opts.retries,
        timeout_polls: opts.timeout,
        ..Config::default()
    };

    debug!("Connecting to SCD30");
    let mut sensor = Scd30::new(I2cBus::new(i2c), Delay, config);
    if let Err(e) = sensor.probe() {
        error!("Error connecting to SCD30: {:?}", e);
        std::process::exit(-2);
    }

    let settings = Settings { period: opts.period.as_millis() as u32 };
    let mut monitor = Monitor::new(sensor, StdioHost::new(), LogIndicator, settings);

    if let Err(e) = monitor.start() {
        warn!("Error stopping continuous mode: {:?}", e);
    }

    if let Some(p) = opts.pressure {
        debug!("Starting continuous mode");
        if let Err(e) = monitor.sensor_mut().start_continuous(p) {
            error!("Error starting continuous mode: {:?}", e);
            std::process::exit(-3);
        }
    }

    let start = Instant::now();

    loop {
        let now = start.elapsed().as_millis() as u32;
        monitor.poll(now);

        std::thread::sleep(*opts.poll_delay);
    }
}
