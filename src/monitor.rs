//! Cooperative control loop tying the sensor, host link and indicator together
//!
//! Copyright 2019 Ryan Kurte

use crate::command;
use crate::indicator::{Color, Indicator};
use crate::line::LineAssembler;
use crate::response::Response;
use crate::{Error, Sensor};

/// Maximum bytes taken from the host link per iteration
pub const RX_CHUNK_LEN: usize = 64;

/// Host byte-stream link (e.g. a USB CDC serial port)
pub trait Host {
    /// Link is connected and able to exchange data
    fn is_ready(&mut self) -> bool;
    /// Collect received bytes, returning the number written to `data`
    fn receive(&mut self, data: &mut [u8]) -> usize;
    /// Link can accept data for transmission
    fn can_send(&mut self) -> bool;
    fn send(&mut self, data: &[u8]);
}

/// Monitor configuration
#[derive(PartialEq, Clone, Debug)]
pub struct Settings {
    /// Ticks between measurement polls
    pub period: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings { period: 1000 }
    }
}

pub struct Monitor<S, H, I> {
    sensor: S,
    host: H,
    indicator: I,
    settings: Settings,

    line: LineAssembler,
    out: Response,

    next: u32,
    co2: i32,
    color: Option<Color>,
}

impl<S, H, I> Monitor<S, H, I>
where
    S: Sensor,
    H: Host,
    I: Indicator,
{
    pub fn new(sensor: S, host: H, indicator: I, settings: Settings) -> Self {
        Monitor {
            sensor,
            host,
            indicator,
            settings,
            line: LineAssembler::new(),
            out: Response::new(),
            next: 0,
            co2: 0,
            color: None,
        }
    }

    /// Boot sequence, leaves the sensor idle until started by command
    pub fn start(&mut self) -> Result<(), Error> {
        self.sensor.stop_continuous()
    }

    /// Last measured CO2 concentration (rounded ppm)
    pub fn co2(&self) -> i32 {
        self.co2
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Release the sensor, host and indicator
    pub fn free(self) -> (S, H, I) {
        (self.sensor, self.host, self.indicator)
    }

    /// Run one loop iteration at monotonic tick `now`
    pub fn poll(&mut self, now: u32) {
        // Wrapping compare so the cadence survives tick counter overflow
        if (now.wrapping_sub(self.next) as i32) > 0 {
            self.next = self.next.wrapping_add(self.settings.period);
            self.measure();
        }

        self.service_host();

        let color = Color::from_ppm(self.co2);
        if self.color != Some(color) {
            self.indicator.set(color);
            self.color = Some(color);
        }
    }

    fn measure(&mut self) {
        let m = match self.sensor.read_ready_data() {
            Ok(Some(m)) => m,
            Ok(None) => return,
            Err(e) => {
                warn!("Error reading sensor data: {:?}", e);
                return;
            }
        };

        info!("CO2: {:.2} ppm, Temperature: {:.2} C, Humidity: {:.2} %", m.co2, m.temp, m.rh);

        self.co2 = (m.co2 + 0.5) as i32;

        let _ = self.out.push_fmt(format_args!(
            "CO2={},HUM={:.1},TEMP={:.1}\r\n",
            self.co2, m.rh, m.temp
        ));
    }

    fn service_host(&mut self) {
        if !self.host.is_ready() {
            return;
        }

        let mut buff = [0u8; RX_CHUNK_LEN];
        let n = self.host.receive(&mut buff);

        self.line.feed_all(&buff[..n], |line| {
            // Dropped replies are logged by the response buffer
            let _ = command::execute(&mut self.sensor, line, &mut self.out);
        });

        if !self.out.is_empty() && self.host.can_send() {
            trace!("Sending {} bytes to host", self.out.len());
            self.host.send(self.out.as_bytes());
            self.out.clear();
        }
    }
}
