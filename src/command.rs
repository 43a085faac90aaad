//! Text command interpreter
//!
//! Lines are case-insensitive and matched by prefix, replies are terminated
//! with CRLF. Unrecognised lines are ignored without a reply.
//!
//! | Command        | Action                                              |
//! |----------------|-----------------------------------------------------|
//! | `STA`          | start continuous measurement without pressure comp. |
//! | `STP`          | stop continuous measurement                         |
//! | `ID?`          | identity string                                     |
//! | `PARAM?`       | dump version and calibration parameters             |
//! | `FRC=n` `FRC?` | set / query forced recalibration value              |
//! | `ASC=n` `ASC?` | set / query automatic self calibration              |
//! | `TOFFSET=n` `TOFFSET?` | set / query temperature offset              |
//! | `ALT=n` `ALT?` | set / query altitude compensation                   |
//!
//! A setter without an argument reports the current value instead.
//!
//! Copyright 2019 Ryan Kurte

use crate::response::{Overflow, Response};
use crate::{Error, Sensor};

/// Reply to `ID?`
pub const IDENTITY: &str = "OK ID=UD-CO2S-MOD\r\n";

/// Calibration parameters reachable via `NAME=` / `NAME?`
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Param {
    Frc,
    Asc,
    TempOffset,
    Altitude,
}

impl Param {
    /// Label used when reporting the value
    pub fn label(self) -> &'static str {
        match self {
            Param::Frc => "FRC",
            Param::Asc => "ASC",
            Param::TempOffset => "TEMP OFFSET",
            Param::Altitude => "ALT",
        }
    }

    fn read<S: Sensor>(self, sensor: &mut S) -> Result<u16, Error> {
        match self {
            Param::Frc => sensor.frc(),
            Param::Asc => sensor.asc(),
            Param::TempOffset => sensor.temp_offset(),
            Param::Altitude => sensor.alt_offset(),
        }
    }

    fn write<S: Sensor>(self, sensor: &mut S, value: i32) -> Result<(), Error> {
        // Values are truncated to the 16-bit register width
        match self {
            Param::Frc => sensor.set_frc(value as u16),
            Param::Asc => sensor.set_asc(value != 0),
            Param::TempOffset => sensor.set_temp_offset(value as u16),
            Param::Altitude => sensor.set_alt_offset(value as u16),
        }
    }
}

/// Parsed command line
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Request {
    Start,
    Stop,
    Identify,
    Params,
    Query(Param),
    Update(Param, i32),
}

/// Setter / query prefixes, checked in order
const PARAMS: [(&[u8], &[u8], Param); 4] = [
    (b"FRC=", b"FRC?", Param::Frc),
    (b"ASC=", b"ASC?", Param::Asc),
    (b"TOFFSET=", b"TOFFSET?", Param::TempOffset),
    (b"ALT=", b"ALT?", Param::Altitude),
];

impl Request {
    /// Parse an upper-case command line
    pub fn parse(line: &[u8]) -> Option<Request> {
        if line.starts_with(b"STA") {
            return Some(Request::Start);
        }
        if line.starts_with(b"STP") {
            return Some(Request::Stop);
        }
        if line.starts_with(b"ID?") {
            return Some(Request::Identify);
        }
        if line.starts_with(b"PARAM?") {
            return Some(Request::Params);
        }

        for (set, query, param) in PARAMS.iter() {
            if line.starts_with(set) {
                return Some(match parse_value(&line[set.len()..]) {
                    Some(v) => Request::Update(*param, v),
                    None => Request::Query(*param),
                });
            }
            if line.starts_with(query) {
                return Some(Request::Query(*param));
            }
        }

        None
    }
}

/// Parse a setter argument
///
/// Leading spaces are skipped and an empty remainder yields `None`. Otherwise
/// parsing is permissive: leading digits are converted and anything after them
/// is ignored, with no digits at all reading as 0.
pub fn parse_value(arg: &[u8]) -> Option<i32> {
    let start = arg.iter().position(|b| *b != b' ')?;

    Some(atoi(&arg[start..]))
}

fn atoi(s: &[u8]) -> i32 {
    let mut i = 0;
    while i < s.len() && s[i].is_ascii_whitespace() {
        i += 1;
    }

    let mut negative = false;
    if i < s.len() && (s[i] == b'-' || s[i] == b'+') {
        negative = s[i] == b'-';
        i += 1;
    }

    let mut v: i32 = 0;
    for b in s[i..].iter().take_while(|b| b.is_ascii_digit()) {
        v = v.wrapping_mul(10).wrapping_add((b - b'0') as i32);
    }

    if negative {
        v.wrapping_neg()
    } else {
        v
    }
}

/// Interpret a command line against the sensor, queueing any reply
///
/// The line is upper-cased in place. Returns the executed request, or `None`
/// when the line was not recognised. `Overflow` means a reply was dropped.
pub fn execute<S: Sensor>(
    sensor: &mut S,
    line: &mut [u8],
    out: &mut Response,
) -> Result<Option<Request>, Overflow> {
    line.make_ascii_uppercase();

    let req = match Request::parse(line) {
        Some(r) => r,
        None => {
            if !line.is_empty() {
                debug!("Ignoring unrecognised command: {:?}", core::str::from_utf8(line));
            }
            return Ok(None);
        }
    };

    debug!("Executing command: {:?}", req);

    match req {
        Request::Start => ok_ng(out, sensor.start_continuous(0))?,
        Request::Stop => ok_ng(out, sensor.stop_continuous())?,
        Request::Identify => out.push_str(IDENTITY)?,
        Request::Params => {
            match sensor.firmware_version() {
                Ok(v) => out.push_fmt(format_args!("VER {:#06x}\r\n", v))?,
                Err(e) => not_good(out, e)?,
            }

            for p in &[Param::Asc, Param::Frc, Param::TempOffset, Param::Altitude] {
                report(out, p.label(), p.read(sensor))?;
            }

            report(out, "Interval", sensor.measurement_interval())?;
        }
        Request::Query(p) => report(out, p.label(), p.read(sensor))?,
        Request::Update(p, v) => ok_ng(out, p.write(sensor, v))?,
    }

    Ok(Some(req))
}

fn ok_ng(out: &mut Response, res: Result<(), Error>) -> Result<(), Overflow> {
    match res {
        Ok(()) => out.push_str("OK\r\n"),
        Err(e) => not_good(out, e),
    }
}

fn report(out: &mut Response, label: &str, res: Result<u16, Error>) -> Result<(), Overflow> {
    match res {
        Ok(v) => out.push_fmt(format_args!("{} = {}\r\n", label, v)),
        Err(e) => not_good(out, e),
    }
}

fn not_good(out: &mut Response, e: Error) -> Result<(), Overflow> {
    debug!("Command failed: {:?}", e);
    out.push_str("NG\r\n")
}
