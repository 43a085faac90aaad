//! CO2 level status indicator
//!
//! Copyright 2019 Ryan Kurte

/// RGB indicator colour
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0 };
    pub const ORANGE: Color = Color { r: 255, g: 165, b: 0 };
    pub const PURPLE: Color = Color { r: 170, g: 0, b: 255 };

    /// Map a CO2 concentration (ppm) to its indicator colour
    pub fn from_ppm(co2: i32) -> Color {
        match co2 {
            i32::MIN..=1000 => Color::BLUE,
            1001..=1500 => Color::GREEN,
            1501..=2500 => Color::YELLOW,
            2501..=3500 => Color::ORANGE,
            _ => Color::PURPLE,
        }
    }
}

/// Status output driven from the measured value
pub trait Indicator {
    fn set(&mut self, color: Color);
}
