use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// One sensor reading.
///
/// A sample is created once per physically new measurement and never changed
/// afterwards.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Gas concentration in parts per million.
    pub gas_ppm: u32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub observed_at: DateTime<FixedOffset>,
}

impl Sample {
    pub fn new(
        gas_ppm: u32,
        temperature_c: f32,
        humidity_pct: f32,
        observed_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            gas_ppm,
            temperature_c,
            humidity_pct,
            observed_at,
        }
    }

    /// Build a sample from the raw floating point concentration the sensor
    /// reports, rounded to the nearest whole ppm.
    pub fn from_raw(
        co2_ppm: f32,
        temperature_c: f32,
        humidity_pct: f32,
        observed_at: DateTime<FixedOffset>,
    ) -> Self {
        let gas_ppm = if co2_ppm.is_finite() && co2_ppm > 0.0 {
            co2_ppm.round() as u32
        } else {
            0
        };

        Self::new(gas_ppm, temperature_c, humidity_pct, observed_at)
    }

    /// Text used for the display label and the console.
    pub fn co2_label(&self) -> String {
        format!("CO2: {} PPM", self.gas_ppm)
    }
}
