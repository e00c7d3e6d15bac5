use std::time::{Duration, Instant};

use crate::error::SensorError;
use crate::sensor::{Measurement, Sensor};

/// Sensor producing slowly varying synthetic values, for running the agent
/// without hardware.
///
/// A new measurement becomes ready every `interval`. With `fail_after` set,
/// the sensor reports a fault once that many measurements have been read.
#[derive(Debug)]
pub struct SimulatedSensor {
    interval: Duration,
    last_read: Option<Instant>,
    reads: u32,
    fail_after: Option<u32>,
}

impl SimulatedSensor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_read: None,
            reads: 0,
            fail_after: None,
        }
    }

    pub fn fail_after(mut self, reads: u32) -> Self {
        self.fail_after = Some(reads);
        self
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }

    fn check_fault(&self) -> Result<(), SensorError> {
        match self.fail_after {
            Some(limit) if self.reads >= limit => Err(SensorError::Simulated(format!(
                "sensor stopped answering after {limit} reads"
            ))),
            _ => Ok(()),
        }
    }

    fn waveform(&self) -> Measurement {
        let phase = self.reads as f32 * 0.3;

        Measurement {
            co2_ppm: 650.0 + 180.0 * phase.sin(),
            temperature_c: 21.5 + 1.5 * (phase * 0.5).sin(),
            humidity_pct: 45.0 + 5.0 * (phase * 0.7).cos(),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl Sensor for SimulatedSensor {
    fn data_ready(&mut self) -> Result<bool, SensorError> {
        self.check_fault()?;

        Ok(match self.last_read {
            None => true,
            Some(at) => at.elapsed() >= self.interval,
        })
    }

    fn read_measurement(&mut self) -> Result<Measurement, SensorError> {
        self.check_fault()?;

        let measurement = self.waveform();
        self.reads += 1;
        self.last_read = Some(Instant::now());
        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_always_ready() {
        let mut sensor = SimulatedSensor::new(Duration::ZERO);

        for _ in 0..5 {
            assert!(sensor.data_ready().unwrap());
            let m = sensor.read_measurement().unwrap();
            assert!((470.0..=830.0).contains(&m.co2_ppm));
            assert!((40.0..=50.0).contains(&m.humidity_pct));
        }
        assert_eq!(sensor.reads(), 5);
    }

    #[test]
    fn long_interval_waits_after_a_read() {
        let mut sensor = SimulatedSensor::new(Duration::from_secs(3600));

        assert!(sensor.data_ready().unwrap());
        sensor.read_measurement().unwrap();
        assert!(!sensor.data_ready().unwrap());
    }

    #[test]
    fn fault_injection() {
        let mut sensor = SimulatedSensor::new(Duration::ZERO).fail_after(2);

        sensor.read_measurement().unwrap();
        sensor.read_measurement().unwrap();

        assert!(matches!(
            sensor.data_ready(),
            Err(SensorError::Simulated(_))
        ));
    }
}
