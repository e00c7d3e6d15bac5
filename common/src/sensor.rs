use co2_pico_model::Sample;

use crate::device::Clock;
use crate::error::SensorError;

/// Raw values of one measurement, as reported by the sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Measurement {
    pub co2_ppm: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// A CO2/temperature/humidity sensor with a data-ready flag.
pub trait Sensor {
    /// Whether a measurement that has not been read yet is available.
    fn data_ready(&mut self) -> Result<bool, SensorError>;

    /// Read the pending measurement. Reading clears the data-ready flag.
    fn read_measurement(&mut self) -> Result<Measurement, SensorError>;
}

/// Produces samples for the acquisition loop.
pub trait SampleSource {
    /// Returns `Ok(None)` while no new measurement is ready and `Ok(Some(_))`
    /// exactly once per new measurement. Bus trouble is an error, never `None`.
    fn poll(&mut self) -> Result<Option<Sample>, SensorError>;
}

/// [`SampleSource`] reading a [`Sensor`] and stamping samples with a [`Clock`].
pub struct SensorSource<S, C> {
    sensor: S,
    clock: C,
}

impl<S: Sensor, C: Clock> SensorSource<S, C> {
    pub fn new(sensor: S, clock: C) -> Self {
        Self { sensor, clock }
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

impl<S: Sensor, C: Clock> SampleSource for SensorSource<S, C> {
    fn poll(&mut self) -> Result<Option<Sample>, SensorError> {
        if !self.sensor.data_ready()? {
            return Ok(None);
        }

        let measurement = self.sensor.read_measurement()?;
        Ok(Some(Sample::from_raw(
            measurement.co2_ppm,
            measurement.temperature_c,
            measurement.humidity_pct,
            self.clock.now(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<FixedOffset> {
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 3, 1, 8, 30, 0)
                .unwrap()
        }
    }

    /// Sensor with one pending measurement per entry of `pending`.
    struct OneShot {
        pending: Vec<Measurement>,
        reads: usize,
    }

    impl Sensor for OneShot {
        fn data_ready(&mut self) -> Result<bool, SensorError> {
            Ok(!self.pending.is_empty())
        }

        fn read_measurement(&mut self) -> Result<Measurement, SensorError> {
            self.reads += 1;
            self.pending.pop().ok_or(SensorError::Checksum)
        }
    }

    struct Broken;

    impl Sensor for Broken {
        fn data_ready(&mut self) -> Result<bool, SensorError> {
            Err(SensorError::Bus(embedded_hal::i2c::ErrorKind::Bus))
        }

        fn read_measurement(&mut self) -> Result<Measurement, SensorError> {
            unreachable!("no read after a failed ready check")
        }
    }

    #[test]
    fn each_measurement_is_reported_once() {
        let sensor = OneShot {
            pending: vec![Measurement {
                co2_ppm: 412.2,
                temperature_c: 21.5,
                humidity_pct: 45.0,
            }],
            reads: 0,
        };
        let mut source = SensorSource::new(sensor, FixedClock);

        let sample = source.poll().unwrap().unwrap();
        assert_eq!(sample.gas_ppm, 412);
        assert_eq!(sample.temperature_c, 21.5);
        assert_eq!(sample.observed_at, FixedClock.now());

        assert_eq!(source.poll().unwrap(), None);
        assert_eq!(source.sensor_mut().reads, 1);
    }

    #[test]
    fn bus_fault_is_not_swallowed() {
        let mut source = SensorSource::new(Broken, FixedClock);

        assert_eq!(
            source.poll(),
            Err(SensorError::Bus(embedded_hal::i2c::ErrorKind::Bus))
        );
    }
}
