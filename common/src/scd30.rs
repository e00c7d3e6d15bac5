//! Sensirion SCD30 CO2/temperature/humidity sensor over I2C.
//!
//! Every transfer is a 16 bit command, optionally followed by one argument
//! word. Reads return big endian 16 bit words, each followed by a CRC-8.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::info;

use crate::error::SensorError;
use crate::sensor::{Measurement, Sensor};

pub const DEFAULT_ADDRESS: u8 = 0x61;

const CMD_START_CONTINUOUS: u16 = 0x0010;
const CMD_STOP_CONTINUOUS: u16 = 0x0104;
const CMD_MEASUREMENT_INTERVAL: u16 = 0x4600;
const CMD_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASUREMENT: u16 = 0x0300;
const CMD_SELF_CALIBRATION: u16 = 0x5306;
const CMD_FORCED_RECALIBRATION: u16 = 0x5204;
const CMD_TEMPERATURE_OFFSET: u16 = 0x5403;
const CMD_ALTITUDE: u16 = 0x5102;
const CMD_FIRMWARE_VERSION: u16 = 0xD100;
const CMD_SOFT_RESET: u16 = 0xD304;

/// Time the sensor needs between a command and the following read.
const READ_DELAY_MS: u32 = 3;

/// CRC-8 as used by Sensirion sensors (polynomial 0x31, init 0xFF).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn bus<E: embedded_hal::i2c::Error>(e: E) -> SensorError {
    SensorError::Bus(e.kind())
}

fn float(high: u16, low: u16) -> f32 {
    f32::from_bits((u32::from(high) << 16) | u32::from(low))
}

/// Current sensor settings, as reported at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scd30Settings {
    pub measurement_interval_secs: u16,
    /// In units of 0.01 °C.
    pub temperature_offset: u16,
    pub self_calibration: bool,
    pub altitude_m: u16,
    pub forced_recalibration_ppm: u16,
    pub firmware_version: (u8, u8),
}

pub struct Scd30<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Scd30<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn command(&mut self, command: u16, argument: Option<u16>) -> Result<(), SensorError> {
        let [c0, c1] = command.to_be_bytes();
        match argument {
            None => self.i2c.write(self.address, &[c0, c1]),
            Some(argument) => {
                let [a0, a1] = argument.to_be_bytes();
                self.i2c
                    .write(self.address, &[c0, c1, a0, a1, crc8(&[a0, a1])])
            }
        }
        .map_err(bus)
    }

    fn read_words<const N: usize>(&mut self, command: u16) -> Result<[u16; N], SensorError> {
        self.command(command, None)?;
        self.delay.delay_ms(READ_DELAY_MS);

        let mut frame = [0u8; 18];
        let frame = &mut frame[..N * 3];
        self.i2c.read(self.address, frame).map_err(bus)?;

        let mut words = [0u16; N];
        for (word, chunk) in words.iter_mut().zip(frame.chunks_exact(3)) {
            if crc8(&chunk[..2]) != chunk[2] {
                return Err(SensorError::Checksum);
            }
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Ok(words)
    }

    fn read_word(&mut self, command: u16) -> Result<u16, SensorError> {
        let [word] = self.read_words::<1>(command)?;
        Ok(word)
    }

    /// Start continuous measurement. `ambient_pressure_mbar` of `None`
    /// disables pressure compensation.
    pub fn start_continuous(&mut self, ambient_pressure_mbar: Option<u16>) -> Result<(), SensorError> {
        self.command(CMD_START_CONTINUOUS, Some(ambient_pressure_mbar.unwrap_or(0)))
    }

    pub fn stop_continuous(&mut self) -> Result<(), SensorError> {
        self.command(CMD_STOP_CONTINUOUS, None)
    }

    /// Interval between two measurements, 2 to 1800 seconds.
    pub fn set_measurement_interval(&mut self, seconds: u16) -> Result<(), SensorError> {
        self.command(CMD_MEASUREMENT_INTERVAL, Some(seconds.clamp(2, 1800)))
    }

    pub fn measurement_interval(&mut self) -> Result<u16, SensorError> {
        self.read_word(CMD_MEASUREMENT_INTERVAL)
    }

    pub fn set_self_calibration(&mut self, enabled: bool) -> Result<(), SensorError> {
        self.command(CMD_SELF_CALIBRATION, Some(u16::from(enabled)))
    }

    pub fn self_calibration(&mut self) -> Result<bool, SensorError> {
        Ok(self.read_word(CMD_SELF_CALIBRATION)? == 1)
    }

    pub fn set_forced_recalibration(&mut self, reference_ppm: u16) -> Result<(), SensorError> {
        self.command(CMD_FORCED_RECALIBRATION, Some(reference_ppm))
    }

    pub fn forced_recalibration(&mut self) -> Result<u16, SensorError> {
        self.read_word(CMD_FORCED_RECALIBRATION)
    }

    /// Offset in units of 0.01 °C.
    pub fn set_temperature_offset(&mut self, offset: u16) -> Result<(), SensorError> {
        self.command(CMD_TEMPERATURE_OFFSET, Some(offset))
    }

    pub fn temperature_offset(&mut self) -> Result<u16, SensorError> {
        self.read_word(CMD_TEMPERATURE_OFFSET)
    }

    pub fn set_altitude(&mut self, meters: u16) -> Result<(), SensorError> {
        self.command(CMD_ALTITUDE, Some(meters))
    }

    pub fn altitude(&mut self) -> Result<u16, SensorError> {
        self.read_word(CMD_ALTITUDE)
    }

    pub fn firmware_version(&mut self) -> Result<(u8, u8), SensorError> {
        let [major, minor] = self.read_word(CMD_FIRMWARE_VERSION)?.to_be_bytes();
        Ok((major, minor))
    }

    pub fn soft_reset(&mut self) -> Result<(), SensorError> {
        self.command(CMD_SOFT_RESET, None)
    }

    pub fn settings(&mut self) -> Result<Scd30Settings, SensorError> {
        Ok(Scd30Settings {
            measurement_interval_secs: self.measurement_interval()?,
            temperature_offset: self.temperature_offset()?,
            self_calibration: self.self_calibration()?,
            altitude_m: self.altitude()?,
            forced_recalibration_ppm: self.forced_recalibration()?,
            firmware_version: self.firmware_version()?,
        })
    }

    /// Read the settings and write them to the log.
    pub fn log_settings(&mut self) -> Result<Scd30Settings, SensorError> {
        let settings = self.settings()?;

        info!(
            "SCD30 firmware: {}.{}",
            settings.firmware_version.0, settings.firmware_version.1
        );
        info!(
            "Temperature offset: {:.2} C",
            f32::from(settings.temperature_offset) / 100.0
        );
        info!("Measurement interval: {} s", settings.measurement_interval_secs);
        info!("Self-calibration enabled: {}", settings.self_calibration);
        info!("Altitude: {} meters above sea level", settings.altitude_m);
        info!(
            "Forced recalibration reference: {} ppm",
            settings.forced_recalibration_ppm
        );

        Ok(settings)
    }
}

impl<I2C: I2c, D: DelayNs> Sensor for Scd30<I2C, D> {
    fn data_ready(&mut self) -> Result<bool, SensorError> {
        Ok(self.read_word(CMD_DATA_READY)? == 1)
    }

    fn read_measurement(&mut self) -> Result<Measurement, SensorError> {
        let [co2_h, co2_l, t_h, t_l, rh_h, rh_l] = self.read_words::<6>(CMD_READ_MEASUREMENT)?;

        Ok(Measurement {
            co2_ppm: float(co2_h, co2_l),
            temperature_c: float(t_h, t_l),
            humidity_pct: float(rh_h, rh_l),
        })
    }
}
