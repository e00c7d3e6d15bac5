use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use co2_pico_common::{
    fault_reset, AdafruitIo, AgentConfig, Clock, Components, Credentials, DeviceReset, Fault,
    Scd30, SensorSource, SetupError, StatusDisplay, Supervisor, SystemClock, ThreadSleeper,
};
use embedded_hal_bus::i2c::RcDevice;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

mod display;
mod http;
mod wifi;

use display::OledDisplay;
use http::EspHttpTransport;

const AIO_USERNAME: &str = env!("AIO_USERNAME");
const AIO_KEY: &str = env!("AIO_KEY");

/// Slow enough for the SCD30 clock stretching.
const I2C_BAUDRATE_KHZ: u32 = 50;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const SNTP_POLL_MS: u32 = 500;
const SNTP_ATTEMPTS: u32 = 40;

type SharedBus = Rc<RefCell<I2cDriver<'static>>>;
type BusDevice = RcDevice<I2cDriver<'static>>;
type Source = SensorSource<Scd30<BusDevice, FreeRtos>, SystemClock>;
type Oled = OledDisplay<BusDevice>;

/// Hardware restart. Never returns.
struct EspReset;

impl DeviceReset for EspReset {
    fn reset(&mut self) {
        esp_idf_svc::hal::reset::restart();
    }
}

/// Connections that must stay alive while the agent runs.
struct Network {
    _wifi: wifi::Wifi,
    _sntp: EspSntp<'static>,
}

fn device_config() -> AgentConfig {
    let mut config = AgentConfig::default();
    if let Some(offset) = option_env!("TZ_OFFSET") {
        if let Err(e) = config.set_tz_offset(offset) {
            warn!("Ignoring TZ_OFFSET: {e}");
        }
    }
    config
}

fn start_wifi(modem: Modem) -> anyhow::Result<wifi::Wifi> {
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    wifi::connect(&mut wifi)?;

    Ok(wifi)
}

fn sync_time(clock: &SystemClock) -> anyhow::Result<EspSntp<'static>> {
    let sntp = EspSntp::new_default()?;
    info!("Fetching time from NTP server...");

    for _ in 0..SNTP_ATTEMPTS {
        if sntp.get_sync_status() == SyncStatus::Completed {
            info!("Time synchronized: {}", clock.now());
            return Ok(sntp);
        }
        FreeRtos::delay_ms(SNTP_POLL_MS);
    }

    Err(anyhow!("no answer from the NTP server"))
}

/// Sensor, network and feed service. Any failure here is handled like a
/// fault of the running loop.
fn setup(
    modem: Modem,
    bus: &SharedBus,
    config: &AgentConfig,
) -> Result<(Source, AdafruitIo<EspHttpTransport>, Network), Fault> {
    let mut scd30 = Scd30::new(RcDevice::new(bus.clone()), FreeRtos);
    scd30.start_continuous(None)?;
    scd30.log_settings()?;

    let clock = SystemClock::with_offset_hours(config.tz_offset_hours);
    let wifi = start_wifi(modem).map_err(|e| SetupError::new("wifi", e))?;
    let sntp = sync_time(&clock).map_err(|e| SetupError::new("time", e))?;

    let transport = EspHttpTransport::new(HTTP_TIMEOUT).map_err(|e| SetupError::new("http", e))?;
    let credentials = Credentials {
        username: AIO_USERNAME.into(),
        key: AIO_KEY.into(),
    };

    let source = SensorSource::new(scd30, clock);
    let network = Network {
        _wifi: wifi,
        _sntp: sntp,
    };

    Ok((source, AdafruitIo::new(transport, credentials), network))
}

/// Log the fault, wait and restart. Only returns if the restart did not
/// happen.
fn restart_after<D: StatusDisplay>(
    display: &mut Option<D>,
    config: &AgentConfig,
    fault: Fault,
) -> anyhow::Error {
    fault_reset(
        display,
        &mut ThreadSleeper,
        &mut EspReset,
        config.reset_delay(),
        &fault,
    );
    fault.into()
}

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    EspLogger::initialize_default();

    let config = device_config();

    let peripherals = match Peripherals::take() {
        Ok(peripherals) => peripherals,
        Err(e) => {
            let fault = SetupError::new("peripherals", e).into();
            return Err(restart_after(&mut None::<Oled>, &config, fault));
        }
    };

    // The sensor and the display share one bus.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into()),
    );
    let bus: SharedBus = match i2c {
        Ok(i2c) => Rc::new(RefCell::new(i2c)),
        Err(e) => {
            let fault = SetupError::new("i2c", e).into();
            return Err(restart_after(&mut None::<Oled>, &config, fault));
        }
    };

    let display: Oled = match OledDisplay::new(RcDevice::new(bus.clone())) {
        Ok(display) => display,
        Err(e) => {
            let fault = SetupError::new("display", e).into();
            return Err(restart_after(&mut None::<Oled>, &config, fault));
        }
    };

    let (source, api, _network) = match setup(peripherals.modem, &bus, &config) {
        Ok(parts) => parts,
        Err(fault) => return Err(restart_after(&mut Some(display), &config, fault)),
    };

    let components = Components {
        source,
        display,
        api,
        sleeper: ThreadSleeper,
        reset: EspReset,
    };

    // Only returns if the restart did not happen.
    let fault = Supervisor::new(components, config).boot();
    Err(fault.into())
}
