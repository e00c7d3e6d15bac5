// Prevent console window in addition to Slint window in Windows release builds when, e.g., starting the app via file manager. Ignored on other platforms.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

slint::include_modules!();

mod display;
mod transport;

use std::time::Duration;

use co2_pico_common::{
    AdafruitIo, AgentConfig, Components, Credentials, DeviceReset, FeedApi, MemoryFeeds,
    SensorSource, SimulatedSensor, Supervisor, SystemClock, ThreadSleeper,
};
use log::{info, warn};

use display::SlintDisplay;
use transport::UreqTransport;

/// Inject a sensor fault after this many samples, to watch the reset path.
const FAIL_AFTER_VAR: &str = "CO2_PICO_FAIL_AFTER";

/// Interval at which the simulated sensor has new data.
const SENSOR_INTERVAL: Duration = Duration::from_secs(2);

/// A process cannot restart itself like the device does, so a reset only
/// records that the agent has to be built again.
#[derive(Default)]
struct InProcessRestart {
    count: usize,
}

impl DeviceReset for InProcessRestart {
    fn reset(&mut self) {
        self.count += 1;
        info!("Restart #{} requested", self.count);
    }
}

/// The App holds the window and hands a weak reference of it to the agent
/// thread, which runs the acquisition loop.
struct App {
    ui: AppWindow,
    config: AgentConfig,
}

impl App {
    fn new() -> anyhow::Result<Self> {
        let ui = AppWindow::new()?;
        let config = AgentConfig::from_env()?;
        info!("Configuration: {config:?}");

        Ok(Self { ui, config })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let window = self.ui.as_weak();
        let config = self.config.clone();
        let fail_after = fail_after()?;

        std::thread::Builder::new()
            .name("agent".into())
            .spawn(move || run_agent(window, config, fail_after))?;

        // Run the UI (and map an error to an anyhow::Error).
        self.ui.run().map_err(|e| e.into())
    }
}

fn fail_after() -> anyhow::Result<Option<u32>> {
    match std::env::var(FAIL_AFTER_VAR) {
        Ok(raw) => Ok(Some(raw.parse().map_err(|e| {
            anyhow::anyhow!("{FAIL_AFTER_VAR} must be a number of samples: {e}")
        })?)),
        Err(_) => Ok(None),
    }
}

/// Use the Adafruit IO account from the environment, or an in-process feed
/// service if there is none.
fn feed_service(memory: &MemoryFeeds) -> Box<dyn FeedApi + Send> {
    match Credentials::from_env() {
        Some(credentials) => {
            info!("Publishing to Adafruit IO as `{}`", credentials.username);
            Box::new(AdafruitIo::new(UreqTransport::default(), credentials))
        }
        None => {
            warn!(
                "{} or {} not set, publishing to memory",
                Credentials::USERNAME_VAR,
                Credentials::KEY_VAR
            );
            Box::new(memory.clone())
        }
    }
}

/// Build every component, boot the agent and start over after each reset.
fn run_agent(window: slint::Weak<AppWindow>, config: AgentConfig, fail_after: Option<u32>) {
    let memory = MemoryFeeds::new();
    let mut restart = InProcessRestart::default();

    loop {
        let mut sensor = SimulatedSensor::new(SENSOR_INTERVAL);
        if let Some(samples) = fail_after {
            sensor = sensor.fail_after(samples);
        }

        let components = Components {
            source: SensorSource::new(sensor, SystemClock::with_offset_hours(config.tz_offset_hours)),
            display: SlintDisplay::new(window.clone()),
            api: feed_service(&memory),
            sleeper: ThreadSleeper,
            reset: restart,
        };

        let mut supervisor = Supervisor::new(components, config.clone());
        let fault = supervisor.boot();
        info!("Agent stopped: {fault}");

        restart = supervisor.into_components().reset;
    }
}

/// A minimal main function that initializes the App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut app = App::new()?;

    app.run()
}
