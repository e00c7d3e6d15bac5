//! Platform independent parts of the CO2 telemetry agent.
//!
//! The desktop simulator and the ESP32 firmware both build a [`Supervisor`]
//! from their own sensor, display, transport and reset implementations.

pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod feeds;
pub mod publisher;
pub mod registry;
pub mod scd30;
pub mod sensor;
pub mod simulated;
pub mod supervisor;
pub mod transport;

pub use config::AgentConfig;
pub use device::{Clock, DeviceReset, Sleeper, SystemClock, ThreadSleeper};
pub use display::{StatusDisplay, FAULT_MESSAGE};
pub use error::{
    ApiError, ConfigError, DisplayError, Fault, FeedResolutionError, PublishError, SensorError,
    SetupError, TransportError,
};
pub use feeds::{AdafruitIo, Credentials, FeedApi, MemoryFeeds};
pub use publisher::Publisher;
pub use registry::FeedRegistry;
pub use scd30::Scd30;
pub use sensor::{Measurement, SampleSource, Sensor, SensorSource};
pub use simulated::SimulatedSensor;
pub use supervisor::{fault_reset, Components, CycleOutcome, Supervisor, SupervisorState};
pub use transport::{HttpResponse, Method, Transport};
