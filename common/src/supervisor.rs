//! The acquisition/publish loop and its reset policy.
//!
//! Every cycle polls the sample source once. A new sample is pushed to the
//! trend, shown on the display and published to all resolved feeds. Any
//! fault ends the loop in [`SupervisorState::FaultReset`]: the fault is
//! logged, a fault message is displayed and the device is reset after a fixed
//! delay. There is no other recovery path.

use std::time::Duration;

use co2_pico_model::{Metric, Sample, TrendBuffer};
use log::{error, info, warn};

use crate::config::AgentConfig;
use crate::device::{DeviceReset, Sleeper};
use crate::display::{StatusDisplay, FAULT_MESSAGE};
use crate::error::{DisplayError, Fault, PublishError};
use crate::feeds::FeedApi;
use crate::publisher::Publisher;
use crate::registry::FeedRegistry;
use crate::sensor::SampleSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Sampling,
    Rendering,
    Publishing,
    FaultReset,
}

/// Result of one completed cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    NoData,
    Published(Sample),
}

/// Everything the loop talks to, constructed by the platform.
pub struct Components<S, D, A, Z, R> {
    pub source: S,
    pub display: D,
    pub api: A,
    pub sleeper: Z,
    pub reset: R,
}

/// Log `fault`, show the fault message, wait `delay` and reset.
///
/// Shared by the loop and by platform setup code that fails before a
/// [`Supervisor`] exists.
pub fn fault_reset<D, Z, R>(
    display: &mut D,
    sleeper: &mut Z,
    reset: &mut R,
    delay: Duration,
    fault: &Fault,
) where
    D: StatusDisplay + ?Sized,
    Z: Sleeper + ?Sized,
    R: DeviceReset + ?Sized,
{
    error!("Error: {fault}");
    if let Err(e) = display.show_fault(FAULT_MESSAGE) {
        warn!("Could not show fault on display: {e}");
    }
    info!("Resetting device in {} seconds", delay.as_secs());
    sleeper.sleep(delay);
    reset.reset();
}

pub struct Supervisor<S, D, A, Z, R> {
    source: S,
    display: D,
    publisher: Publisher<A>,
    sleeper: Z,
    reset: R,
    registry: FeedRegistry,
    trend: TrendBuffer,
    config: AgentConfig,
    state: SupervisorState,
    last_fault: Option<Fault>,
}

impl<S, D, A, Z, R> Supervisor<S, D, A, Z, R>
where
    S: SampleSource,
    D: StatusDisplay,
    A: FeedApi,
    Z: Sleeper,
    R: DeviceReset,
{
    pub fn new(components: Components<S, D, A, Z, R>, config: AgentConfig) -> Self {
        let Components {
            source,
            display,
            api,
            sleeper,
            reset,
        } = components;

        Self {
            source,
            display,
            publisher: Publisher::new(api),
            sleeper,
            reset,
            registry: FeedRegistry::new(),
            trend: TrendBuffer::new(config.trend_capacity),
            config,
            state: SupervisorState::Idle,
            last_fault: None,
        }
    }

    /// Startup: splash screen, then resolve every feed of the configured
    /// table, creating missing ones.
    pub fn start(&mut self) -> Result<(), Fault> {
        self.display.show_status(&self.config.splash_text)?;
        self.sleeper.sleep(self.config.splash_duration());

        info!("Resolving {} feeds", self.config.feeds.len());
        self.registry
            .resolve_all(self.publisher.api_mut(), &self.config.feeds)?;
        self.display.show_status("")?;

        Ok(())
    }

    /// Start and run until a fault has reset the device.
    ///
    /// Only returns on hosts where [`DeviceReset::reset`] returns.
    pub fn boot(&mut self) -> Fault {
        if let Err(fault) = self.start() {
            self.enter_fault_reset(fault.clone());
            return fault;
        }

        self.run()
    }

    /// Run cycles separated by the fixed cycle interval until one faults.
    ///
    /// The interval does not account for the time a cycle took, and missed
    /// cycles are not caught up.
    pub fn run(&mut self) -> Fault {
        if let Some(fault) = &self.last_fault {
            return fault.clone();
        }

        loop {
            match self.run_cycle() {
                Ok(_) => self.sleeper.sleep(self.config.cycle_interval()),
                Err(fault) => {
                    self.enter_fault_reset(fault.clone());
                    return fault;
                }
            }
        }
    }

    /// One pass Sampling → Rendering → Publishing → Idle.
    ///
    /// On error the supervisor is left in `FaultReset`; the delay and reset
    /// are up to [`Supervisor::run`].
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, Fault> {
        let outcome = self.cycle();
        self.state = match &outcome {
            Ok(_) => SupervisorState::Idle,
            Err(_) => SupervisorState::FaultReset,
        };
        outcome
    }

    fn cycle(&mut self) -> Result<CycleOutcome, Fault> {
        self.state = SupervisorState::Sampling;
        let Some(sample) = self.source.poll()? else {
            return Ok(CycleOutcome::NoData);
        };

        info!("CO2: {} PPM", sample.gas_ppm);
        info!("Temp: {} C", sample.temperature_c);
        info!("Humidity: {} %rH", sample.humidity_pct);
        info!("Waiting for new data...");

        self.state = SupervisorState::Rendering;
        self.render(&sample)?;

        self.state = SupervisorState::Publishing;
        self.publish(&sample)?;

        Ok(CycleOutcome::Published(sample))
    }

    fn render(&mut self, sample: &Sample) -> Result<(), DisplayError> {
        self.display.set_auto_refresh(false)?;

        self.trend.push(sample.gas_ppm);
        let snapshot = self.trend.snapshot();
        let updated = self
            .display
            .show_status(&sample.co2_label())
            .and_then(|()| self.display.show_trend(&snapshot));

        let resumed = self.display.set_auto_refresh(true);
        updated.and(resumed)
    }

    fn publish(&mut self, sample: &Sample) -> Result<(), PublishError> {
        for (metric, handle) in self.registry.handles() {
            let value = metric.value(sample);
            if metric == Metric::Co2 {
                info!("Sending {} to co2 feed...", value);
            }
            self.publisher.publish(handle, value)?;
        }
        info!("Data sent!");
        Ok(())
    }

    fn enter_fault_reset(&mut self, fault: Fault) {
        self.state = SupervisorState::FaultReset;
        let fault = self.last_fault.insert(fault);
        fault_reset(
            &mut self.display,
            &mut self.sleeper,
            &mut self.reset,
            self.config.reset_delay(),
            fault,
        );
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// The fault that caused the reset, if any.
    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    pub fn trend(&self) -> &TrendBuffer {
        &self.trend
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    /// Tear the supervisor down into its components.
    pub fn into_components(self) -> Components<S, D, A, Z, R> {
        Components {
            source: self.source,
            display: self.display,
            api: self.publisher.into_inner(),
            sleeper: self.sleeper,
            reset: self.reset,
        }
    }
}
