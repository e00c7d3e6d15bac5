//! Data model shared by the CO2 Pico agent and its platform front-ends.
//!
//! Nothing in here talks to hardware or the network: samples, the trend
//! history that drives the local plot, and the description of the remote
//! feeds every sample is published to.

mod feed;
mod sample;
mod trend;

pub use feed::{FeedHandle, FeedSpec, Metric, DEFAULT_FEEDS};
pub use sample::Sample;
pub use trend::{normalize, TrendBuffer};

/// Default number of CO2 values kept for the trend plot.
pub const DEFAULT_TREND_CAPACITY: usize = 100;
