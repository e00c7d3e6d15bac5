use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Sample;

/// A quantity published for every sample.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Co2,
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Co2, Metric::Temperature, Metric::Humidity];

    /// The logical name, also the first half of the default remote key.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Co2 => "co2",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    /// The value of this metric in `sample`.
    pub fn value(&self, sample: &Sample) -> f64 {
        match self {
            Metric::Co2 => f64::from(sample.gas_ppm),
            Metric::Temperature => f64::from(sample.temperature_c),
            Metric::Humidity => f64::from(sample.humidity_pct),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the feed table: which metric goes to which remote feed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FeedSpec {
    pub metric: Metric,
    pub remote_key: Cow<'static, str>,
}

impl FeedSpec {
    pub const fn new(metric: Metric, remote_key: &'static str) -> Self {
        Self {
            metric,
            remote_key: Cow::Borrowed(remote_key),
        }
    }

    /// Feed table following the `<metric>-<device-class>` naming convention.
    pub fn for_device_class(device_class: &str) -> Vec<FeedSpec> {
        Metric::ALL
            .iter()
            .map(|metric| FeedSpec {
                metric: *metric,
                remote_key: Cow::Owned(format!("{}-{}", metric.name(), device_class)),
            })
            .collect()
    }

    pub fn logical_name(&self) -> &'static str {
        self.metric.name()
    }
}

/// Feeds used by a Pico class device.
pub const DEFAULT_FEEDS: [FeedSpec; 3] = [
    FeedSpec::new(Metric::Co2, "co2-pico"),
    FeedSpec::new(Metric::Temperature, "temperature-pico"),
    FeedSpec::new(Metric::Humidity, "humidity-pico"),
];

/// Local reference to a remote feed that has been looked up or created.
///
/// Deserializes from the feed record returned by the feed service; fields
/// other than `name` and `key` are ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FeedHandle {
    pub name: String,
    pub key: String,
}

impl FeedHandle {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_follows_naming_convention() {
        assert_eq!(FeedSpec::for_device_class("pico"), DEFAULT_FEEDS.to_vec());
    }

    #[test]
    fn metric_values() {
        let sample = Sample::new(412, 21.5, 45.0, chrono::Utc::now().fixed_offset());

        assert_eq!(Metric::Co2.value(&sample), 412.0);
        assert_eq!(Metric::Temperature.value(&sample), 21.5);
        assert_eq!(Metric::Humidity.value(&sample), 45.0);
    }

    #[test]
    fn handle_from_feed_record() {
        let record = r#"{
            "id": 2571348,
            "name": "co2-pico",
            "key": "co2-pico",
            "group": null,
            "last_value": "412"
        }"#;

        let handle: FeedHandle = serde_json::from_str(record).unwrap();
        assert_eq!(handle, FeedHandle::new("co2-pico", "co2-pico"));
    }

    #[test]
    fn feed_spec_from_json() {
        let spec: FeedSpec =
            serde_json::from_str(r#"{"metric": "humidity", "remote_key": "humidity-lab"}"#)
                .unwrap();

        assert_eq!(spec.metric, Metric::Humidity);
        assert_eq!(spec.remote_key, "humidity-lab");
        assert_eq!(spec.logical_name(), "humidity");
    }
}
