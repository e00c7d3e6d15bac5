use co2_pico_model::{FeedHandle, FeedSpec, Metric};
use log::{info, warn};

use crate::error::{ApiError, FeedResolutionError};
use crate::feeds::FeedApi;

struct Entry {
    metric: Metric,
    remote_key: String,
    handle: FeedHandle,
}

/// Resolved feed handles by logical metric name.
///
/// Filled once during startup. A handle stays valid for the lifetime of the
/// process; there is no refresh.
#[derive(Default)]
pub struct FeedRegistry {
    entries: Vec<Entry>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the remote feed `remote_key`, created when the feed service
    /// does not know it yet.
    ///
    /// Only [`ApiError::NotFound`] leads to a create. Every other lookup error
    /// is returned as is, and nothing is cached.
    pub fn resolve<A: FeedApi + ?Sized>(
        &mut self,
        api: &mut A,
        metric: Metric,
        remote_key: &str,
    ) -> Result<FeedHandle, FeedResolutionError> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.metric == metric && e.remote_key == remote_key)
        {
            return Ok(entry.handle.clone());
        }

        let handle = match api.get_feed(remote_key) {
            Ok(handle) => handle,
            Err(ApiError::NotFound) => {
                warn!("Feed `{remote_key}` does not exist, creating it");
                api.create_feed(remote_key)
                    .map_err(|source| FeedResolutionError::Create {
                        key: remote_key.to_string(),
                        source,
                    })?
            }
            Err(source) => {
                return Err(FeedResolutionError::Lookup {
                    key: remote_key.to_string(),
                    source,
                })
            }
        };

        info!("Feed `{}` resolved to `{}`", metric, handle.key);
        self.entries.retain(|e| e.metric != metric);
        self.entries.push(Entry {
            metric,
            remote_key: remote_key.to_string(),
            handle: handle.clone(),
        });

        Ok(handle)
    }

    /// Resolve every feed of `feeds`, in table order.
    pub fn resolve_all<A: FeedApi + ?Sized>(
        &mut self,
        api: &mut A,
        feeds: &[FeedSpec],
    ) -> Result<(), FeedResolutionError> {
        for spec in feeds {
            self.resolve(api, spec.metric, &spec.remote_key)?;
        }
        Ok(())
    }

    /// Handle for the logical name, e.g. `"co2"`.
    pub fn get(&self, logical_name: &str) -> Option<&FeedHandle> {
        self.entries
            .iter()
            .find(|e| e.metric.name() == logical_name)
            .map(|e| &e.handle)
    }

    /// Resolved feeds in the order they were resolved.
    pub fn handles(&self) -> impl Iterator<Item = (Metric, &FeedHandle)> {
        self.entries.iter().map(|e| (e.metric, &e.handle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::feeds::{FeedCall, MemoryFeeds};
    use co2_pico_model::DEFAULT_FEEDS;

    #[test]
    fn missing_feed_is_created_once() {
        let mut api = MemoryFeeds::new();
        let mut registry = FeedRegistry::new();

        let handle = registry.resolve(&mut api, Metric::Co2, "co2-pico").unwrap();

        assert_eq!(handle.key, "co2-pico");
        assert_eq!(api.create_count("co2-pico"), 1);
    }

    #[test]
    fn existing_feed_is_not_created() {
        let mut api = MemoryFeeds::with_feeds(["co2-pico"]);
        let mut registry = FeedRegistry::new();

        registry.resolve(&mut api, Metric::Co2, "co2-pico").unwrap();

        assert_eq!(api.calls(), vec![FeedCall::Get("co2-pico".into())]);
    }

    #[test]
    fn other_lookup_errors_propagate_without_create() {
        let failures = [
            ApiError::Unauthorized { status: 401 },
            ApiError::Throttled,
            ApiError::Transport(TransportError::Timeout),
        ];

        for failure in failures {
            let mut api = MemoryFeeds::new();
            api.fail_lookups_with(failure.clone());
            let mut registry = FeedRegistry::new();

            let error = registry
                .resolve(&mut api, Metric::Co2, "co2-pico")
                .unwrap_err();

            assert_eq!(
                error,
                FeedResolutionError::Lookup {
                    key: "co2-pico".into(),
                    source: failure,
                }
            );
            assert_eq!(api.create_count("co2-pico"), 0);
            assert!(registry.is_empty());
        }
    }

    #[test]
    fn create_failure_is_reported_as_create() {
        let mut api = MemoryFeeds::new();
        api.fail_creates_with(ApiError::Unauthorized { status: 403 });
        let mut registry = FeedRegistry::new();

        let error = registry
            .resolve(&mut api, Metric::Humidity, "humidity-pico")
            .unwrap_err();

        assert!(matches!(error, FeedResolutionError::Create { .. }));
        assert_eq!(error.api_error(), &ApiError::Unauthorized { status: 403 });
    }

    #[test]
    fn resolve_all_keeps_table_order() {
        let mut api = MemoryFeeds::with_feeds(["temperature-pico"]);
        let mut registry = FeedRegistry::new();

        registry.resolve_all(&mut api, &DEFAULT_FEEDS).unwrap();

        let keys: Vec<_> = registry
            .handles()
            .map(|(metric, handle)| (metric, handle.key.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Metric::Co2, "co2-pico"),
                (Metric::Temperature, "temperature-pico"),
                (Metric::Humidity, "humidity-pico"),
            ]
        );
        assert_eq!(registry.get("humidity").unwrap().key, "humidity-pico");
        assert_eq!(api.create_count("temperature-pico"), 0);
    }
}
