use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use co2_pico_model::FeedHandle;

use crate::error::ApiError;
use crate::feeds::FeedApi;

/// A request received by [`MemoryFeeds`].
#[derive(Clone, Debug, PartialEq)]
pub enum FeedCall {
    Get(String),
    Create(String),
    Send(String, f64),
}

#[derive(Default)]
struct State {
    feeds: BTreeMap<String, Vec<f64>>,
    calls: Vec<FeedCall>,
    lookup_failure: Option<ApiError>,
    create_failure: Option<ApiError>,
    send_failure: Option<ApiError>,
}

/// Feed service kept in process memory.
///
/// Stands in for the remote service when no account is configured. Clones
/// share the same feeds, so one clone can be handed to the agent and another
/// kept to look at what was published.
#[derive(Clone, Default)]
pub struct MemoryFeeds(Arc<Mutex<State>>);

impl MemoryFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service that already has a feed for each of `keys`.
    pub fn with_feeds<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let feeds = Self::new();
        {
            let mut state = feeds.state();
            for key in keys {
                state.feeds.insert(key.to_string(), Vec::new());
            }
        }
        feeds
    }

    /// Make every lookup of an existing or missing feed fail with `error`.
    pub fn fail_lookups_with(&self, error: ApiError) {
        self.state().lookup_failure = Some(error);
    }

    pub fn fail_creates_with(&self, error: ApiError) {
        self.state().create_failure = Some(error);
    }

    pub fn fail_sends_with(&self, error: ApiError) {
        self.state().send_failure = Some(error);
    }

    /// All requests received so far, in order.
    pub fn calls(&self) -> Vec<FeedCall> {
        self.state().calls.clone()
    }

    pub fn create_count(&self, key: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, FeedCall::Create(k) if k == key))
            .count()
    }

    /// Values published to `key`, oldest first.
    pub fn values(&self, key: &str) -> Vec<f64> {
        self.state().feeds.get(key).cloned().unwrap_or_default()
    }

    pub fn has_feed(&self, key: &str) -> bool {
        self.state().feeds.contains_key(key)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FeedApi for MemoryFeeds {
    fn get_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError> {
        let mut state = self.state();
        state.calls.push(FeedCall::Get(key.to_string()));

        if let Some(error) = &state.lookup_failure {
            return Err(error.clone());
        }
        if state.feeds.contains_key(key) {
            Ok(FeedHandle::new(key, key))
        } else {
            Err(ApiError::NotFound)
        }
    }

    fn create_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError> {
        let mut state = self.state();
        state.calls.push(FeedCall::Create(key.to_string()));

        if let Some(error) = &state.create_failure {
            return Err(error.clone());
        }
        state.feeds.entry(key.to_string()).or_default();
        Ok(FeedHandle::new(key, key))
    }

    fn send_data(&mut self, feed_key: &str, value: f64) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(FeedCall::Send(feed_key.to_string(), value));

        if let Some(error) = &state.send_failure {
            return Err(error.clone());
        }
        match state.feeds.get_mut(feed_key) {
            Some(values) => {
                values.push(value);
                Ok(())
            }
            None => Err(ApiError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_feeds() {
        let observer = MemoryFeeds::new();
        let mut service = observer.clone();

        assert_eq!(service.get_feed("co2-pico"), Err(ApiError::NotFound));
        service.create_feed("co2-pico").unwrap();
        service.send_data("co2-pico", 412.0).unwrap();

        assert_eq!(observer.values("co2-pico"), vec![412.0]);
        assert_eq!(observer.create_count("co2-pico"), 1);
    }

    #[test]
    fn sending_to_a_missing_feed_fails() {
        let mut service = MemoryFeeds::new();

        assert_eq!(service.send_data("nope", 1.0), Err(ApiError::NotFound));
    }
}
