use co2_pico_model::FeedHandle;

use crate::error::PublishError;
use crate::feeds::FeedApi;

/// Sends single values to resolved feeds.
///
/// One blocking request per call. Retrying is not the publisher's business.
pub struct Publisher<A> {
    api: A,
}

impl<A: FeedApi> Publisher<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn publish(&mut self, handle: &FeedHandle, value: f64) -> Result<(), PublishError> {
        self.api
            .send_data(&handle.key, value)
            .map_err(|source| PublishError::new(handle.key.as_str(), source))
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn into_inner(self) -> A {
        self.api
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, TransportError};
    use crate::feeds::{FeedCall, MemoryFeeds};

    #[test]
    fn publishes_to_the_handle_key() {
        let feeds = MemoryFeeds::with_feeds(["temperature-pico"]);
        let mut publisher = Publisher::new(feeds.clone());

        publisher
            .publish(&FeedHandle::new("Temperature", "temperature-pico"), 21.5)
            .unwrap();

        assert_eq!(
            feeds.calls(),
            vec![FeedCall::Send("temperature-pico".into(), 21.5)]
        );
    }

    #[test]
    fn failures_keep_transient_and_fatal_apart() {
        let feeds = MemoryFeeds::with_feeds(["co2-pico"]);
        let handle = FeedHandle::new("co2-pico", "co2-pico");
        let mut publisher = Publisher::new(feeds.clone());

        feeds.fail_sends_with(ApiError::Transport(TransportError::Connection(
            "reset by peer".into(),
        )));
        assert!(publisher.publish(&handle, 412.0).unwrap_err().is_transient());

        feeds.fail_sends_with(ApiError::Unauthorized { status: 401 });
        assert_eq!(
            publisher.publish(&handle, 412.0),
            Err(PublishError::Fatal {
                feed: "co2-pico".into(),
                source: ApiError::Unauthorized { status: 401 },
            })
        );

        // no retries
        assert_eq!(feeds.calls().len(), 2);
    }
}
