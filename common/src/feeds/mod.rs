mod adafruit;
mod memory;

pub use adafruit::{AdafruitIo, Credentials, DEFAULT_BASE_URL};
pub use memory::{FeedCall, MemoryFeeds};

use co2_pico_model::FeedHandle;

use crate::error::ApiError;

/// The remote feed service.
pub trait FeedApi {
    /// Look up an existing feed. A missing feed is [`ApiError::NotFound`].
    fn get_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError>;

    /// Create a feed with the given key.
    fn create_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError>;

    /// Append one value to a feed.
    fn send_data(&mut self, feed_key: &str, value: f64) -> Result<(), ApiError>;
}

impl<A: FeedApi + ?Sized> FeedApi for Box<A> {
    fn get_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError> {
        (**self).get_feed(key)
    }

    fn create_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError> {
        (**self).create_feed(key)
    }

    fn send_data(&mut self, feed_key: &str, value: f64) -> Result<(), ApiError> {
        (**self).send_data(feed_key, value)
    }
}
