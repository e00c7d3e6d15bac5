//! Fault taxonomy of the agent.
//!
//! Components return the narrow error of their own layer. The supervisor
//! folds all of them into [`Fault`], which is what triggers a reset.

use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

/// Reading the sensor failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    #[error("sensor bus error: {0:?}")]
    Bus(ErrorKind),

    #[error("sensor checksum mismatch")]
    Checksum,

    #[error("simulated sensor fault: {0}")]
    Simulated(String),
}

/// The request/response transport failed before a response arrived.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Error reported by the remote feed service.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("feed not found")]
    NotFound,

    #[error("not authorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("throttled by the feed service")]
    Throttled,

    #[error("feed service unavailable (HTTP {status})")]
    Server { status: u16 },

    #[error("unexpected response (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed payload: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether repeating the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Throttled | ApiError::Server { .. } | ApiError::Transport(_)
        )
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

/// A feed could not be looked up or created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeedResolutionError {
    #[error("looking up feed `{key}` failed: {source}")]
    Lookup {
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("creating feed `{key}` failed: {source}")]
    Create {
        key: String,
        #[source]
        source: ApiError,
    },
}

impl FeedResolutionError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            FeedResolutionError::Lookup { source, .. } | FeedResolutionError::Create { source, .. } => {
                source
            }
        }
    }
}

/// A value could not be delivered to its feed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PublishError {
    /// Network trouble, timeouts, throttling or a server side outage.
    #[error("transient failure publishing to `{feed}`: {source}")]
    Transient {
        feed: String,
        #[source]
        source: ApiError,
    },

    /// Authentication or protocol problems that waiting will not fix.
    #[error("fatal failure publishing to `{feed}`: {source}")]
    Fatal {
        feed: String,
        #[source]
        source: ApiError,
    },
}

impl PublishError {
    pub fn new(feed: impl Into<String>, source: ApiError) -> Self {
        let feed = feed.into();
        if source.is_transient() {
            PublishError::Transient { feed, source }
        } else {
            PublishError::Fatal { feed, source }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient { .. })
    }

    pub fn api_error(&self) -> &ApiError {
        match self {
            PublishError::Transient { source, .. } | PublishError::Fatal { source, .. } => source,
        }
    }
}

/// The display collaborator rejected an update.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("display error: {0}")]
pub struct DisplayError(pub String);

/// One of the one-shot setup steps failed (network, clock, account).
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{stage} setup failed: {message}")]
pub struct SetupError {
    pub stage: &'static str,
    pub message: String,
}

impl SetupError {
    pub fn new(stage: &'static str, message: impl ToString) -> Self {
        Self {
            stage,
            message: message.to_string(),
        }
    }
}

/// Everything that sends the supervisor into its reset state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Fault {
    #[error("sensor fault: {0}")]
    Sensor(#[from] SensorError),

    #[error("feed resolution fault: {0}")]
    FeedResolution(#[from] FeedResolutionError),

    #[error("publish fault: {0}")]
    Publish(#[from] PublishError),

    #[error("render fault: {0}")]
    Render(#[from] DisplayError),

    #[error("setup fault: {0}")]
    Setup(#[from] SetupError),
}

/// The agent configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid timezone offset `{0}`")]
    TzOffset(String),

    #[error("the feed table is empty")]
    NoFeeds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_errors_are_classified_by_cause() {
        let timeout = PublishError::new("co2-pico", TransportError::Timeout.into());
        assert!(timeout.is_transient());

        let throttled = PublishError::new("co2-pico", ApiError::Throttled);
        assert!(throttled.is_transient());

        let auth = PublishError::new("co2-pico", ApiError::Unauthorized { status: 401 });
        assert!(!auth.is_transient());
        assert_eq!(auth.api_error(), &ApiError::Unauthorized { status: 401 });

        let missing = PublishError::new("co2-pico", ApiError::NotFound);
        assert!(matches!(missing, PublishError::Fatal { .. }));
    }

    #[test]
    fn fault_message_keeps_the_cause() {
        let fault = Fault::from(FeedResolutionError::Lookup {
            key: "co2-pico".into(),
            source: ApiError::Server { status: 503 },
        });

        assert_eq!(
            fault.to_string(),
            "feed resolution fault: looking up feed `co2-pico` failed: \
             feed service unavailable (HTTP 503)"
        );
    }
}
