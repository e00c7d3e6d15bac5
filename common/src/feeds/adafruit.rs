use co2_pico_model::FeedHandle;
use log::debug;
use serde::Serialize;

use crate::error::ApiError;
use crate::feeds::FeedApi;
use crate::transport::{HttpResponse, Method, Transport};

pub const DEFAULT_BASE_URL: &str = "https://io.adafruit.com/api/v2";

/// Account identity for the feed service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub key: String,
}

impl Credentials {
    pub const USERNAME_VAR: &'static str = "AIO_USERNAME";
    pub const KEY_VAR: &'static str = "AIO_KEY";

    /// Read `AIO_USERNAME` and `AIO_KEY` from the environment.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var(Self::USERNAME_VAR).ok()?;
        let key = std::env::var(Self::KEY_VAR).ok()?;

        Some(Self { username, key })
    }
}

#[derive(Serialize)]
struct NewFeed<'a> {
    name: &'a str,
    key: &'a str,
}

#[derive(Serialize)]
struct Datum {
    value: f64,
}

/// Adafruit IO HTTP API (v2) on top of a [`Transport`].
pub struct AdafruitIo<T> {
    transport: T,
    base_url: String,
    credentials: Credentials,
}

impl<T: Transport> AdafruitIo<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self::with_base_url(transport, credentials, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(transport: T, credentials: Credentials, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn feeds_url(&self) -> String {
        format!("{}/{}/feeds", self.base_url, self.credentials.username)
    }

    fn call<B: Serialize>(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse, ApiError> {
        let body = body.map(serde_json::to_vec).transpose()?;
        let headers = [
            ("X-AIO-Key", self.credentials.key.as_str()),
            ("Content-Type", "application/json"),
            ("Accept", "application/json"),
        ];

        debug!("-> {} {}", method, url);
        let response = self
            .transport
            .request(method, url, &headers, body.as_deref())?;
        debug!("<- {}", response.status);

        if response.is_success() {
            Ok(response)
        } else {
            Err(status_error(&response))
        }
    }
}

fn status_error(response: &HttpResponse) -> ApiError {
    match response.status {
        404 => ApiError::NotFound,
        401 | 403 => ApiError::Unauthorized {
            status: response.status,
        },
        429 => ApiError::Throttled,
        500..=599 => ApiError::Server {
            status: response.status,
        },
        status => ApiError::Status {
            status,
            body: response.body_text(),
        },
    }
}

impl<T: Transport> FeedApi for AdafruitIo<T> {
    fn get_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError> {
        let url = format!("{}/{}", self.feeds_url(), key);
        let response = self.call::<()>(Method::Get, &url, None)?;

        Ok(serde_json::from_slice(&response.body)?)
    }

    fn create_feed(&mut self, key: &str) -> Result<FeedHandle, ApiError> {
        let url = self.feeds_url();
        let response = self.call(Method::Post, &url, Some(&NewFeed { name: key, key }))?;

        Ok(serde_json::from_slice(&response.body)?)
    }

    fn send_data(&mut self, feed_key: &str, value: f64) -> Result<(), ApiError> {
        let url = format!("{}/{}/data", self.feeds_url(), feed_key);
        self.call(Method::Post, &url, Some(&Datum { value }))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[derive(Debug, PartialEq)]
    struct Sent {
        method: Method,
        url: String,
        key_header: Option<String>,
        body: Option<serde_json::Value>,
    }

    /// Transport answering every request with the same canned response.
    struct Canned {
        reply: Result<HttpResponse, TransportError>,
        sent: Vec<Sent>,
    }

    impl Canned {
        fn status(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(HttpResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for Canned {
        fn request(
            &mut self,
            method: Method,
            url: &str,
            headers: &[(&str, &str)],
            body: Option<&[u8]>,
        ) -> Result<HttpResponse, TransportError> {
            self.sent.push(Sent {
                method,
                url: url.to_string(),
                key_header: headers
                    .iter()
                    .find(|(name, _)| *name == "X-AIO-Key")
                    .map(|(_, value)| value.to_string()),
                body: body.map(|b| serde_json::from_slice(b).unwrap()),
            });
            self.reply.clone()
        }
    }

    fn client(transport: Canned) -> AdafruitIo<Canned> {
        AdafruitIo::new(
            transport,
            Credentials {
                username: "pvos".into(),
                key: "aio_secret".into(),
            },
        )
    }

    #[test]
    fn get_feed_decodes_record() {
        let mut io = client(Canned::status(
            200,
            r#"{"id": 1, "name": "co2-pico", "key": "co2-pico", "unit_type": null}"#,
        ));

        let handle = io.get_feed("co2-pico").unwrap();
        assert_eq!(handle, FeedHandle::new("co2-pico", "co2-pico"));

        let sent = &io.transport_mut().sent[0];
        assert_eq!(sent.method, Method::Get);
        assert_eq!(sent.url, "https://io.adafruit.com/api/v2/pvos/feeds/co2-pico");
        assert_eq!(sent.key_header.as_deref(), Some("aio_secret"));
        assert_eq!(sent.body, None);
    }

    #[test]
    fn create_feed_posts_name_and_key() {
        let mut io = client(Canned::status(
            201,
            r#"{"name": "humidity-pico", "key": "humidity-pico"}"#,
        ));

        io.create_feed("humidity-pico").unwrap();

        let sent = &io.transport_mut().sent[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "https://io.adafruit.com/api/v2/pvos/feeds");
        assert_eq!(
            sent.body,
            Some(serde_json::json!({"name": "humidity-pico", "key": "humidity-pico"}))
        );
    }

    #[test]
    fn send_data_posts_value() {
        let mut io = client(Canned::status(200, r#"{"id": "0F1", "value": "21.5"}"#));

        io.send_data("temperature-pico", 21.5).unwrap();

        let sent = &io.transport_mut().sent[0];
        assert_eq!(
            sent.url,
            "https://io.adafruit.com/api/v2/pvos/feeds/temperature-pico/data"
        );
        assert_eq!(sent.body, Some(serde_json::json!({"value": 21.5})));
    }

    #[test]
    fn status_codes_map_to_api_errors() {
        let cases = [
            (404, ApiError::NotFound),
            (401, ApiError::Unauthorized { status: 401 }),
            (403, ApiError::Unauthorized { status: 403 }),
            (429, ApiError::Throttled),
            (502, ApiError::Server { status: 502 }),
            (
                400,
                ApiError::Status {
                    status: 400,
                    body: "bad".into(),
                },
            ),
        ];

        for (status, expected) in cases {
            let mut io = client(Canned::status(status, "bad"));
            assert_eq!(io.get_feed("co2-pico"), Err(expected));
        }
    }

    #[test]
    fn timeout_is_a_transport_error() {
        let mut io = client(Canned {
            reply: Err(TransportError::Timeout),
            sent: Vec::new(),
        });

        let error = io.send_data("co2-pico", 412.0).unwrap_err();
        assert_eq!(error, ApiError::Transport(TransportError::Timeout));
        assert!(error.is_transient());
    }

    #[test]
    fn garbage_record_is_a_decode_error() {
        let mut io = client(Canned::status(200, "<html>"));

        assert!(matches!(io.get_feed("co2-pico"), Err(ApiError::Decode(_))));
    }
}
