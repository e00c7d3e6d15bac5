use std::io::{self, Read};
use std::time::Duration;

use co2_pico_common::{HttpResponse, Method, Transport, TransportError};

/// [`Transport`] on a blocking `ureq` agent.
///
/// HTTP error statuses are returned as responses, only connection trouble is
/// an error.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.request(&method.to_string(), url);
        for (name, value) in headers {
            request = request.set(name, value);
        }

        let result = match body {
            Some(body) => request.send_bytes(body),
            None => request.call(),
        };

        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => return Err(transport_error(transport)),
        };

        let status = response.status();
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| io_error(&e))?;

        Ok(HttpResponse { status, body })
    }
}

fn io_error(e: &io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
        _ => TransportError::Connection(e.to_string()),
    }
}

fn transport_error(transport: ureq::Transport) -> TransportError {
    use std::error::Error;

    match transport
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
    {
        Some(e) => io_error(e),
        None => TransportError::Connection(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_reported_as_such() {
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "timed out reading response");
        assert_eq!(io_error(&timed_out), TransportError::Timeout);

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(io_error(&refused), TransportError::Connection(_)));
    }
}
