use std::time::Duration;

use co2_pico_common::{HttpResponse, Method, Transport, TransportError};
use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::Method as HttpMethod;
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::EspIOError;
use esp_idf_svc::sys;
use log::debug;

/// [`Transport`] on the ESP-IDF HTTP client, with TLS through the certificate
/// bundle.
pub struct EspHttpTransport {
    client: HttpClient<EspHttpConnection>,
}

impl EspHttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let connection = EspHttpConnection::new(&Configuration {
            timeout: Some(timeout),
            crt_bundle_attach: Some(sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;

        Ok(Self {
            client: HttpClient::wrap(connection),
        })
    }
}

fn connection_error(e: EspIOError) -> TransportError {
    let code = e.0.code();
    if code == sys::ESP_ERR_TIMEOUT as sys::esp_err_t
        || code == sys::ESP_ERR_HTTP_EAGAIN as sys::esp_err_t
    {
        TransportError::Timeout
    } else {
        TransportError::Connection(e.to_string())
    }
}

impl Transport for EspHttpTransport {
    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, TransportError> {
        let method = match method {
            Method::Get => HttpMethod::Get,
            Method::Post => HttpMethod::Post,
        };

        let content_length = body.map(|body| body.len().to_string());
        let mut all_headers = headers.to_vec();
        if let Some(length) = &content_length {
            all_headers.push(("content-length", length));
        }

        let mut request = self
            .client
            .request(method, url, &all_headers)
            .map_err(connection_error)?;
        if let Some(body) = body {
            request.write_all(body).map_err(connection_error)?;
            request.flush().map_err(connection_error)?;
        }

        let mut response = request.submit().map_err(connection_error)?;
        let status = response.status();

        let mut body = Vec::new();
        let mut buf = [0u8; 512];
        loop {
            let read = response.read(&mut buf).map_err(connection_error)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&buf[..read]);
        }
        debug!("<- {} ({} bytes)", status, body.len());

        Ok(HttpResponse { status, body })
    }
}
