//! HTTP client adapter for actor switch calls and connectivity probes.
//!
//! On the device every request opens a fresh [`EspHttpConnection`] (TLS via
//! the ESP-IDF certificate bundle), reads the status line and drains a
//! bounded amount of body so the socket closes cleanly.  On the host the
//! adapter answers from a canned status so the binary can run in simulation.

use crate::app::ports::{HttpClientPort, HttpError};

#[cfg(target_os = "espidf")]
use log::{debug, warn};

/// Upper bound on body bytes drained per response.
#[cfg(target_os = "espidf")]
const MAX_DRAIN_BYTES: usize = 4096;

/// Reject URLs the client cannot fetch before touching the network.
pub fn check_url(url: &str) -> Result<(), HttpError> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or(HttpError::InvalidUrl)?;
    if rest.is_empty() || rest.starts_with('/') || rest.chars().any(char::is_whitespace) {
        return Err(HttpError::InvalidUrl);
    }
    Ok(())
}

pub struct HttpClientAdapter {
    timeout_ms: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_status: Result<u16, HttpError>,
}

impl HttpClientAdapter {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            #[cfg(not(target_os = "espidf"))]
            sim_status: Ok(200),
        }
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Simulation: answer every subsequent request with `status`.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_status(&mut self, status: Result<u16, HttpError>) {
        self.sim_status = status;
    }
}

#[cfg(target_os = "espidf")]
impl HttpClientPort for HttpClientAdapter {
    fn get(&mut self, url: &str) -> Result<u16, HttpError> {
        use core::time::Duration;
        use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
        use esp_idf_svc::http::Method;
        use esp_idf_svc::io::Read;

        check_url(url)?;

        let config = HttpConfig {
            timeout: Some(Duration::from_millis(u64::from(self.timeout_ms))),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut conn = EspHttpConnection::new(&config).map_err(|e| {
            warn!("http: connection setup failed: {:?}", e);
            HttpError::Connect
        })?;

        conn.initiate_request(Method::Get, url, &[]).map_err(|e| {
            debug!("http: request to {} failed: {:?}", url, e);
            HttpError::Connect
        })?;
        conn.initiate_response().map_err(|e| {
            debug!("http: no response from {}: {:?}", url, e);
            HttpError::Timeout
        })?;

        let status = conn.status();

        let mut buf = [0u8; 256];
        let mut drained = 0;
        while drained < MAX_DRAIN_BYTES {
            match conn.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => drained += n,
                Err(e) => {
                    debug!("http: body read from {} aborted: {:?}", url, e);
                    break;
                }
            }
        }

        Ok(status)
    }
}

#[cfg(not(target_os = "espidf"))]
impl HttpClientPort for HttpClientAdapter {
    fn get(&mut self, url: &str) -> Result<u16, HttpError> {
        check_url(url)?;
        log::info!("http(sim): GET {} ({} ms timeout)", url, self.timeout_ms);
        self.sim_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_scheme_checked() {
        assert!(check_url("http://10.0.0.5/relay?turn=on").is_ok());
        assert!(check_url("https://google.de").is_ok());
        assert_eq!(check_url(""), Err(HttpError::InvalidUrl));
        assert_eq!(check_url("ftp://host/"), Err(HttpError::InvalidUrl));
        assert_eq!(check_url("http://"), Err(HttpError::InvalidUrl));
        assert_eq!(check_url("http://a b/"), Err(HttpError::InvalidUrl));
    }

    #[test]
    fn sim_answers_canned_status() {
        let mut http = HttpClientAdapter::new(1_000);
        assert_eq!(http.get("http://actor/on"), Ok(200));
        http.set_sim_status(Err(HttpError::Timeout));
        assert_eq!(http.get("http://actor/on"), Err(HttpError::Timeout));
        assert_eq!(http.get("not a url"), Err(HttpError::InvalidUrl));
    }
}
