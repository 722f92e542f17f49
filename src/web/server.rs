//! ESP-IDF HTTP server glue.
//!
//! One wildcard handler per method feeds every request into the shared
//! [`ApiRouter`] and writes the response back.  Handlers run on the
//! server's own task.

use std::sync::{Arc, Mutex};

use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::{Read, Write};
use log::info;

use crate::app::mailbox::CommandMailbox;

use super::routes::{ApiRequest, ApiResponse, ApiRouter, HttpMethod, MAX_BODY_BYTES};
use super::SharedState;

pub fn start(
    state: SharedState,
    mailbox: &'static CommandMailbox,
) -> anyhow::Result<EspHttpServer<'static>> {
    let config = Configuration {
        stack_size: 10240,
        max_uri_handlers: 4,
        uri_match_wildcard: true,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&config)?;
    let router = Arc::new(Mutex::new(ApiRouter::new()));

    for (method, api_method) in [
        (Method::Get, HttpMethod::Get),
        (Method::Post, HttpMethod::Post),
        (Method::Put, HttpMethod::Other),
        (Method::Delete, HttpMethod::Other),
    ] {
        let state = state.clone();
        let router = router.clone();
        server.fn_handler::<anyhow::Error, _>("/*", method, move |mut req| {
            let path = req.uri().to_string();

            let mut body = Vec::new();
            let mut buf = [0u8; 512];
            loop {
                let n = req.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                if body.len() + n > MAX_BODY_BYTES {
                    let resp = ApiResponse::error(413, "body too large");
                    let mut out =
                        req.into_response(resp.status, None, &[("Content-Type", resp.content_type)])?;
                    out.write_all(resp.body.as_bytes())?;
                    return Ok(());
                }
                body.extend_from_slice(&buf[..n]);
            }

            let resp = {
                let mut router = router.lock().unwrap_or_else(|p| p.into_inner());
                router.handle(
                    &ApiRequest { method: api_method, path: &path, body: &body },
                    &state,
                    mailbox,
                )
            };

            let mut out = req.into_response(resp.status, None, &[("Content-Type", resp.content_type)])?;
            out.write_all(resp.body.as_bytes())?;
            Ok(())
        })?;
    }

    info!("web: HTTP server listening on port 80");
    Ok(server)
}
