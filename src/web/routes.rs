//! Request router for the local web interface.
//!
//! [`ApiRouter::handle`] maps an [`ApiRequest`] to an [`ApiResponse`]
//! without doing any I/O, so every route is testable on the host.
//!
//! | Method | Path                         | Effect                           |
//! |--------|------------------------------|----------------------------------|
//! | GET    | `/`                          | HTML status page                 |
//! | GET    | `/api/status`                | JSON status snapshot             |
//! | GET    | `/api/config`                | JSON config (secrets masked)     |
//! | POST   | `/api/config`                | apply key/value patch            |
//! | POST   | `/api/bell`                  | honk                             |
//! | POST   | `/api/relay/{n}/trigger`     | virtual press                    |
//! | POST   | `/api/relay/{n}/enable`      | start listening on relay `n`     |
//! | POST   | `/api/relay/{n}/disable`     | stop listening on relay `n`      |
//! | POST   | `/api/reboot`                | restart                          |
//!
//! Every POST spends a token from the [`ActionLimiter`] (`429` when empty)
//! and is answered `202` once queued, `503` if the mailbox is full.

use core::time::Duration;

use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::app::commands::AppCommand;
use crate::app::mailbox::CommandMailbox;
use crate::config::{validate_config, BridgeConfig, SECRET_KEYS};
use crate::relay::RelayId;

use super::{html, lock_state, ActionLimiter, SharedState};

/// Largest request body the router accepts.
pub const MAX_BODY_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Other,
}

#[derive(Debug, Clone, Copy)]
pub struct ApiRequest<'a> {
    pub method: HttpMethod,
    /// Request target; a query string is ignored.
    pub path: &'a str,
    pub body: &'a [u8],
}

impl<'a> ApiRequest<'a> {
    pub fn get(path: &'a str) -> Self {
        Self { method: HttpMethod::Get, path, body: &[] }
    }

    pub fn post(path: &'a str, body: &'a [u8]) -> Self {
        Self { method: HttpMethod::Post, path, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    pub fn json(status: u16, value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, content_type: "application/json", body },
            Err(_) => Self::error(500, "serialization failed"),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: json!({ "error": message }).to_string(),
        }
    }

    pub fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body }
    }

    fn accepted(action: &str) -> Self {
        Self::json(202, &json!({ "accepted": action }))
    }
}

enum Route {
    Page,
    Status,
    Config,
    Bell,
    Relay(RelayId, RelayOp),
    Reboot,
}

#[derive(Clone, Copy)]
enum RelayOp {
    Trigger,
    Enable,
    Disable,
}

fn parse_route(path: &str) -> Option<Route> {
    let path = path.split('?').next().unwrap_or(path);
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
    match path {
        "/" => Some(Route::Page),
        "/api/status" => Some(Route::Status),
        "/api/config" => Some(Route::Config),
        "/api/bell" => Some(Route::Bell),
        "/api/reboot" => Some(Route::Reboot),
        _ => {
            let rest = path.strip_prefix("/api/relay/")?;
            let (number, op) = rest.split_once('/')?;
            let relay = number.parse::<u8>().ok().and_then(RelayId::from_number)?;
            let op = match op {
                "trigger" => RelayOp::Trigger,
                "enable" => RelayOp::Enable,
                "disable" => RelayOp::Disable,
                _ => return None,
            };
            Some(Route::Relay(relay, op))
        }
    }
}

/// Apply a JSON object of `key → value` to a copy of `base`.
///
/// All-or-nothing: the first unknown key, unparsable value or failed range
/// check rejects the whole patch.  A secret whose value is only asterisks
/// is the masked value echoed back from `GET /api/config` and is skipped.
pub fn apply_config_patch(base: &BridgeConfig, body: &[u8]) -> Result<BridgeConfig, String> {
    let patch: Map<String, Value> =
        serde_json::from_slice(body).map_err(|e| format!("body must be a JSON object: {e}"))?;
    if patch.is_empty() {
        return Err("no keys given".into());
    }

    let mut cfg = base.clone();
    for (key, value) in &patch {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            _ => return Err(format!("{key}: value must be a string, number or boolean")),
        };
        if SECRET_KEYS.contains(&key.as_str()) && !text.is_empty() && text.bytes().all(|b| b == b'*') {
            continue;
        }
        cfg.set(key, &text).map_err(|e| e.to_string())?;
    }
    validate_config(&cfg).map_err(|e| e.to_string())?;
    Ok(cfg)
}

pub struct ApiRouter {
    limiter: ActionLimiter,
}

impl Default for ApiRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRouter {
    pub fn new() -> Self {
        Self { limiter: ActionLimiter::default() }
    }

    /// Router whose rate limiter runs on `clock`.
    pub fn with_clock(clock: fn() -> Duration) -> Self {
        Self { limiter: ActionLimiter::new(clock) }
    }

    pub fn handle(
        &mut self,
        req: &ApiRequest<'_>,
        state: &SharedState,
        mailbox: &CommandMailbox,
    ) -> ApiResponse {
        let Some(route) = parse_route(req.path) else {
            return ApiResponse::error(404, "not found");
        };

        match (route, req.method) {
            (Route::Page, HttpMethod::Get) => {
                let st = lock_state(state);
                ApiResponse::html(html::render_status_page(&st.status, &st.config))
            }
            (Route::Status, HttpMethod::Get) => ApiResponse::json(200, &lock_state(state).status),
            (Route::Config, HttpMethod::Get) => {
                let entries: Map<String, Value> = lock_state(state)
                    .config
                    .entries()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v)))
                    .collect();
                ApiResponse::json(200, &entries)
            }
            (Route::Config, HttpMethod::Post) => self.update_config(req.body, state, mailbox),
            (Route::Bell, HttpMethod::Post) => self.queue(mailbox, AppCommand::Honk, "honk"),
            (Route::Reboot, HttpMethod::Post) => self.queue(mailbox, AppCommand::Reboot, "reboot"),
            (Route::Relay(relay, RelayOp::Trigger), HttpMethod::Post) => {
                self.queue(mailbox, AppCommand::TriggerRelay(relay), "trigger")
            }
            (Route::Relay(relay, op), HttpMethod::Post) => {
                let enabled = matches!(op, RelayOp::Enable);
                let action = if enabled { "enable" } else { "disable" };
                let response = self.queue(mailbox, AppCommand::SetRelayEnabled(relay, enabled), action);
                if response.status == 202 {
                    // A config patch posted before the loop republishes must see this.
                    lock_state(state).config.relay_mut(relay).enabled = enabled;
                }
                response
            }
            _ => ApiResponse::error(405, "method not allowed"),
        }
    }

    fn queue(&mut self, mailbox: &CommandMailbox, cmd: AppCommand, action: &str) -> ApiResponse {
        if !self.limiter.allow() {
            warn!("web: {} rate limited", action);
            return ApiResponse::error(429, "too many requests");
        }
        match mailbox.post(cmd) {
            Ok(()) => {
                info!("web: {} queued", action);
                ApiResponse::accepted(action)
            }
            Err(_) => {
                warn!("web: command queue full, {} dropped", action);
                ApiResponse::error(503, "command queue full")
            }
        }
    }

    fn update_config(
        &mut self,
        body: &[u8],
        state: &SharedState,
        mailbox: &CommandMailbox,
    ) -> ApiResponse {
        if body.len() > MAX_BODY_BYTES {
            return ApiResponse::error(413, "body too large");
        }
        let base = lock_state(state).config.clone();
        let cfg = match apply_config_patch(&base, body) {
            Ok(cfg) => cfg,
            Err(msg) => {
                warn!("web: config rejected: {}", msg);
                return ApiResponse::error(400, &msg);
            }
        };

        let response = self.queue(mailbox, AppCommand::UpdateConfig(cfg.clone()), "config");
        if response.status == 202 {
            // Later patches build on this one before the loop republishes.
            lock_state(state).config = cfg;
        }
        response
    }
}
