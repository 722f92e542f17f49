//! Server-rendered status page.

use core::fmt::Write;

use crate::config::BridgeConfig;
use crate::status::StatusSnapshot;

const STYLE: &str = "body{font-family:sans-serif;margin:1em;max-width:48em}\
table{border-collapse:collapse;margin-bottom:1em}\
td,th{border:1px solid #ccc;padding:.3em .6em;text-align:left}\
button{margin:.2em}.on{color:#080}.off{color:#a00}";

const SCRIPT: &str = "function post(p){fetch(p,{method:'POST'})\
.then(r=>r.json()).then(j=>{document.getElementById('msg').textContent=JSON.stringify(j);\
setTimeout(()=>location.reload(),1500)})}";

/// Escape text for use inside HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "<span class=on>yes</span>" } else { "<span class=off>no</span>" }
}

fn duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

pub fn render_status_page(status: &StatusSnapshot, config: &BridgeConfig) -> String {
    let mut page = String::with_capacity(4096);
    let dev = &status.device;

    let _ = write!(
        page,
        "<!DOCTYPE html><html><head><meta charset=utf-8>\
         <meta name=viewport content=\"width=device-width\">\
         <meta http-equiv=refresh content=10>\
         <title>{id}</title><style>{STYLE}</style><script>{SCRIPT}</script></head><body>\
         <h1>Dooropener {id}</h1>",
        id = escape(&dev.device_id),
    );

    let online = match status.online {
        Some(true) => "<span class=on>online</span>",
        Some(false) => "<span class=off>offline</span>",
        None => "unknown",
    };
    let _ = write!(
        page,
        "<table><tr><th>Host</th><td>{}</td></tr>\
         <tr><th>Firmware</th><td>{}</td></tr>\
         <tr><th>Uptime</th><td>{}</td></tr>\
         <tr><th>WiFi</th><td>{}</td></tr>\
         <tr><th>Internet</th><td>{} ({} probes)</td></tr>",
        escape(&dev.hostname),
        escape(&dev.firmware_version),
        duration(status.uptime_secs),
        yes_no(status.wifi_connected),
        online,
        status.probe_count,
    );
    if status.offline_secs > 0 {
        let _ = write!(page, "<tr><th>Offline for</th><td>{}</td></tr>", duration(status.offline_secs));
    }
    if let Some(secs) = status.reboot_in_secs {
        let _ = write!(page, "<tr><th>Reboot in</th><td>{}</td></tr>", duration(secs));
    }
    if let Some(reason) = status.reboot_pending {
        let _ = write!(page, "<tr><th>Rebooting</th><td>{reason}</td></tr>");
    }
    if let Some(reason) = status.last_reboot_reason {
        let _ = write!(page, "<tr><th>Last reboot</th><td>{reason}</td></tr>");
    }
    let _ = write!(
        page,
        "<tr><th>Bell</th><td>{} ({} honks)</td></tr>\
         <tr><th>Unsaved changes</th><td>{}</td></tr></table>",
        yes_no(status.bell_sounding),
        status.honk_count,
        yes_no(status.config_dirty),
    );

    page.push_str(
        "<h2>Relays</h2><table><tr><th>#</th><th>Name</th><th>Enabled</th>\
         <th>Active</th><th>Triggers</th><th>Failed calls</th><th>Last</th><th></th></tr>",
    );
    for relay in &status.relays {
        let active = match relay.remaining_ms {
            Some(ms) => format!("<span class=on>{} s left</span>", ms.div_ceil(1000)),
            None => "no".into(),
        };
        let last = relay
            .last_trigger_secs_ago
            .map(|s| format!("{} ago", duration(s)))
            .unwrap_or_else(|| "never".into());
        let n = relay.number;
        let toggle = if relay.enabled { "disable" } else { "enable" };
        let _ = write!(
            page,
            "<tr><td>{n}</td><td>{}</td><td>{}</td><td>{active}</td><td>{}</td><td>{}</td><td>{last}</td>\
             <td><button onclick=\"post('/api/relay/{n}/trigger')\">Trigger</button>\
             <button onclick=\"post('/api/relay/{n}/{toggle}')\">{toggle}</button></td></tr>",
            escape(&relay.name),
            yes_no(relay.enabled),
            relay.trigger_count,
            relay.failed_calls,
        );
    }
    page.push_str("</table>");

    page.push_str(
        "<p><button onclick=\"post('/api/bell')\">Honk</button>\
         <button onclick=\"if(confirm('Reboot?'))post('/api/reboot')\">Reboot</button></p>\
         <p id=msg></p><h2>Configuration</h2><table>",
    );
    for (key, value) in config.entries() {
        let _ = write!(page, "<tr><th>{key}</th><td>{}</td></tr>", escape(&value));
    }
    page.push_str("</table></body></html>");
    page
}
