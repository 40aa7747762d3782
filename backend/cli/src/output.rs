//! Terminal output: colored notes and response envelope rendering.

use keygate_gateway::CallResponse;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Status line plus one `key  value` row per data entry, keys aligned.
pub fn render_envelope(response: &CallResponse, color: bool) -> String {
    let status = response.status();
    let description = response.description().unwrap_or("");
    let mut out = if color {
        let tint = if response.is_success() { GREEN } else { RED };
        format!("{tint}{BOLD}{status}{RESET} {description}\n")
    } else {
        format!("{status} {description}\n")
    };

    let width = response.data().keys().map(String::len).max().unwrap_or(0);
    for (key, value) in response.data() {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str(&format!("  {key:<width$}  {value}\n"));
    }
    out
}
