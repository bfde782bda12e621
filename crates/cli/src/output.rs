//! Command output
//!
//! Human-readable lines go to stderr; with `--json` a single envelope (or,
//! for `watch`, one event per line) goes to stdout instead.

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::{json, Value};
use sidesnap_core::ExitCode;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    json: bool,
    quiet: bool,
}

impl Output {
    pub fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Progress line, hidden by `--json` and `--quiet`
    pub fn info(&self, message: impl AsRef<str>) {
        if self.json || self.quiet {
            return;
        }
        eprintln!("{}", message.as_ref());
    }

    pub fn success_line(&self, message: impl AsRef<str>) {
        if self.json || self.quiet {
            return;
        }
        eprintln!("{}", message.as_ref().green());
    }

    /// Error line; always shown
    pub fn error(&self, message: impl AsRef<str>) {
        eprintln!("{} {}", "error:".red().bold(), message.as_ref());
    }

    /// Final envelope for a successful command
    pub fn finish<T: Serialize>(&self, code: ExitCode, data: &T) {
        if self.json {
            print_json_line(&envelope_ok(code, data));
        }
    }

    /// Final envelope for a failed command
    pub fn fail(&self, code: ExitCode, message: &str) {
        if self.json {
            print_json_line(&envelope_error(code, message));
        } else {
            self.error(message);
        }
    }

    /// Non-fatal error inside a streaming command
    pub fn error_event(&self, code: ExitCode, message: &str) {
        if self.json {
            self.event("error", &json!({ "code": code.as_i32(), "message": message }));
        } else {
            self.error(message);
        }
    }

    /// One JSON line for a streaming command
    pub fn event<T: Serialize>(&self, event: &str, data: &T) {
        if self.json {
            print_json_line(&json!({ "event": event, "data": data }));
        }
    }
}

pub fn envelope_ok<T: Serialize>(code: ExitCode, data: &T) -> Value {
    json!({ "status": "ok", "code": code.as_i32(), "data": data })
}

pub fn envelope_error(code: ExitCode, message: &str) -> Value {
    json!({ "status": "error", "code": code.as_i32(), "message": message })
}

fn print_json_line(value: &Value) {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = writeln!(lock, "{}", value);
    let _ = lock.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let value = envelope_ok(ExitCode::NoChanges, &json!({ "kept": 2 }));
        assert_eq!(value["status"], "ok");
        assert_eq!(value["code"], 10);
        assert_eq!(value["data"]["kept"], 2);
    }

    #[test]
    fn test_error_envelope() {
        let value = envelope_error(ExitCode::Locked, "another process holds the lock");
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], 12);
        assert_eq!(value["message"], "another process holds the lock");
        assert!(value.get("data").is_none());
    }
}
