//! Exception report construction.

use std::backtrace::BacktraceStatus;
use std::time::Duration;

use hookshot_core::hash::rollup_hash;
use hookshot_core::{HookError, HookService, Mapping};
use serde::{Serialize, Serializer};

/// Longest message forwarded to the collector, in characters.
pub const MAX_MESSAGE_CHARS: usize = 255;

/// Most backtrace frames forwarded to the collector.
pub const MAX_BACKTRACE_FRAMES: usize = 501;

/// Frames from these modules belong to error/backtrace plumbing and are
/// skipped when picking the frame that identifies a failure site.
const PLUMBING_PREFIXES: &[&str] = &["std::", "core::", "anyhow::", "<anyhow::", "alloc::"];

/// Request context attached to a report.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportContext<'a> {
    pub event: Option<&'a str>,
    pub data: Option<&'a Mapping>,
    pub payload: Option<&'a Mapping>,
    /// Set only for slow-hook reports.
    pub duration: Option<Duration>,
}

/// A single failure as sent to the diagnostics collector.
///
/// Field names on the wire follow the collector's schema (`class`,
/// `rollup`, `service`, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionReport {
    pub app: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "class")]
    pub error_class: String,
    pub server: String,
    pub message: String,
    #[serde(rename = "backtrace", serialize_with = "serialize_frames")]
    pub frames: Vec<String>,
    #[serde(rename = "rollup")]
    pub rollup_hash: String,
    #[serde(rename = "service")]
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl ExceptionReport {
    /// Build a report for `error` raised by `service`.
    ///
    /// Wrapped failures are reported by their innermost cause, and grouped
    /// by its type plus the failure site: the panic location for panics,
    /// otherwise the first non-plumbing backtrace frame. Request data
    /// and payload are only included for the diagnostic service; reports
    /// for every other service carry metadata only.
    #[must_use]
    pub fn build(
        app: &str,
        server: &str,
        service: &dyn HookService,
        error: &HookError,
        ctx: &ReportContext<'_>,
    ) -> Self {
        let error_class = error.root_class();
        let frames = error
            .backtrace()
            .filter(|bt| bt.status() == BacktraceStatus::Captured)
            .map(|bt| parse_frames(&bt.to_string()))
            .unwrap_or_default();
        let site = error.location().unwrap_or_else(|| top_frame(&frames));
        let rollup = rollup_hash(&error_class, site);

        let (service_data, payload) = if service.is_diagnostic() {
            (ctx.data.map(to_json), ctx.payload.map(to_json))
        } else {
            (None, None)
        };

        Self {
            app: app.to_string(),
            kind: "exception",
            error_class,
            server: server.to_string(),
            message: truncate_chars(&error.original().to_string(), MAX_MESSAGE_CHARS),
            frames,
            rollup_hash: rollup,
            service_name: service.hook_name().to_string(),
            service_data,
            event: ctx.event.map(str::to_string),
            payload,
            duration: ctx.duration.map(|d| format!("{}s", d.as_secs_f64())),
        }
    }

    /// Frames joined the way they are sent on the wire.
    #[must_use]
    pub fn backtrace(&self) -> String {
        self.frames.join("\n")
    }
}

fn serialize_frames<S: Serializer>(frames: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&frames.join("\n"))
}

fn to_json(map: &Mapping) -> String {
    serde_json::Value::Object(map.clone()).to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Parse the `Display` form of a captured `std::backtrace::Backtrace` into
/// one entry per frame (`symbol (file:line:col)`), keeping at most
/// [`MAX_BACKTRACE_FRAMES`].
fn parse_frames(text: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.push_str(" (");
                last.push_str(location);
                last.push(')');
            }
        } else if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                if frames.len() == MAX_BACKTRACE_FRAMES {
                    break;
                }
                frames.push(symbol.to_string());
            }
        }
    }
    frames
}

fn top_frame(frames: &[String]) -> &str {
    frames
        .iter()
        .find(|f| !PLUMBING_PREFIXES.iter().any(|p| f.starts_with(p)))
        .or_else(|| frames.first())
        .map_or("", String::as_str)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
