//! Feedback normalizer - raw sandbox output to structured ExecutionResult
//!
//! Pure and total: identical (stdout, stderr, exit_code) input always yields
//! an identical result, independent of call order. The caller attaches the
//! measured duration afterwards.

use lazy_static::lazy_static;
use regex::Regex;

use crate::classifier::match_signatures;
use crate::types::{ErrorTag, ExecutionResult};

lazy_static! {
    /// Last `SomethingError: message` line in stderr yields the short message.
    static ref ERROR_LINE: Regex = Regex::new(r"(\w+Error|\w+Exception): (.+)").unwrap();

    /// Screenshot artifacts the script reported on stdout.
    static ref SCREENSHOT_PATH: Regex = Regex::new(r"/screenshots/[\w_.]+\.png").unwrap();
}

/// How many trailing stderr lines to keep as the stack-trace excerpt.
const TRACE_EXCERPT_LINES: usize = 10;

/// Normalize raw captured output into a structured [`ExecutionResult`].
pub fn normalize(stdout: &str, stderr: &str, exit_code: i32) -> ExecutionResult {
    let error_type = match_signatures(stdout, stderr)
        .map(ErrorTag::from)
        .or_else(|| (exit_code != 0).then_some(ErrorTag::Unknown));

    let mut error_message = None;
    let mut stack_trace = None;
    if stderr.contains("Traceback") {
        let lines: Vec<&str> = stderr.trim().lines().collect();
        let start = lines.len().saturating_sub(TRACE_EXCERPT_LINES);
        stack_trace = Some(lines[start..].join("\n"));
        if let Some(caps) = ERROR_LINE.captures_iter(stderr).last() {
            error_message = Some(caps[2].to_string());
        }
    }

    let screenshot_paths = SCREENSHOT_PATH
        .find_iter(stdout)
        .map(|found| found.as_str().to_string())
        .collect();

    ExecutionResult {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code,
        error_type,
        error_message,
        stack_trace,
        screenshot_paths,
        duration_seconds: None,
    }
}
