//! Deterministic outcome classifier - zero LLM calls, zero I/O
//!
//! The oracle the whole retry loop pivots on: a run succeeded if and only if
//! the script printed the literal success marker to stdout.

use crate::types::{ExecutionResult, FailureType};

/// Literal token a script must print to stdout to assert the bug was
/// confirmed. Anything else is non-reproduction regardless of exit code.
pub const SUCCESS_MARKER: &str = "REPRODUCED";

/// First matching content signature, in fixed order.
///
/// Shared with the feedback normalizer so classification can be re-run
/// against a bare ExecutionResult without re-deriving the whole record.
pub fn match_signatures(stdout: &str, stderr: &str) -> Option<FailureType> {
    if stderr.contains("NoSuchElementException") {
        return Some(FailureType::ElementNotFound);
    }
    if stderr.contains("TimeoutException") {
        return Some(FailureType::Timeout);
    }
    if stderr.contains("AssertionError") {
        return Some(FailureType::AssertionError);
    }
    if stdout.contains("ConnectionRefused")
        || stderr.contains("ConnectionRefused")
        || stdout.contains("5xx")
        || stderr.contains("5xx")
    {
        return Some(FailureType::NetworkError);
    }
    None
}

/// Classify an execution outcome as success or a typed failure.
pub fn classify(result: &ExecutionResult) -> (bool, Option<FailureType>) {
    if result.stdout.contains(SUCCESS_MARKER) {
        return (true, None);
    }
    let failure =
        match_signatures(&result.stdout, &result.stderr).unwrap_or(FailureType::Unknown);
    (false, Some(failure))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stdout: &str, stderr: &str, exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
            ..Default::default()
        }
    }

    #[test]
    fn test_marker_wins_regardless_of_stderr() {
        let (success, failure) = classify(&result(
            "Step 6: Checking for error message\nREPRODUCED\n",
            "WARNING: devtools listening\nTraceback (most recent call last):\n",
            0,
        ));
        assert!(success);
        assert!(failure.is_none());
    }

    #[test]
    fn test_assertion_failure_classification() {
        let (success, failure) = classify(&result("step 1\n", "AssertionError: expected error banner\n", 1));
        assert!(!success);
        assert_eq!(failure, Some(FailureType::AssertionError));
    }

    #[test]
    fn test_signature_order_element_before_timeout() {
        let stderr = "NoSuchElementException while waiting\nTimeoutException: gave up\n";
        assert_eq!(
            match_signatures("", stderr),
            Some(FailureType::ElementNotFound)
        );
    }

    #[test]
    fn test_network_signature_on_either_stream() {
        assert_eq!(
            match_signatures("ConnectionRefused\n", ""),
            Some(FailureType::NetworkError)
        );
        assert_eq!(
            match_signatures("", "server replied 5xx\n"),
            Some(FailureType::NetworkError)
        );
    }

    #[test]
    fn test_no_signature_falls_back_to_unknown() {
        let (success, failure) = classify(&result("nothing interesting\n", "", 1));
        assert!(!success);
        assert_eq!(failure, Some(FailureType::Unknown));
    }
}
