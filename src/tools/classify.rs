use serde::{Deserialize, Serialize};

use crate::error::FailureReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeClass {
    SuccessWithFindings,
    SuccessNoFindings,
    PartialSuccess,
    Timeout,
    ExecutionError,
}

const SIGPIPE_EXIT: i32 = 141;

/// Map (exit code, stdout, stderr, findings emitted, timed-out marker) to a
/// typed outcome (spec.md §4.7). `EXECUTED_NO_SIGNAL` is never a success:
/// `SuccessNoFindings` and `ExecutionError` are both distinct, both
/// non-fatal, and both show up in the execution log (spec.md §4.7 closing
/// rule, P1/P10).
pub fn classify(
    exit_code: i32,
    stdout: &[u8],
    stderr: &[u8],
    findings_emitted: usize,
    timed_out: bool,
) -> (OutcomeClass, Option<FailureReason>) {
    if timed_out {
        return (OutcomeClass::Timeout, None);
    }

    if exit_code == SIGPIPE_EXIT && !stdout.is_empty() {
        return (OutcomeClass::PartialSuccess, None);
    }

    if exit_code == 0 {
        return if findings_emitted > 0 {
            (OutcomeClass::SuccessWithFindings, None)
        } else {
            (OutcomeClass::SuccessNoFindings, None)
        };
    }

    (OutcomeClass::ExecutionError, Some(classify_failure(stderr)))
}

fn classify_failure(stderr: &[u8]) -> FailureReason {
    let text = String::from_utf8_lossy(stderr).to_lowercase();

    if text.contains("command not found") || text.contains("no such file or directory") {
        FailureReason::ToolNotInstalled
    } else if text.contains("permission denied") {
        FailureReason::PermissionDenied
    } else if text.contains("could not resolve")
        || text.contains("connection refused")
        || text.contains("no route to host")
        || text.contains("network is unreachable")
        || text.contains("timed out")
    {
        FailureReason::TargetUnreachable
    } else if text.contains("usage:") || text.contains("invalid option") || text.contains("unrecognized argument") {
        FailureReason::InvalidArguments
    } else if text.contains("internal server error") || text.contains("502") || text.contains("503") {
        FailureReason::RemoteError
    } else {
        FailureReason::UnknownError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_zero_with_findings_is_success_with_findings() {
        let (class, _) = classify(0, b"ok", b"", 3, false);
        assert_eq!(class, OutcomeClass::SuccessWithFindings);
    }

    #[test]
    fn exit_zero_no_findings() {
        let (class, _) = classify(0, b"ok", b"", 0, false);
        assert_eq!(class, OutcomeClass::SuccessNoFindings);
    }

    #[test]
    fn sigpipe_with_stdout_is_partial_success() {
        let (class, _) = classify(141, b"partial output", b"", 1, false);
        assert_eq!(class, OutcomeClass::PartialSuccess);
    }

    #[test]
    fn sigpipe_with_empty_stdout_is_execution_error() {
        let (class, _) = classify(141, b"", b"broken pipe", 0, false);
        assert_eq!(class, OutcomeClass::ExecutionError);
    }

    #[test]
    fn timeout_marker_wins_regardless_of_exit_code() {
        let (class, reason) = classify(0, b"ok", b"", 5, true);
        assert_eq!(class, OutcomeClass::Timeout);
        assert!(reason.is_none());
    }

    #[test]
    fn nonzero_empty_stdout_is_execution_error_with_reason() {
        let (class, reason) = classify(127, b"", b"bash: nuclei: command not found", 0, false);
        assert_eq!(class, OutcomeClass::ExecutionError);
        assert_eq!(reason, Some(FailureReason::ToolNotInstalled));
    }

    #[test]
    fn target_unreachable_detected_from_stderr() {
        let (_, reason) = classify(1, b"", b"curl: Connection refused", 0, false);
        assert_eq!(reason, Some(FailureReason::TargetUnreachable));
    }
}
