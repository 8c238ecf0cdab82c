/// Result Evaluator - Language-Agnostic Judging
///
/// **Core Responsibility:**
/// Compare raw execution outputs against expected outputs and classify
/// failures.
///
/// **Critical Properties:**
/// - Knows nothing about processes, workspaces or remote APIs
/// - Pure functions: (execution output, test case) → verdict
///
/// **Normalization Rules:**
/// - Trim leading and trailing whitespace
/// - Collapse every internal whitespace run (spaces, tabs, newlines) to one space
/// - Case sensitive, no numeric tolerance
///
/// **Classification Priority:**
/// 1. Missing entry point (harness marker on stderr)
/// 2. Remote transport failure
/// 3. Runtime error
/// 4. Timeout
/// 5. Output comparison (a mismatch is `passed=false` with no error)

use crate::harness::entry::MISSING_ENTRY_POINT;
use codegrade_common::types::{ErrorKind, ExecutionResult, TestCase, TestError};

/// Raw execution output for a single test case.
/// Produced by the runners, consumed by the evaluator.
#[derive(Debug, Clone, Default)]
pub struct TestExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: f64,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub runtime_error: bool,
    /// The remote API could not be reached or refused the credential
    pub remote_failure: bool,
}

impl TestExecutionOutput {
    pub fn runtime_failure(detail: impl Into<String>, execution_time_ms: f64) -> Self {
        Self {
            stderr: detail.into(),
            execution_time_ms,
            runtime_error: true,
            ..Default::default()
        }
    }
}

/// Trim and collapse whitespace runs to a single space
pub fn normalize(output: &str) -> String {
    output.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-insensitive, otherwise exact comparison
pub fn compare(actual: &str, expected: &str) -> bool {
    normalize(actual) == normalize(expected)
}

/// JSON value equality when both sides parse, `compare` otherwise.
/// Only used for outputs whose printed form is JSON-like.
pub fn compare_structured(actual: &str, expected: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(actual.trim()),
        serde_json::from_str::<serde_json::Value>(expected.trim()),
    ) {
        (Ok(a), Ok(e)) => a == e,
        _ => compare(actual, expected),
    }
}

/// Failure classification for one test case, `None` when it ran cleanly
pub fn classify(output: &TestExecutionOutput) -> Option<TestError> {
    let marker = output
        .stderr
        .lines()
        .map(str::trim_end)
        .find(|l| l.starts_with(MISSING_ENTRY_POINT));
    if let Some(line) = marker {
        return Some(TestError {
            kind: ErrorKind::MissingEntryPoint,
            detail: line.to_string(),
        });
    }

    if output.remote_failure {
        return Some(TestError {
            kind: ErrorKind::RemoteError,
            detail: output.stderr.trim().to_string(),
        });
    }

    if output.runtime_error {
        let detail = if output.stderr.trim().is_empty() {
            match output.exit_code {
                Some(code) => format!("process exited with status {}", code),
                None => "process terminated abnormally".to_string(),
            }
        } else {
            output.stderr.trim().to_string()
        };
        return Some(TestError {
            kind: ErrorKind::RuntimeError,
            detail,
        });
    }

    if output.timed_out {
        return Some(TestError {
            kind: ErrorKind::TimeoutError,
            detail: if output.stderr.trim().is_empty() {
                "execution timed out".to_string()
            } else {
                output.stderr.trim().to_string()
            },
        });
    }

    None
}

/// Evaluate a single test case execution output.
///
/// `index` is the 1-based position of the test case in the submission.
pub fn evaluate_test(
    index: usize,
    test_case: &TestCase,
    output: &TestExecutionOutput,
    structured: bool,
) -> ExecutionResult {
    let error = classify(output);
    let passed = error.is_none()
        && if structured {
            compare_structured(&output.stdout, &test_case.expected_output)
        } else {
            compare(&output.stdout, &test_case.expected_output)
        };

    ExecutionResult {
        index,
        description: test_case.description.clone(),
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output: output.stdout.trim().to_string(),
        passed,
        execution_time_ms: output.execution_time_ms,
        error,
    }
}
