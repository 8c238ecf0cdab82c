use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Languages the engine knows how to grade.
///
/// `Apex` has no local toolchain and is executed through the remote runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    Cpp,
    Apex,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Java,
        Language::JavaScript,
        Language::Cpp,
        Language::Apex,
    ];

    /// Languages executed through a remote API instead of a local process
    pub fn is_remote(&self) -> bool {
        matches!(self, Language::Apex)
    }

    /// Languages that need a local compile step before the first test case
    pub fn is_compiled(&self) -> bool {
        matches!(self, Language::Java | Language::Cpp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Cpp => "cpp",
            Language::Apex => "apex",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage(pub String);

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown language: {}", self.0)
    }
}

impl std::error::Error for UnknownLanguage {}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            "apex" => Ok(Language::Apex),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub description: String,
}

/// A submission as handed to the engine. Immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub problem_id: Option<String>,
    pub test_cases: Vec<TestCase>,
}

impl ExecutionRequest {
    pub fn new(
        code: impl Into<String>,
        language: Language,
        problem_id: Option<&str>,
        test_cases: Vec<TestCase>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            language,
            problem_id: problem_id.map(str::to_string),
            test_cases,
        }
    }
}

/// Failure classification shared by per-test errors and response-level errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    HarnessGenerationError,
    CompileError,
    RuntimeError,
    TimeoutError,
    WorkspaceError,
    MissingEntryPoint,
    RemoteError,
    /// A request line the worker could not decode
    InvalidRequest,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::HarnessGenerationError => "HarnessGenerationError",
            ErrorKind::CompileError => "CompileError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::TimeoutError => "TimeoutError",
            ErrorKind::WorkspaceError => "WorkspaceError",
            ErrorKind::MissingEntryPoint => "MissingEntryPoint",
            ErrorKind::RemoteError => "RemoteError",
            ErrorKind::InvalidRequest => "InvalidRequest",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestError {
    pub kind: ErrorKind,
    pub detail: String,
}

/// Verdict for one test case. `index` is 1-based and follows submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub index: usize,
    pub description: String,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
    pub detail: String,
    pub kind: ErrorKind,
}

/// Outcome of a whole submission.
///
/// `success == false` means the submission could not be evaluated at all and
/// carries no partial results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ExecutionResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ExecutionResponse {
    pub fn completed(results: Vec<ExecutionResult>) -> Self {
        Self {
            success: true,
            results: Some(results),
            error: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            results: None,
            error: Some(ResponseError {
                message: message.into(),
                detail: detail.into(),
                kind,
            }),
        }
    }

    /// Number of passing test cases; callers use this for scoring
    pub fn passed_count(&self) -> usize {
        self.results
            .as_ref()
            .map(|results| results.iter().filter(|r| r.passed).count())
            .unwrap_or(0)
    }

    pub fn total_count(&self) -> usize {
        self.results.as_ref().map(Vec::len).unwrap_or(0)
    }
}
