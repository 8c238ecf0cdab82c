use codegrade_common::types::{ErrorKind, Language};
use std::path::PathBuf;
use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no harness for {language} problem {problem_id:?}: {reason}")]
    HarnessGeneration {
        language: Language,
        problem_id: Option<String>,
        reason: String,
    },

    #[error("compilation failed: {detail}")]
    Compile { detail: String },

    #[error("runtime error: {detail}")]
    Runtime { detail: String },

    #[error("execution timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote execution failed: {detail}")]
    Remote { detail: String },

    #[error("{what} exceeds maximum size of {limit} bytes")]
    InputTooLarge { what: &'static str, limit: usize },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::HarnessGeneration { .. } => ErrorKind::HarnessGenerationError,
            EngineError::Compile { .. } => ErrorKind::CompileError,
            EngineError::Runtime { .. } => ErrorKind::RuntimeError,
            EngineError::Timeout { .. } => ErrorKind::TimeoutError,
            EngineError::Workspace { .. } => ErrorKind::WorkspaceError,
            EngineError::Remote { .. } => ErrorKind::RemoteError,
            EngineError::InputTooLarge { .. } => ErrorKind::HarnessGenerationError,
        }
    }

    /// Human-facing headline used in `ExecutionResponse.error.message`
    pub fn headline(&self) -> &'static str {
        match self {
            EngineError::HarnessGeneration { .. } | EngineError::InputTooLarge { .. } => {
                "Harness Generation Error"
            }
            EngineError::Compile { .. } => "Compilation Error",
            EngineError::Workspace { .. } => "Workspace Error",
            EngineError::Runtime { .. } | EngineError::Timeout { .. } | EngineError::Remote { .. } => {
                "Execution Error"
            }
        }
    }

    /// Raw diagnostic without the variant prefix
    pub fn detail(&self) -> String {
        match self {
            EngineError::Compile { detail }
            | EngineError::Runtime { detail }
            | EngineError::Remote { detail } => detail.clone(),
            other => other.to_string(),
        }
    }

    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Workspace {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(
            EngineError::Compile { detail: "x".into() }.kind(),
            ErrorKind::CompileError
        );
        assert_eq!(EngineError::Timeout { limit_ms: 5 }.kind(), ErrorKind::TimeoutError);
        assert_eq!(
            EngineError::workspace("/tmp/x", std::io::Error::other("ro")).kind(),
            ErrorKind::WorkspaceError
        );
    }

    #[test]
    fn test_detail_strips_prefix() {
        let err = EngineError::Compile {
            detail: "Main.java:3: error: ';' expected".into(),
        };
        assert_eq!(err.detail(), "Main.java:3: error: ';' expected");
        assert_eq!(err.headline(), "Compilation Error");
    }
}
