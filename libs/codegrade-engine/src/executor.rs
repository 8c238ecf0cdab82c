/// Submission Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Take an `ExecutionRequest` through admission, workspace, harness,
/// compile, per-test execution and evaluation, and always answer with an
/// `ExecutionResponse`.
///
/// **Architecture:**
/// 1. Wait for an admission slot (queue.rs)
/// 2. Synthesize the harness (harness/)
/// 3. Create a workspace and write the sources (workspace.rs)
/// 4. Compile once, then run every test case in order (engine.rs / remote.rs)
/// 5. Judge each output (evaluator.rs)
/// 6. Release the workspace for delayed deletion
///
/// This module is the glue layer. Submission-level failures (no harness,
/// compile error, workspace error) become `success=false`; per-test failures
/// stay inside their own result.

use crate::config::{LanguageConfig, LanguageConfigManager};
use crate::engine::{ProcessRunner, ProcessTracker};
use crate::error::{EngineError, EngineResult};
use crate::evaluator::{self, TestExecutionOutput};
use crate::harness::{ApexProgram, CatalogGap, Harness, HarnessRegistry, SourceFile};
use crate::queue::AdmissionQueue;
use crate::remote::RemoteRunner;
use crate::workspace::{Workspace, WorkspaceManager};
use anyhow::Result;
use codegrade_common::config::EngineConfig;
use codegrade_common::types::{ExecutionRequest, ExecutionResponse, ExecutionResult, Language, TestCase};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Safety limits to keep pathological submissions away from the runners
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

pub struct Engine {
    config: EngineConfig,
    languages: LanguageConfigManager,
    registry: HarnessRegistry,
    queue: AdmissionQueue,
    workspaces: Arc<WorkspaceManager>,
    runner: ProcessRunner,
    remote: Option<RemoteRunner>,
}

impl Engine {
    pub fn new(config: EngineConfig, languages: LanguageConfigManager) -> Result<Self> {
        config.validate()?;
        let tracker = Arc::new(ProcessTracker::new());
        let remote = match &config.remote {
            Some(credentials) => Some(RemoteRunner::new(credentials.clone())?),
            None => None,
        };

        Ok(Self {
            queue: AdmissionQueue::new(config.max_concurrent_executions),
            workspaces: Arc::new(WorkspaceManager::new(&config, Arc::clone(&tracker))),
            runner: ProcessRunner::new(tracker, config.max_output_bytes),
            registry: HarnessRegistry::from_catalog(),
            remote,
            languages,
            config,
        })
    }

    /// Engine configured from `CODEGRADE_*` variables and the languages file
    pub fn from_env() -> Result<Self> {
        let config = EngineConfig::from_env()?;
        let languages = LanguageConfigManager::load_default()?;
        Self::new(config, languages)
    }

    pub fn with_registry(mut self, registry: HarnessRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &HarnessRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn workspaces(&self) -> &Arc<WorkspaceManager> {
        &self.workspaces
    }

    /// Languages runnable with the current configuration
    pub fn executable_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| !l.is_remote() || self.remote.is_some())
            .collect()
    }

    pub fn validate_catalog(&self) -> Vec<CatalogGap> {
        self.registry.validate()
    }

    /// Start the periodic workspace and stray-process sweep
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        info!(
            interval_ms = self.config.cleanup_interval_ms,
            retention_ms = self.config.cleanup_retention_ms,
            root = %self.workspaces.root().display(),
            "Starting workspace sweeper"
        );
        Arc::clone(&self.workspaces).spawn_sweeper(self.config.cleanup_interval())
    }

    /// Grade one submission. Never fails: internal errors are reported in
    /// `ExecutionResponse.error`.
    #[instrument(
        skip(self, request),
        fields(
            submission_id = %request.id,
            language = %request.language,
            problem_id = request.problem_id.as_deref().unwrap_or("-"),
        )
    )]
    pub async fn submit_execution(&self, request: ExecutionRequest) -> ExecutionResponse {
        let response = self.queue.enqueue(self.execute(&request)).await;
        info!(
            success = response.success,
            passed = response.passed_count(),
            total = response.total_count(),
            "Submission finished"
        );
        response
    }

    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResponse {
        match self.try_execute(request).await {
            Ok(results) => ExecutionResponse::completed(results),
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "Submission failed");
                ExecutionResponse::failed(e.kind(), e.headline(), e.detail())
            }
        }
    }

    async fn try_execute(&self, request: &ExecutionRequest) -> EngineResult<Vec<ExecutionResult>> {
        check_limits(request)?;

        let synthesized =
            self.registry
                .synthesize(request.language, request.problem_id.as_deref(), &request.code)?;
        let structured = synthesized.structured_output();

        if request.test_cases.is_empty() {
            return Ok(Vec::new());
        }

        match &synthesized.harness {
            Harness::Local { files } => self.run_local(request, files, structured).await,
            Harness::Remote(program) => self.run_remote(request, program, structured).await,
        }
    }

    async fn run_local(
        &self,
        request: &ExecutionRequest,
        files: &[SourceFile],
        structured: bool,
    ) -> EngineResult<Vec<ExecutionResult>> {
        let language = self.language_config(request)?;
        let workspace = self.workspaces.create().await?;
        let outcome = self
            .run_in_workspace(&workspace, language, request, files, structured)
            .await;
        self.workspaces.release(workspace);
        outcome
    }

    async fn run_in_workspace(
        &self,
        workspace: &Workspace,
        language: &LanguageConfig,
        request: &ExecutionRequest,
        files: &[SourceFile],
        structured: bool,
    ) -> EngineResult<Vec<ExecutionResult>> {
        // The entry file goes where the configured commands expect it
        for (i, file) in files.iter().enumerate() {
            let name = if i == 0 { &language.source_file } else { &file.name };
            workspace.write_file(name, &file.contents).await?;
        }

        self.runner
            .compile(workspace, language, self.config.compile_timeout())
            .await?;

        let mut results = Vec::with_capacity(request.test_cases.len());
        for (i, test_case) in request.test_cases.iter().enumerate() {
            let output = self
                .runner
                .run(workspace, language, &test_case.input, self.config.execution_timeout())
                .await;
            results.push(judge(i + 1, test_case, &output, structured));
        }
        Ok(results)
    }

    async fn run_remote(
        &self,
        request: &ExecutionRequest,
        program: &ApexProgram,
        structured: bool,
    ) -> EngineResult<Vec<ExecutionResult>> {
        let remote = self.remote.as_ref().ok_or_else(|| EngineError::Remote {
            detail: format!("{} requires remote execution credentials", request.language),
        })?;

        let mut results = Vec::with_capacity(request.test_cases.len());
        for (i, test_case) in request.test_cases.iter().enumerate() {
            let output = remote.run(program, &test_case.input).await?;
            results.push(judge(i + 1, test_case, &output, structured));
        }
        Ok(results)
    }

    fn language_config(&self, request: &ExecutionRequest) -> EngineResult<&LanguageConfig> {
        self.languages
            .get_config(&request.language)
            .map_err(|e| harness_error(request, e.to_string()))
    }
}

fn judge(
    index: usize,
    test_case: &TestCase,
    output: &TestExecutionOutput,
    structured: bool,
) -> ExecutionResult {
    let result = evaluator::evaluate_test(index, test_case, output, structured);
    let error = result.error.as_ref().map(|e| e.kind.to_string());
    info!(
        test_index = index,
        passed = result.passed,
        execution_time_ms = result.execution_time_ms,
        error = error.as_deref().unwrap_or("-"),
        "Test case judged"
    );
    result
}

fn harness_error(request: &ExecutionRequest, reason: String) -> EngineError {
    EngineError::HarnessGeneration {
        language: request.language,
        problem_id: request.problem_id.clone(),
        reason,
    }
}

fn check_limits(request: &ExecutionRequest) -> EngineResult<()> {
    if request.code.len() > MAX_SOURCE_CODE_BYTES {
        return Err(EngineError::InputTooLarge {
            what: "source code",
            limit: MAX_SOURCE_CODE_BYTES,
        });
    }
    if request
        .test_cases
        .iter()
        .any(|t| t.input.len() > MAX_TEST_INPUT_BYTES)
    {
        return Err(EngineError::InputTooLarge {
            what: "test input",
            limit: MAX_TEST_INPUT_BYTES,
        });
    }
    Ok(())
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("languages", &self.languages.list_languages())
            .field("harnesses", &self.registry.len())
            .field("remote", &self.remote.is_some())
            .finish()
    }
}
