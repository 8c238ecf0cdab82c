/// Remote Process Runner - Network-Backed Execution
///
/// **Core Responsibility:**
/// Execute anonymous Apex through the remote tooling API instead of a local
/// process, producing the same raw outputs the local runner does.
///
/// **Credential Cache:**
/// - One shared access token with an expiry timestamp
/// - Reused while more than `REFRESH_MARGIN` remains before expiry
/// - Check, refresh and write all happen under one async mutex, so callers
///   arriving during a refresh wait for it instead of issuing their own
/// - A 401 from the API drops the cached token
///
/// **Outcome Mapping:**
/// - `compiled=false` → `Compile` (fails the whole submission)
/// - `success=false` → runtime error
/// - request timeout → timeout, other transport failures → remote error
/// - otherwise stdout is the `USER_DEBUG` lines of the returned log

use crate::error::{EngineError, EngineResult};
use crate::evaluator::TestExecutionOutput;
use crate::harness::entry::MISSING_ENTRY_POINT;
use crate::harness::ApexProgram;
use chrono::{DateTime, Utc};
use codegrade_common::config::RemoteCredentials;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Tokens are refreshed once less than this remains
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);
/// Lifetime assumed for a freshly issued token
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

lazy_static! {
    static ref USER_DEBUG: Regex = Regex::new(r"(?m)USER_DEBUG\|.*?\|DEBUG\|(.*?)$").unwrap();
    static ref EXCEPTION_PREFIX: Regex = Regex::new(r"^(?:[A-Za-z_][\w.]*Exception): ").unwrap();
}

#[derive(Debug, Clone)]
struct Credential {
    token: String,
    instance_url: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    fn is_fresh(&self, margin: Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
        self.expires_at - Utc::now() > margin
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnonymousResult {
    compiled: bool,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    compile_problem: Option<String>,
    #[serde(default)]
    exception_message: Option<String>,
    #[serde(default)]
    logs: Option<String>,
}

/// Collect the text of every `System.debug` line in an execution log
pub fn extract_debug_output(logs: &str) -> String {
    USER_DEBUG
        .captures_iter(logs)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Exception messages arrive as `Type: message`; a harness marker thrown by
/// the program is passed on without the type so it opens the line
fn exception_detail(message: String) -> String {
    let marker_start = EXCEPTION_PREFIX
        .find(&message)
        .map(|prefix| prefix.end())
        .filter(|&end| message[end..].starts_with(MISSING_ENTRY_POINT));
    match marker_start {
        Some(end) => message[end..].to_string(),
        None => message,
    }
}

pub struct RemoteRunner {
    client: reqwest::Client,
    credentials: RemoteCredentials,
    cache: Mutex<Option<Credential>>,
    token_lifetime: Duration,
}

impl std::fmt::Debug for RemoteRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRunner")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl RemoteRunner {
    pub fn new(credentials: RemoteCredentials) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EngineError::Remote {
                detail: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            credentials,
            cache: Mutex::new(None),
            token_lifetime: TOKEN_LIFETIME,
        })
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.credentials.request_timeout_ms)
    }

    async fn credential(&self) -> EngineResult<Credential> {
        let mut cache = self.cache.lock().await;
        if let Some(credential) = cache.as_ref().filter(|c| c.is_fresh(REFRESH_MARGIN)) {
            return Ok(credential.clone());
        }
        let fresh = self.fetch_token().await?;
        *cache = Some(fresh.clone());
        Ok(fresh)
    }

    async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn fetch_token(&self) -> EngineResult<Credential> {
        info!(login_url = %self.credentials.login_url, "Authenticating with remote execution API");
        let url = format!("{}/services/oauth2/token", self.credentials.login_url);
        let response = self
            .client
            .post(&url)
            .query(&[
                ("grant_type", "password"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(|e| EngineError::Remote {
                detail: format!("authentication request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let description = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error_description").and_then(|d| d.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(EngineError::Remote {
                detail: format!("authentication failed ({}): {}", status, description),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| EngineError::Remote {
            detail: format!("malformed token response: {}", e),
        })?;
        let lifetime = chrono::Duration::from_std(self.token_lifetime).unwrap_or(chrono::Duration::hours(1));

        Ok(Credential {
            token: token.access_token,
            instance_url: token.instance_url.trim_end_matches('/').to_string(),
            expires_at: Utc::now() + lifetime,
        })
    }

    /// Execute one anonymous body and return its debug output
    pub async fn execute(&self, body: &str) -> EngineResult<String> {
        let credential = self.credential().await?;
        let url = format!(
            "{}/services/data/{}/tooling/executeAnonymous",
            credential.instance_url, self.credentials.api_version
        );

        let response = self
            .client
            .get(&url)
            .query(&[("anonymousBody", body)])
            .bearer_auth(&credential.token)
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout {
                        limit_ms: self.credentials.request_timeout_ms,
                    }
                } else {
                    EngineError::Remote {
                        detail: format!("execute request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("Remote API rejected the cached credential, dropping it");
            self.invalidate().await;
            return Err(EngineError::Remote {
                detail: "remote API rejected the access token".to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Remote {
                detail: format!("remote API returned {}: {}", status, body.trim()),
            });
        }

        let result: AnonymousResult = response.json().await.map_err(|e| EngineError::Remote {
            detail: format!("malformed execute response: {}", e),
        })?;

        if !result.compiled {
            return Err(EngineError::Compile {
                detail: result
                    .compile_problem
                    .unwrap_or_else(|| "Compilation failed".to_string()),
            });
        }
        if !result.success {
            return Err(EngineError::Runtime {
                detail: result
                    .exception_message
                    .map(exception_detail)
                    .unwrap_or_else(|| "Execution failed".to_string()),
            });
        }

        Ok(result.logs.as_deref().map(extract_debug_output).unwrap_or_default())
    }

    /// Run one test case. Only a compile failure is returned as an error;
    /// everything else is folded into the execution output.
    #[instrument(skip(self, program, input))]
    pub async fn run(&self, program: &ApexProgram, input: &str) -> EngineResult<TestExecutionOutput> {
        let body = match program.render(input) {
            Ok(body) => body,
            Err(e) => return Ok(TestExecutionOutput::runtime_failure(e.detail(), 0.0)),
        };

        let start = Instant::now();
        let outcome = self.execute(&body).await;
        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let output = match outcome {
            Ok(stdout) => TestExecutionOutput {
                stdout,
                execution_time_ms,
                exit_code: Some(0),
                ..Default::default()
            },
            Err(EngineError::Compile { detail }) => return Err(EngineError::Compile { detail }),
            Err(EngineError::Runtime { detail }) => TestExecutionOutput::runtime_failure(detail, execution_time_ms),
            Err(EngineError::Timeout { limit_ms }) => TestExecutionOutput {
                stderr: format!("remote execution timed out after {}ms", limit_ms),
                execution_time_ms,
                timed_out: true,
                ..Default::default()
            },
            Err(other) => TestExecutionOutput {
                stderr: other.detail(),
                execution_time_ms,
                remote_failure: true,
                ..Default::default()
            },
        };
        debug!(execution_time_ms, "Remote test execution finished");
        Ok(output)
    }
}
