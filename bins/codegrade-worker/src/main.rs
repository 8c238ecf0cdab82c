use codegrade_common::types::{ErrorKind, ExecutionRequest, ExecutionResponse};
use codegrade_engine::Engine;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// One line of worker output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(flatten)]
    response: ExecutionResponse,
}

/// Decode one input line, or the response that rejects it
fn parse_request(line: &str) -> Result<ExecutionRequest, ResponseLine> {
    serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "Rejected malformed request line");
        ResponseLine {
            id: None,
            response: ExecutionResponse::failed(ErrorKind::InvalidRequest, "Invalid Request", e.to_string()),
        }
    })
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("CODEGRADE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // stdout carries responses, logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Codegrade worker booting...");

    let engine = Engine::from_env().map_err(|e| {
        error!("Failed to configure engine: {:#}", e);
        e
    })?;
    info!(
        max_concurrent = engine.config().max_concurrent_executions,
        root = %engine.config().execution_root_dir.display(),
        languages = ?engine.executable_languages(),
        "Engine configured"
    );

    let gaps = engine.validate_catalog();
    if !gaps.is_empty() {
        for gap in &gaps {
            warn!(problem_id = gap.problem_id, language = %gap.language, "Catalog gap");
        }
    }

    let engine = Arc::new(engine);
    let sweeper = engine.start_sweeper();

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        warn!("Received shutdown signal, abandoning in-flight submissions");
    };

    tokio::select! {
        result = serve(Arc::clone(&engine)) => {
            if let Err(e) = result {
                error!(error = %e, "Worker loop failed");
            }
        }
        _ = shutdown => {}
    }

    sweeper.abort();
    info!("Worker shutdown complete");
    Ok(())
}

/// Read JSONL requests from stdin and answer each on stdout as it finishes
#[instrument(skip(engine))]
async fn serve(engine: Arc<Engine>) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ResponseLine>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            let mut bytes = match serde_json::to_vec(&line) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(error = %e, "Failed to serialize response");
                    continue;
                }
            };
            bytes.push(b'\n');
            if let Err(e) = stdout.write_all(&bytes).await {
                error!(error = %e, "Failed to write response");
                break;
            }
            if let Err(e) = stdout.flush().await {
                warn!(error = %e, "Failed to flush response");
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = match parse_request(&line) {
            Ok(request) => request,
            Err(rejection) => {
                if tx.send(rejection).is_err() {
                    warn!("Response writer closed");
                }
                continue;
            }
        };

        info!(
            submission_id = %request.id,
            language = %request.language,
            test_cases = request.test_cases.len(),
            source_size = request.code.len(),
            "Received submission"
        );

        let engine = Arc::clone(&engine);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let id = request.id;
            let response = engine.submit_execution(request).await;
            if tx.send(ResponseLine { id: Some(id), response }).is_err() {
                warn!(submission_id = %id, "Response writer closed");
            }
        });

        // reap finished submissions without blocking intake
        while let Some(done) = in_flight.try_join_next() {
            if let Err(e) = done {
                error!(error = %e, "Submission task panicked");
            }
        }
    }

    debug!(remaining = in_flight.len(), "Input closed, draining submissions");
    while let Some(done) = in_flight.join_next().await {
        if let Err(e) = done {
            error!(error = %e, "Submission task panicked");
        }
    }

    drop(tx);
    writer.await?;
    Ok(())
}
