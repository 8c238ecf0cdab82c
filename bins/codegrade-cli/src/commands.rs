// CLI commands for running and inspecting codegrade
use anyhow::{bail, Context, Result};
use codegrade_common::types::{ExecutionRequest, ExecutionResponse, Language, TestCase};
use codegrade_engine::harness::catalog::CATALOG;
use codegrade_engine::harness::HarnessRegistry;
use codegrade_engine::Engine;
use std::fs;
use std::path::Path;

pub async fn run_submission(
    file: &Path,
    language: &str,
    problem: Option<&str>,
    tests: &Path,
    json: bool,
) -> Result<()> {
    let language: Language = language.parse()?;
    let code = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let content = fs::read_to_string(tests)
        .with_context(|| format!("Failed to read {}", tests.display()))?;
    let test_cases: Vec<TestCase> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases in {}", tests.display()))?;

    let engine = Engine::from_env()?;
    let response = engine
        .submit_execution(ExecutionRequest::new(code, language, problem, test_cases))
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_summary(&response);
    }

    if !response.success || response.passed_count() != response.total_count() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(response: &ExecutionResponse) {
    if let Some(error) = &response.error {
        println!("✗ {} ({})", error.message, error.kind);
        println!("{}", error.detail);
        return;
    }

    for result in response.results.iter().flatten() {
        let mark = if result.passed { "✓" } else { "✗" };
        let label = if result.description.is_empty() {
            format!("Test {}", result.index)
        } else {
            format!("Test {} ({})", result.index, result.description)
        };
        println!("{} {} [{:.1} ms]", mark, label, result.execution_time_ms);
        if !result.passed {
            println!("    expected: {}", result.expected_output.trim());
            println!("    actual:   {}", result.actual_output);
            if let Some(error) = &result.error {
                println!("    {}: {}", error.kind, error.detail);
            }
        }
    }
    println!();
    println!("{}/{} passed", response.passed_count(), response.total_count());
}

pub fn list_problems() {
    let registry = HarnessRegistry::from_catalog();
    println!("{:<28} {:<30} Languages", "Id", "Title");
    for problem in CATALOG {
        let languages: Vec<String> = Language::ALL
            .iter()
            .filter(|l| registry.is_registered(**l, problem.id))
            .map(|l| l.to_string())
            .collect();
        println!("{:<28} {:<30} {}", problem.id, problem.title, languages.join(", "));
    }
}

pub async fn sweep() -> Result<()> {
    let engine = Engine::from_env()?;
    let report = engine.workspaces().sweep().await;
    println!(
        "Swept {}: {} removed, {} failed, {} process groups killed",
        engine.workspaces().root().display(),
        report.removed,
        report.failed,
        report.killed
    );
    Ok(())
}

pub fn check_catalog() -> Result<()> {
    let gaps = HarnessRegistry::from_catalog().validate();
    if gaps.is_empty() {
        println!("✓ Every catalog problem has a harness for each of its languages");
        return Ok(());
    }
    for gap in &gaps {
        println!("✗ {}", gap);
    }
    bail!("{} catalog gap(s) found", gaps.len());
}
