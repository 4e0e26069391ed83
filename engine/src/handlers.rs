//! Command handlers for CLI operations
//!
//! - ask: run the pipeline once
//! - plan: show the plan for a query
//! - corpus: list retrievable documents
//! - doctor: check collaborators and configuration

use anyhow::Result;
use sdk::errors::{EngineError, EngineErrorExt};
use sdk::types::{AnswerRecord, ToolOutcome};
use serde_json::json;

use crate::bootstrap::build_engine;
use crate::config::Config;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

pub async fn handle_ask(query: String, config: &Config, format: OutputFormat) -> Result<()> {
    let handle = build_engine(config).await?;
    let record = handle.engine.answer(&query).await;

    match format {
        OutputFormat::Text => print!("{}", render_record(&record)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
    }
    handle.shutdown().await
}

/// Answer first, then one line per tool
pub fn render_record(record: &AnswerRecord) -> String {
    let mut out = format!("{}\n", record.answer);
    if !record.tool_results.is_empty() {
        out.push('\n');
    }
    for result in &record.tool_results {
        let marker = match result.outcome {
            ToolOutcome::Success => "✓",
            ToolOutcome::Degraded => "~",
            ToolOutcome::Failed => "✗",
        };
        match &result.note {
            Some(note) => out.push_str(&format!(
                "  {} {:<8} {} ({})\n",
                marker, result.tool, result.outcome, note
            )),
            None => out.push_str(&format!(
                "  {} {:<8} {}\n",
                marker, result.tool, result.outcome
            )),
        }
    }
    out
}

/// Error text for the terminal, with a hint when the cause is an engine error
pub fn error_report(err: &anyhow::Error) -> String {
    let mut out = format!("Error: {:#}", err);
    if let Some(engine_err) = err.downcast_ref::<EngineError>() {
        out.push_str(&format!("\nHint: {}", engine_err.user_hint()));
        if engine_err.is_recoverable() {
            out.push_str("\nThis is usually transient; try again.");
        }
    }
    out
}

pub async fn handle_plan(query: String, config: &Config, format: OutputFormat) -> Result<()> {
    let handle = build_engine(config).await?;
    let plan = handle.engine.plan_for(&query).await;

    match format {
        OutputFormat::Text => {
            println!("Plan ({} steps, from {}):", plan.steps.len(), plan.source);
            if plan.is_empty() {
                println!("  (empty, no tools will run)");
            }
            for (i, step) in plan.steps.iter().enumerate() {
                let params: Vec<String> = step
                    .params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                println!("  {}. {} {}", i + 1, step.tool, params.join(" "));
            }
            for note in &plan.notes {
                println!("  note: {}", note);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    handle.shutdown().await
}

pub async fn handle_corpus(config: &Config, format: OutputFormat) -> Result<()> {
    let handle = build_engine(config).await?;
    let documents = handle.engine.retriever().documents();

    match format {
        OutputFormat::Text => {
            if documents.is_empty() {
                println!("No documents. Is {} populated?", config.fleet.data_dir.display());
            }
            for doc in documents {
                println!("[{}] {:<6} {}", doc.source_kind, doc.id, doc.text);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(documents)?),
    }
    handle.shutdown().await
}

/// Validate configuration and check collaborators
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration".into(), "Valid".into()));

    if config.fleet.data_dir.exists() {
        checks.push(("Fleet data directory".into(), "Exists".into()));
    } else {
        checks.push(("Fleet data directory".into(), "Missing".into()));
        issues.push(format!(
            "Fleet data directory does not exist: {}",
            config.fleet.data_dir.display()
        ));
    }

    let handle = match build_engine(config).await {
        Ok(handle) => handle,
        Err(e) => {
            checks.push(("Engine".into(), "Failed to start".into()));
            issues.push(format!("{:#}", e));
            return print_doctor(&checks, &issues, format);
        }
    };

    checks.push((
        "Fleet snapshot".into(),
        format!(
            "{} buses, {} routes",
            handle.snapshot.bus_count(),
            handle.snapshot.route_count()
        ),
    ));
    if handle.snapshot.bus_count() == 0 {
        issues.push("Fleet snapshot has no buses; location and ETA questions will fail.".into());
    }
    checks.push((
        "Fleet source".into(),
        handle.collaborators.fleet.name().to_string(),
    ));
    checks.push((
        "Weather provider".into(),
        handle.collaborators.weather.name().to_string(),
    ));
    checks.push(("Cache backend".into(), handle.collaborators.kv.name().to_string()));

    let health = handle.engine.retriever().health();
    checks.push((
        format!("Retrieval index ({})", handle.engine.retriever().embedder_name()),
        if health.index_ready {
            "Ready".into()
        } else {
            "Unavailable (corpus order fallback)".into()
        },
    ));
    if !health.index_ready {
        issues.push("Retrieval index unavailable; context falls back to corpus order.".into());
    }

    match &handle.llm {
        Some(reasoner) => {
            let health = reasoner.router().check_health().await;
            for (name, healthy) in &health {
                checks.push((
                    format!("LLM provider {}", name),
                    (if *healthy { "Available" } else { "Not available" }).to_string(),
                ));
            }
            if !health.iter().any(|(_, healthy)| *healthy) {
                issues.push(
                    "No LLM providers available; planning and answers use the rule-based fallback."
                        .to_string(),
                );
            }
        }
        None => checks.push(("LLM".into(), "Disabled".into())),
    }

    handle.shutdown().await?;
    print_doctor(&checks, &issues, format)
}

fn print_doctor(checks: &[(String, String)], issues: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Transit System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in checks {
                println!("  {:<32} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
