//! Command implementations for the adloom CLI.

use adloom::config::AdloomConfig;
use adloom::graph::{CampaignRun, RunEvent, WorkflowRunner, build_campaign_graph};
use adloom::quality;
use adloom::service::{CircuitBreaker, HttpImageService, HttpTextService, ResilientCompleter};
use adloom::state::Brief;
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn load_brief(path: &Path) -> Result<Brief> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read brief file {}", path.display()))?;
    let fields: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)
        .with_context(|| format!("Brief file {} is not a JSON object", path.display()))?;
    Ok(Brief::new(fields))
}

/// `adloom run`: execute a campaign from a JSON brief.
pub async fn cmd_run(
    brief_path: &Path,
    config_path: Option<&Path>,
    output: &Path,
    max_duration: Option<u64>,
    max_revisions: Option<u32>,
) -> Result<()> {
    let mut config = AdloomConfig::load(config_path)?;
    if let Some(secs) = max_duration {
        config.workflow.max_duration_secs = secs;
    }
    if let Some(cap) = max_revisions {
        config.workflow.max_revisions = cap;
    }

    let brief = load_brief(brief_path)?;
    let api_key = AdloomConfig::api_key()?;

    let breaker = Arc::new(CircuitBreaker::new(config.retry.breaker_threshold));
    let completer = ResilientCompleter::new(
        Arc::new(HttpTextService::new(&config.service, api_key.clone())),
        breaker,
        config.retry.policy(),
    );
    let images = Arc::new(HttpImageService::new(&config.service, api_key));

    let graph =
        build_campaign_graph(completer, images).context("workflow configuration error")?;

    let (tx, rx) = mpsc::channel(64);
    let runner = WorkflowRunner::new(graph, &config.workflow).with_event_channel(tx);

    let progress = spinner();
    let progress_task = tokio::spawn(drive_progress(rx, progress.clone()));

    let run = runner.run(brief).await.context("workflow configuration error")?;

    progress_task.await.ok();
    progress.finish_and_clear();

    print_run_summary(&run);

    let rendered = serde_json::to_string_pretty(&run).context("Failed to render run output")?;
    std::fs::write(output, rendered)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{} {}", style("wrote").dim(), output.display());

    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("valid progress template"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

async fn drive_progress(mut rx: mpsc::Receiver<RunEvent>, pb: ProgressBar) {
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::StageStarted { node, step } => {
                pb.set_message(format!("[{step}] {node}"));
            }
            RunEvent::StageCompleted { .. } => {}
            RunEvent::RevisionDispatched { target, revision } => {
                pb.println(format!(
                    "  {} revision {} -> {}",
                    style("↻").yellow(),
                    revision,
                    target
                ));
            }
            RunEvent::DecisionComplete { reason } => {
                pb.println(format!("  {} {}", style("✓").green(), reason));
            }
        }
    }
}

fn print_run_summary(run: &CampaignRun) {
    let quality = quality::assess_quality(&run.state);
    println!();
    println!("{}", style("Campaign run finished").bold());
    println!("  run id:     {}", run.run_id);
    println!(
        "  outcome:    {}",
        match run.completion {
            Some(reason) => reason.to_string(),
            None => "ended without a decision".to_string(),
        }
    );
    println!("  revisions:  {}", run.state.revision_count);
    println!("  quality:    {quality}/100");
    println!("  steps:      {}", run.steps);
    println!("  artifacts:  {}", run.state.artifacts.count());
    println!("  feedback:   {} entries", run.state.feedback.len());
    for recommendation in &run.analytics.recommendations {
        println!("  {} {}", style("note:").dim(), recommendation);
    }
}

/// `adloom graph`: print the compiled workflow topology.
pub fn cmd_graph(config_path: Option<&Path>) -> Result<()> {
    let config = AdloomConfig::load(config_path)?;

    // The graph is compiled but never run, so a placeholder key is fine.
    let completer = ResilientCompleter::new(
        Arc::new(HttpTextService::new(&config.service, "unused")),
        Arc::new(CircuitBreaker::new(config.retry.breaker_threshold)),
        config.retry.policy(),
    );
    let images = Arc::new(HttpImageService::new(&config.service, "unused"));

    let graph =
        build_campaign_graph(completer, images).context("workflow configuration error")?;
    for line in graph.topology_lines() {
        println!("{line}");
    }
    Ok(())
}

/// `adloom config show`: print the resolved configuration.
pub fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = AdloomConfig::load(config_path)?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}

/// `adloom config init`: write a default adloom.toml.
pub fn cmd_config_init() -> Result<()> {
    let path = Path::new("adloom.toml");
    if path.exists() {
        anyhow::bail!("adloom.toml already exists");
    }
    std::fs::write(path, AdloomConfig::default_toml()).context("Failed to write adloom.toml")?;
    println!("{} adloom.toml", style("wrote").dim());
    Ok(())
}
