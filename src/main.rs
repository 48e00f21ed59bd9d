//! agentkernel - CLI entry point

use agentkernel::agent::{Blackboard, KernelExecutor, KernelNode, Stage};
use agentkernel::checkpoint::{CheckpointStore, FileCheckpointStore};
use agentkernel::cli::{Args, Commands};
use agentkernel::config::KernelConfig;
use agentkernel::logging;
use agentkernel::telemetry::{JsonlTraceSink, TraceSink};
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbosity());

    let config = args.load_config().context("Failed to load configuration")?;

    match args.command {
        Commands::Run { input, run_id } => run_echo_agent(&config, input, run_id).await,
        Commands::Runs => {
            let store = FileCheckpointStore::new(&config.storage.checkpoint_dir)?;
            for run_id in store.list_runs()? {
                println!("{}", run_id);
            }
            Ok(())
        }
        Commands::Show { run_id, stage } => {
            let store = FileCheckpointStore::new(&config.storage.checkpoint_dir)?;
            match store.load(&run_id, stage)? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    Ok(())
                }
                None => bail!("No checkpoint found for run '{}'", run_id),
            }
        }
        Commands::Trace { run_id } => {
            let sink = JsonlTraceSink::new(&config.storage.trace_dir)?;
            let events = sink.read(&run_id)?;
            if events.is_empty() {
                bail!("No trace events found for run '{}'", run_id);
            }
            for event in events {
                println!("{} {} {}", event.ts.to_rfc3339(), event.event, event.payload);
            }
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// Plan an `echo` call on the input, summarize it, then finish
async fn run_echo_agent(config: &KernelConfig, input: String, run_id: Option<String>) -> Result<()> {
    let executor = Arc::new(KernelExecutor::from_config(config)?);
    executor
        .tools()
        .register_fn("echo", |args| Ok(args.get("v").cloned().unwrap_or(Value::Null)));

    let node = KernelNode::stage_aware(executor.clone(), |data, stage| {
        Ok(match stage {
            Stage::Plan => json!({
                "tool": { "name": "echo", "args": { "v": data.get("input").cloned().unwrap_or(Value::Null) } }
            }),
            Stage::Observe => {
                let last = data
                    .get("observations")
                    .and_then(Value::as_array)
                    .and_then(|items| items.last())
                    .cloned()
                    .unwrap_or(Value::Null);
                json!({ "last_observation": last })
            }
            Stage::Decide => json!({ "finish": true }),
            _ => Value::Null,
        })
    });

    let mut input_data = Blackboard::new();
    input_data.insert("input".to_string(), Value::String(input));
    if let Some(run_id) = run_id {
        input_data.insert("run_id".to_string(), Value::String(run_id));
    }

    let result = node.run(input_data).await;
    executor.tools().shutdown();

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
