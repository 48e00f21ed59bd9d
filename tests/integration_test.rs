//! Integration tests for agentkernel
//!
//! Drive whole runs through the public API with in-memory and file-backed
//! collaborators.

use agentkernel::agent::{Blackboard, KernelExecutor, KernelNode, LogicErrorPolicy, Stage};
use agentkernel::checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use agentkernel::config::KernelConfig;
use agentkernel::telemetry::{JsonlTraceSink, MemoryTraceSink, TraceSink};
use agentkernel::tools::{ToolRunner, ToolSpec};
use agentkernel::KernelError;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_test::assert_ok;

struct Kernel {
    executor: Arc<KernelExecutor>,
    checkpoints: Arc<MemoryCheckpointStore>,
    tracer: Arc<MemoryTraceSink>,
}

fn kernel() -> Kernel {
    let tools = Arc::new(ToolRunner::default());
    tools.register_fn("echo", |args| Ok(args.get("v").cloned().unwrap_or(Value::Null)));

    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let tracer = Arc::new(MemoryTraceSink::new());
    let executor = KernelExecutor::new(tools, checkpoints.clone(), tracer.clone());

    Kernel {
        executor: Arc::new(executor),
        checkpoints,
        tracer,
    }
}

fn input(value: Value) -> Blackboard {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_echo_agent_end_to_end() {
    let k = kernel();
    let node = KernelNode::stage_aware(k.executor.clone(), |data, stage| {
        Ok(match stage {
            Stage::Plan => json!({"tool": {"name": "echo", "args": {"v": data["input"]}}}),
            _ => Value::Null,
        })
    });

    let output = node.run(input(json!({"input": "X"}))).await.unwrap();

    assert_eq!(output["plan"]["tool"]["name"], json!("echo"));
    assert_eq!(output["observations"][0]["ok"], json!(true));
    assert_eq!(output["observations"][0]["result"], json!("X"));
    assert!(output["run_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_simple_logic_plans_tool_like_basic_agent() {
    let k = kernel();
    let node = KernelNode::simple(k.executor.clone(), |data| {
        Ok(json!({"tool": {"name": "echo", "args": {"v": data["input"]}}}))
    });

    let output = node.run(input(json!({"input": "query"}))).await.unwrap();

    assert_eq!(output["observations"].as_array().unwrap().len(), 1);
    assert_eq!(output["obs_summary"], json!({}));
    // The decision is the same tool plan; it carries no finish flag.
    assert_eq!(output["decision"]["tool"]["name"], json!("echo"));
}

#[tokio::test]
async fn test_finish_ends_after_single_pass() {
    let k = kernel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let node = KernelNode::stage_aware(k.executor.clone(), move |_, stage| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(match stage {
            Stage::Decide => json!({"finish": true}),
            _ => Value::Null,
        })
    });

    let output = node.run(Blackboard::new()).await.unwrap();
    let run_id = output["run_id"].as_str().unwrap();

    // PLAN, OBSERVE, DECIDE once each
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        k.checkpoints.saved_stages(run_id),
        vec![Stage::Init, Stage::Plan, Stage::Act, Stage::Observe, Stage::End]
    );
    assert_eq!(k.checkpoints.load(run_id, None).unwrap().unwrap().stage, Stage::End);
}

#[tokio::test]
async fn test_trace_sequence() {
    let k = kernel();
    let node = KernelNode::stage_aware(k.executor.clone(), |_, stage| {
        Ok(match stage {
            Stage::Plan => json!({"tool": {"name": "echo", "args": {"v": 1}}}),
            _ => Value::Null,
        })
    });

    let output = node.run(input(json!({"run_id": "traced"}))).await.unwrap();
    assert_eq!(output["run_id"], json!("traced"));

    let names = k.tracer.event_names("traced");
    assert_eq!(names.first().map(String::as_str), Some("run_start"));
    assert_eq!(names.last().map(String::as_str), Some("run_complete"));
    assert_eq!(names.iter().filter(|n| *n == "stage_enter").count(), 5);
    assert_eq!(names.iter().filter(|n| *n == "stage_complete").count(), 5);
    assert_eq!(names.iter().filter(|n| *n == "tool_result").count(), 1);
}

#[tokio::test]
async fn test_tool_timeout_does_not_abort_run() {
    let k = kernel();
    k.executor.tools().register_fn("slow", |_| {
        std::thread::sleep(Duration::from_millis(300));
        Ok(json!("late"))
    });

    let executor = Arc::new(
        KernelExecutor::new(
            k.executor.tools().clone(),
            k.checkpoints.clone(),
            k.tracer.clone(),
        )
        .with_tool_timeout(Duration::from_millis(50)),
    );
    let node = KernelNode::stage_aware(executor, |data, stage| {
        Ok(match stage {
            Stage::Plan => json!({"tool": {"name": "slow"}}),
            Stage::Decide => json!({
                "finish": true,
                "saw_failure": data["observations"][0]["ok"] == json!(false)
            }),
            _ => Value::Null,
        })
    });

    let start = Instant::now();
    let output = node.run(Blackboard::new()).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(280));

    let observation = &output["observations"][0];
    assert_eq!(observation["ok"], json!(false));
    assert!(observation["error"].as_str().unwrap().contains("timed out"));
    assert_eq!(output["decision"]["saw_failure"], json!(true));
}

#[tokio::test]
async fn test_malformed_tool_call_aborts_run() {
    let k = kernel();
    let node = KernelNode::stage_aware(k.executor.clone(), |_, stage| {
        Ok(match stage {
            Stage::Plan => json!({"tool": {"name": "echo", "args": "not-an-object"}}),
            _ => Value::Null,
        })
    });

    let err = node.run(Blackboard::new()).await.unwrap_err();
    assert!(matches!(err, KernelError::Shape(_)));
}

#[tokio::test]
async fn test_logic_failure_policy() {
    let k = kernel();
    let node = KernelNode::stage_aware(k.executor.clone(), |_, stage| match stage {
        Stage::Observe => Err(anyhow::anyhow!("summarizer offline")),
        _ => Ok(Value::Null),
    });

    let output = assert_ok!(node.run(Blackboard::new()).await);
    assert_eq!(output["obs_summary"], json!({}));
    assert_eq!(output["logic_errors"][0]["stage"], json!("OBSERVE"));
    assert_eq!(output["logic_errors"][0]["error"], json!("summarizer offline"));

    let aborting = KernelExecutor::new(
        k.executor.tools().clone(),
        k.checkpoints.clone(),
        k.tracer.clone(),
    )
    .with_logic_error_policy(LogicErrorPolicy::Abort);
    let node = KernelNode::stage_aware(Arc::new(aborting), |_, stage| match stage {
        Stage::Observe => Err(anyhow::anyhow!("summarizer offline")),
        _ => Ok(Value::Null),
    });

    let err = node.run(Blackboard::new()).await.unwrap_err();
    assert!(matches!(err, KernelError::Logic { .. }));
}

#[tokio::test]
async fn test_concurrent_runs_share_executor() {
    let k = kernel();
    let node = KernelNode::stage_aware(k.executor.clone(), |data, stage| {
        Ok(match stage {
            Stage::Plan => json!({"tool": {"name": "echo", "args": {"v": data["input"]}}}),
            Stage::Decide => json!({"finish": true}),
            _ => Value::Null,
        })
    });

    let mut handles = vec![];
    for i in 0..8 {
        let node = node.clone();
        handles.push(tokio::spawn(async move {
            node.run(input(json!({"input": i}))).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let output = handle.await.unwrap().unwrap();
        assert_eq!(output["observations"][0]["result"], json!(i));
    }
    assert_eq!(k.checkpoints.list_runs().unwrap().len(), 8);
}

#[tokio::test]
async fn test_concurrent_tools_do_not_cross_contaminate() {
    let runner = Arc::new(ToolRunner::with_workers(4, Duration::from_secs(5)));
    for name in ["a", "b", "c", "d"] {
        runner.register_fn(name, move |args| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(json!({"tool": name, "echo": args["n"]}))
        });
    }

    let mut handles = vec![];
    for (n, name) in ["a", "b", "c", "d"].into_iter().enumerate() {
        let runner = runner.clone();
        handles.push(tokio::spawn(async move {
            let spec = ToolSpec::new(name, input(json!({"n": n})));
            (name, n, runner.execute(&spec, None).await)
        }));
    }

    for handle in handles {
        let (name, n, result) = handle.await.unwrap();
        assert!(result.ok);
        assert_eq!(result.tool, name);
        assert_eq!(result.result, Some(json!({"tool": name, "echo": n})));
    }
}

#[tokio::test]
async fn test_file_backed_run() {
    let temp = TempDir::new().unwrap();
    let mut config = KernelConfig::default();
    config.storage.checkpoint_dir = temp.path().join("checkpoints");
    config.storage.trace_dir = temp.path().join("traces");

    let executor = Arc::new(KernelExecutor::from_config(&config).unwrap());
    executor
        .tools()
        .register_fn("echo", |args| Ok(args.get("v").cloned().unwrap_or(Value::Null)));

    let node = KernelNode::stage_aware(executor.clone(), |data, stage| {
        Ok(match stage {
            Stage::Plan => json!({"tool": {"name": "echo", "args": {"v": data["input"]}}}),
            Stage::Decide => json!({"finish": true}),
            _ => Value::Null,
        })
    });

    let output = node
        .run(input(json!({"input": "X", "run_id": "file-run"})))
        .await
        .unwrap();
    executor.tools().shutdown();
    assert_eq!(output["observations"][0]["result"], json!("X"));

    let store = FileCheckpointStore::new(&config.storage.checkpoint_dir).unwrap();
    assert_eq!(store.list_runs().unwrap(), vec!["file-run"]);
    let latest = store.load("file-run", None).unwrap().unwrap();
    assert_eq!(latest.stage, Stage::End);
    assert_eq!(latest.data["observations"][0]["result"], json!("X"));
    assert!(store.load("file-run", Some(Stage::Decide)).unwrap().is_none());

    let sink = JsonlTraceSink::new(&config.storage.trace_dir).unwrap();
    let events = sink.read("file-run").unwrap();
    assert_eq!(events.first().unwrap().event, "run_start");
    assert_eq!(events.last().unwrap().event, "run_complete");
}
