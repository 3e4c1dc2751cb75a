//! Main CLI front end: runs one or more workflow documents directly, or,
//! with `--port`, starts the HTTP submission server (spec §6). Grounded on
//! `cmd/knavigator/main.go`'s flag set and on `agent_controller`'s
//! tracing-subscriber init (`controller/src/bin/agent_controller.rs`).

use clap::Parser;
use fleetbench_config::{load_workflows, parse_duration, CleanupConfig, KubeClientConfig};
use fleetbench_engine::engine::{run, Eng};
use fleetbench_engine::kube_client::build_client;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// knavigator - workflow-driven load generator and verifier
#[derive(Parser, Debug)]
#[command(name = "knavigator", version, about)]
struct Args {
    /// Comma-separated, brace-expandable list of workflow files or directories.
    /// Mutually exclusive with --port.
    #[arg(long, alias = "tasks", conflicts_with = "port")]
    workflow: Option<String>,

    /// Run the HTTP submission server on this port instead of executing a
    /// workflow directly. Mutually exclusive with --workflow/--tasks.
    #[arg(long, conflicts_with = "workflow")]
    port: Option<u16>,

    /// Path to a kubeconfig file. Defaults to in-cluster config, falling
    /// back to the default kubeconfig location.
    #[arg(long)]
    kubeconfig: Option<String>,

    /// kubeconfig context to use.
    #[arg(long)]
    kubectx: Option<String>,

    /// Delete every object the run created once it finishes.
    #[arg(long)]
    cleanup: bool,

    /// Deadline for the cleanup pass.
    #[arg(long = "cleanup.timeout", default_value = "5m")]
    cleanup_timeout: String,

    /// Client-side rate limit: queries per second.
    #[arg(long = "kube-api-qps")]
    kube_api_qps: Option<f32>,

    /// Client-side rate limit: burst size.
    #[arg(long = "kube-api-burst")]
    kube_api_burst: Option<i32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run_cli(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_cli(args: Args) -> anyhow::Result<()> {
    let cleanup_timeout = parse_duration(&args.cleanup_timeout)
        .map_err(|e| anyhow::anyhow!("invalid --cleanup.timeout: {e}"))?;

    let kube_cfg = KubeClientConfig {
        kubeconfig: args.kubeconfig,
        context: args.kubectx,
        qps: args.kube_api_qps,
        burst: args.kube_api_burst,
    };
    let client = build_client(&kube_cfg).await?;

    let cleanup = CleanupConfig {
        enabled: args.cleanup,
        timeout: cleanup_timeout,
    };

    let engine = Eng::new(client, "default", cleanup);

    if let Some(port) = args.port {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        let router = fb_server::router(engine);
        fb_server::serve(addr, router).await?;
        return Ok(());
    }

    let workflow_list = args
        .workflow
        .ok_or_else(|| anyhow::anyhow!("one of --workflow/--tasks or --port is required"))?;

    let workflows = load_workflows(&workflow_list)?;
    for workflow in &workflows {
        tracing::info!(workflow = %workflow.name, "running workflow");
        let report = run(&engine, workflow).await?;
        println!("{}", report.render());
    }
    Ok(())
}
