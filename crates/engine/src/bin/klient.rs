//! `klient`: thin companion CLI that POSTs workflow documents to a running
//! `knavigator` submission server (spec §6, `SPEC_FULL.md` §B.1). Grounded
//! on `cmd/klient/main.go`: reads the same brace-expandable path-list
//! grammar, re-marshals each workflow to YAML, and prints the server's
//! response status and body.

use clap::Parser;
use fleetbench_config::load_workflows;
use std::process::ExitCode;

/// klient - submits workflow documents to a knavigator server
#[derive(Parser, Debug)]
#[command(name = "klient", version, about)]
struct Args {
    /// Comma-separated, brace-expandable list of workflow files or directories.
    #[arg(long, alias = "tasks")]
    workflow: String,

    /// Base URL of the running knavigator server.
    #[arg(long, default_value = "http://localhost:9090")]
    server: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    match submit_all(args).await {
        Ok(all_ok) => {
            if all_ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn submit_all(args: Args) -> anyhow::Result<bool> {
    let workflows = load_workflows(&args.workflow)?;
    let client = reqwest::Client::new();
    let url = format!("{}/workflow", args.server.trim_end_matches('/'));

    let mut all_ok = true;
    for workflow in &workflows {
        let body = serde_yaml::to_string(workflow)?;
        let response = client
            .post(&url)
            .header("Content-Type", "application/x-yaml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        println!("{}: {} {}", workflow.name, status, text);
        if !status.is_success() {
            all_ok = false;
        }
    }
    Ok(all_ok)
}
