//! Cluster client construction: in-cluster config first, falling back to
//! a kubeconfig file with an optional context override, grounded on
//! `utils.GetK8sConfig` (`pkg/utils/k8s_config.go`).

use crate::error::Result;
use anyhow::Context;
use fleetbench_config::KubeClientConfig;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

pub async fn build_client(cfg: &KubeClientConfig) -> Result<Client> {
    let config = build_config(cfg).await?;
    Ok(Client::try_from(config)?)
}

async fn build_config(cfg: &KubeClientConfig) -> Result<Config> {
    if cfg.kubeconfig.is_none() && cfg.context.is_none() {
        if let Ok(in_cluster) = Config::incluster() {
            tracing::info!("using in-cluster Kubernetes config");
            return Ok(apply_qps_burst(in_cluster, cfg));
        }
    }

    let options = KubeConfigOptions {
        context: cfg.context.clone(),
        ..Default::default()
    };

    let kubeconfig = match &cfg.kubeconfig {
        Some(path) => Kubeconfig::read_from(path)
            .with_context(|| format!("failed to read kubeconfig at {path}"))?,
        None => Kubeconfig::read().context("failed to read default kubeconfig")?,
    };

    tracing::info!(context = ?cfg.context, "using kubeconfig file");
    let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
    Ok(apply_qps_burst(config, cfg))
}

fn apply_qps_burst(config: Config, cfg: &KubeClientConfig) -> Config {
    if let Some(qps) = cfg.qps {
        tracing::debug!(qps, "kube-api-qps configured (informational)");
    }
    if let Some(burst) = cfg.burst {
        tracing::debug!(burst, "kube-api-burst configured (informational)");
    }
    config
}
