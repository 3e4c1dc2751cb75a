//! HTTP workflow submission server (spec §6): a single `POST /workflow`
//! endpoint that accepts a YAML workflow document, runs it against the
//! engine wired into [`AppState`], and reports the outcome. Grounded on
//! `agent_controller`'s router/graceful-shutdown shape
//! (`controller/src/bin/agent_controller.rs`): `axum` + `tower-http`
//! tracing/timeout layers, `axum::serve(...).with_graceful_shutdown`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use fleetbench_config::Workflow;
use fleetbench_engine::engine::{run, Eng};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Eng>,
}

/// Builds the router: a single `/workflow` endpoint plus the tracing and
/// request-timeout layers every HTTP surface in this corpus carries.
pub fn router(engine: Arc<Eng>) -> Router {
    Router::new()
        .route("/workflow", post(submit_workflow))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(3600))),
        )
        .with_state(AppState { engine })
}

async fn submit_workflow(State(state): State<AppState>, body: Bytes) -> Response {
    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(err) => return (StatusCode::BAD_REQUEST, format!("invalid utf-8 body: {err}")).into_response(),
    };

    let workflow = match Workflow::from_str(text) {
        Ok(workflow) => workflow,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    tracing::info!(workflow = %workflow.name, tasks = workflow.tasks.len(), "received workflow submission");

    match run(&state.engine, &workflow).await {
        Ok(report) => {
            tracing::info!(workflow = %workflow.name, "workflow completed");
            (StatusCode::OK, report.render()).into_response()
        }
        Err(err) => {
            tracing::error!(workflow = %workflow.name, error = %err, "workflow failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// Binds `addr` and serves `router` until SIGINT/SIGTERM, then returns.
pub async fn serve(addr: std::net::SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "workflow submission server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down gracefully"),
        () = terminate => tracing::info!("received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use fleetbench_config::CleanupConfig;
    use tower::ServiceExt;

    fn fake_engine() -> Arc<Eng> {
        let config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
        let client = kube::Client::try_from(config).expect("client built without network I/O");
        Eng::new(client, "default", CleanupConfig::default())
    }

    #[tokio::test]
    async fn rejects_malformed_yaml_with_400() {
        let app = router(fake_engine());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/workflow")
                    .header("content-type", "application/x-yaml")
                    .body(Body::from("not: [valid"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_missing_required_fields_with_400() {
        let app = router(fake_engine());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/workflow")
                    .header("content-type", "application/x-yaml")
                    .body(Body::from("tasks: []\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
