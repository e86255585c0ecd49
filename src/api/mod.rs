// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/api/mod.rs
//
// Optional read-only status API (`-b host:port`). Serves a single JSON
// status snapshot for external monitoring, modeled on the teacher's
// web_server.rs (axum::Router serving the dashboard), minus the WebSocket
// push channel and HTML dashboard the teacher serves — this crate's API is
// peripheral per the module budget and does not need a push transport, so
// a single polled GET endpoint keeps the same `axum` dependency without
// pulling in `tokio-tungstenite` for a feature nothing here requires.

use crate::job::state::JobState;
use crate::stats::coordinator_stats::CoordinatorStats;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
struct ApiState {
    stats: Arc<CoordinatorStats>,
    job_state: Arc<JobState>,
}

#[derive(Serialize)]
struct StatusResponse {
    uptime_secs: f64,
    hashrate: f64,
    shares_accepted: u64,
    shares_rejected: u64,
    acceptance_rate: f64,
    current_job_id: Option<String>,
    current_height: Option<u64>,
}

/// Run the status API until the process shuts down. Meant to be
/// `tokio::spawn`ed alongside the other actors.
pub async fn serve(bind: SocketAddr, stats: Arc<CoordinatorStats>, job_state: Arc<JobState>) {
    let state = ApiState { stats, job_state };
    let app = Router::new().route("/status", get(status_handler)).with_state(state);

    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind = %bind, error = %e, "failed to bind status API");
            return;
        }
    };

    info!(bind = %bind, "status API listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "status API server error");
    }
}

async fn status_handler(State(state): State<ApiState>) -> Json<StatusResponse> {
    let snapshot = state.job_state.snapshot();
    Json(StatusResponse {
        uptime_secs: state.stats.uptime().as_secs_f64(),
        hashrate: state.stats.total_hashrate(),
        shares_accepted: state.stats.shares_accepted(),
        shares_rejected: state.stats.shares_rejected(),
        acceptance_rate: state.stats.acceptance_rate(),
        current_job_id: snapshot.as_ref().map(|s| s.job.job_id.clone()),
        current_height: snapshot.as_ref().map(|s| s.job.height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_handler_reports_no_job_when_none_published() {
        let state = ApiState {
            stats: Arc::new(CoordinatorStats::new()),
            job_state: Arc::new(JobState::new()),
        };
        let Json(response) = status_handler(State(state)).await;
        assert!(response.current_job_id.is_none());
        assert_eq!(response.shares_accepted, 0);
    }
}
