//! Non-operation endpoints: the index page and the health check.

use axum::{extract::State, response::Html, Json};
use serde::Serialize;

use crate::http::server::AppState;

const INDEX_HTML: &str = include_str!("../../assets/calculator.html");

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub service: String,
    pub uptime_secs: u64,
    pub spans_opened: u64,
    pub spans_closed: u64,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let stats = state.tracer.stats();
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        service: state.tracer.service().to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        spans_opened: stats.opened,
        spans_closed: stats.closed,
    })
}
