//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use calculator_app::calculator::Latency;
use calculator_app::config::AppConfig;
use calculator_app::http::HttpServer;
use calculator_app::lifecycle::{start, RunningServer};
use calculator_app::observability::{MemorySink, Tracer};
use reqwest::StatusCode;
use serde_json::Value;

/// A server on an ephemeral port whose spans land in memory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub sink: Arc<MemorySink>,
    pub tracer: Tracer,
    pub client: reqwest::Client,
    running: RunningServer,
}

/// Start the service with simulated latency turned off.
pub async fn spawn_app() -> TestApp {
    let mut config = AppConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.simulation.enabled = false;

    let sink = Arc::new(MemorySink::new());
    let tracer = Tracer::new("calculator-app", sink.clone());
    let server = HttpServer::with_latency(config.clone(), tracer.clone(), Latency::disabled());
    let running = start(server, &config.listener.bind_address())
        .await
        .expect("server failed to start");

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestApp {
        addr: running.addr(),
        sink,
        tracer,
        client,
        running,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a JSON body and decode the JSON reply.
    pub async fn post_json(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("service unreachable");
        let status = res.status();
        (status, res.json().await.expect("response was not JSON"))
    }

    /// POST a raw body and decode the JSON reply.
    pub async fn post_raw(&self, path: &str, body: &'static str) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("service unreachable");
        let status = res.status();
        (status, res.json().await.expect("response was not JSON"))
    }

    pub async fn stop(self) {
        self.running
            .stop(Duration::from_secs(5))
            .await
            .expect("server did not stop cleanly");
    }
}
