//! Ramping load generator.
//!
//! Virtual users (VUs) each loop: send one random operation request, think,
//! repeat. A controller raises or lowers the number of active VUs following a
//! [`RampSchedule`], interpolating linearly inside each stage.
//!
//! ```text
//! vus
//! 100 |                                   ___
//!  50 |                ___/‾‾‾/‾‾‾/‾‾‾/‾‾‾
//!  10 |___/‾‾‾/‾‾‾/‾‾‾
//!     +--------------------------------------- t (30s stages)
//! ```

use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Endpoints exercised by virtual users.
pub const LOAD_PATHS: [&str; 5] = ["add", "subtract", "multiply", "divide", "calculate"];

/// Ramp towards `target` VUs over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampSchedule {
    pub start_vus: usize,
    pub stages: Vec<Stage>,
}

impl RampSchedule {
    pub fn new(start_vus: usize, stages: Vec<Stage>) -> Self {
        Self { start_vus, stages }
    }

    /// Start at `start` VUs and add `step` per stage until `target`.
    pub fn linear(start: usize, step: usize, target: usize, stage: Duration) -> Self {
        let step = step.max(1);
        let mut stages = Vec::new();
        let mut level = start;
        loop {
            stages.push(Stage {
                duration: stage,
                target: level.min(target),
            });
            if level >= target {
                break;
            }
            level += step;
        }
        Self::new(start, stages)
    }

    /// 10 VUs rising to 100 in ten 30 second stages.
    pub fn standard() -> Self {
        Self::linear(10, 10, 100, Duration::from_secs(30))
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn peak_vus(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.target)
            .chain(std::iter::once(self.start_vus))
            .max()
            .unwrap_or(0)
    }

    /// Active VUs `elapsed` into the run; zero once the schedule is over.
    pub fn vus_at(&self, elapsed: Duration) -> usize {
        let mut from = self.start_vus;
        let mut offset = Duration::ZERO;

        for stage in &self.stages {
            let end = offset + stage.duration;
            if elapsed < end {
                let progress = (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
                let vus = from as f64 + (stage.target as f64 - from as f64) * progress;
                return vus.round() as usize;
            }
            from = stage.target;
            offset = end;
        }

        0
    }
}

impl Default for RampSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

/// Classification of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx.
    Success,
    /// 4xx, e.g. a division by zero.
    ClientError,
    /// 5xx or transport failure.
    Failure,
}

/// Aggregated results of a load run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub requests: u64,
    pub successes: u64,
    pub client_errors: u64,
    pub failures: u64,
    pub total_latency_micros: u64,
    pub peak_vus: usize,
}

impl LoadReport {
    pub fn record(&mut self, outcome: Outcome, latency: Duration) {
        self.requests += 1;
        self.total_latency_micros = self
            .total_latency_micros
            .saturating_add(u64::try_from(latency.as_micros()).unwrap_or(u64::MAX));
        match outcome {
            Outcome::Success => self.successes += 1,
            Outcome::ClientError => self.client_errors += 1,
            Outcome::Failure => self.failures += 1,
        }
    }

    pub fn merge(&mut self, other: &LoadReport) {
        self.requests += other.requests;
        self.successes += other.successes;
        self.client_errors += other.client_errors;
        self.failures += other.failures;
        self.total_latency_micros = self.total_latency_micros.saturating_add(other.total_latency_micros);
        self.peak_vus = self.peak_vus.max(other.peak_vus);
    }

    pub fn mean_latency(&self) -> Duration {
        if self.requests == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.total_latency_micros / self.requests)
    }
}

/// A configured load run against one base URL.
#[derive(Debug, Clone)]
pub struct LoadTest {
    client: reqwest::Client,
    base_url: Arc<str>,
    schedule: RampSchedule,
    think_time: Duration,
    tick: Duration,
}

impl LoadTest {
    pub fn new(base_url: &str, schedule: RampSchedule) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
            schedule,
            think_time: Duration::from_secs(1),
            tick: Duration::from_millis(100),
        }
    }

    /// Pause between two requests of the same VU.
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    /// How often the controller re-evaluates the schedule.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn schedule(&self) -> &RampSchedule {
        &self.schedule
    }

    /// Drive the schedule to completion and collect every VU's results.
    pub async fn run(&self) -> LoadReport {
        let total = self.schedule.total_duration();
        let (desired_tx, desired_rx) = watch::channel(self.schedule.vus_at(Duration::ZERO));
        let mut users = Vec::new();
        let mut peak = 0;
        let start = Instant::now();
        let mut ticker = tokio::time::interval(self.tick);

        tracing::info!(
            base_url = %self.base_url,
            stages = self.schedule.stages.len(),
            total_secs = total.as_secs_f64(),
            "Load test starting"
        );

        loop {
            ticker.tick().await;
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let desired = self.schedule.vus_at(elapsed);
            while users.len() < desired {
                let id = users.len();
                users.push(tokio::spawn(virtual_user(
                    id,
                    self.client.clone(),
                    self.base_url.clone(),
                    desired_rx.clone(),
                    self.think_time,
                )));
            }
            if desired != *desired_tx.borrow() {
                tracing::debug!(vus = desired, elapsed_secs = elapsed.as_secs(), "Adjusting virtual users");
            }
            peak = peak.max(desired);
            desired_tx.send_replace(desired);
        }

        drop(desired_tx);

        let mut report = LoadReport {
            peak_vus: peak,
            ..LoadReport::default()
        };
        for user in users {
            match user.await {
                Ok(partial) => report.merge(&partial),
                Err(e) => tracing::warn!(error = %e, "Virtual user task failed"),
            }
        }

        tracing::info!(
            requests = report.requests,
            successes = report.successes,
            client_errors = report.client_errors,
            failures = report.failures,
            mean_latency_ms = report.mean_latency().as_secs_f64() * 1000.0,
            "Load test finished"
        );
        report
    }
}

async fn virtual_user(
    id: usize,
    client: reqwest::Client,
    base_url: Arc<str>,
    mut desired: watch::Receiver<usize>,
    think_time: Duration,
) -> LoadReport {
    let mut report = LoadReport::default();

    loop {
        let active = *desired.borrow() > id;
        if !active {
            if desired.changed().await.is_err() {
                break;
            }
            continue;
        }

        let start = Instant::now();
        let outcome = send_random(&client, &base_url).await;
        report.record(outcome, start.elapsed());

        tokio::time::sleep(think_time).await;
        if desired.has_changed().is_err() {
            break;
        }
    }

    report
}

async fn send_random(client: &reqwest::Client, base_url: &str) -> Outcome {
    let (path, x, y) = {
        let mut rng = rand::thread_rng();
        let path = LOAD_PATHS[rng.gen_range(0..LOAD_PATHS.len())];
        (path, rng.gen_range(0..100i64), rng.gen_range(0..10i64))
    };

    let result = client
        .post(format!("{}/{}", base_url, path))
        .json(&json!({"x": x, "y": y}))
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => Outcome::Success,
        Ok(response) if response.status().is_client_error() => Outcome::ClientError,
        Ok(response) => {
            tracing::debug!(path, status = %response.status(), "Server error");
            Outcome::Failure
        }
        Err(e) => {
            tracing::debug!(path, error = %e, "Request failed");
            Outcome::Failure
        }
    }
}
