//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener and spawn the server task
//! - Hand back a handle that can stop the server within a grace period
//!
//! # Design Decisions
//! - Fail fast: a bind error is returned before anything is spawned
//! - Listeners start last (traffic only when ready)

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;

/// A server running on a background task.
#[derive(Debug)]
pub struct RunningServer {
    addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
}

/// Bind `address` and serve `server` on a spawned task.
pub async fn start(server: HttpServer, address: &str) -> io::Result<RunningServer> {
    let listener = TcpListener::bind(address).await?;
    let addr = listener.local_addr()?;

    tracing::info!(address = %addr, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let task = tokio::spawn(async move { server.run(listener, signal).await });

    Ok(RunningServer {
        addr,
        shutdown,
        task,
    })
}

impl RunningServer {
    /// Address actually bound (useful when binding port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait up to `grace` for in-flight requests.
    pub async fn stop(self, grace: Duration) -> io::Result<()> {
        self.shutdown.trigger();

        match tokio::time::timeout(grace, self.task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(io::Error::other(e)),
            Err(_) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Shutdown grace period elapsed, abandoning in-flight requests"
                );
                Ok(())
            }
        }
    }
}
