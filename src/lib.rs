//! Traced calculator web service library.

pub mod calculator;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod loadgen;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Tracer;
