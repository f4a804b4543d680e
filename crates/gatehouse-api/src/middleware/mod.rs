//! HTTP middleware not tied to authentication

pub mod metrics;

pub use metrics::metrics_middleware;
