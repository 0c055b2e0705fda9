//! Client-control seam.
//!
//! After activation the agent claims all currently open client contexts so
//! they are served by this generation without a reload. The host supplies
//! the mechanism; the binary ships a logging implementation and tests use
//! a recording one.

use async_trait::async_trait;

/// Claim-all-open-clients interface consumed by the agent.
#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Take control of all open clients, returning how many were claimed.
    async fn claim(&self) -> usize;
}

/// Host-less implementation that only records the claim in the log.
#[derive(Debug, Default)]
pub struct LoggingClients;

#[async_trait]
impl ClientControl for LoggingClients {
    async fn claim(&self) -> usize {
        tracing::info!("claiming open clients");
        0
    }
}
