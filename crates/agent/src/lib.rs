//! The stratus cache agent.
//!
//! Mediates every outgoing request of a controlled web application through
//! a cache-first strategy and manages the lifecycle of versioned cache
//! generations: bulk precache on install, stale-generation eviction and
//! client claiming on activate, interception with network fallback for
//! everything after.

pub mod agent;
pub mod clients;
pub mod lifecycle;

pub use agent::{AgentError, CacheAgent, FetchOutcome, ServeSource, ServedResponse};
pub use clients::{ClientControl, LoggingClients};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleState};
