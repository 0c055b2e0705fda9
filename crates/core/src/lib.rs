//! Core types and shared functionality for stratus.
//!
//! This crate provides:
//! - Cache generation store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, Snapshot};
pub use config::AppConfig;
pub use error::Error;
