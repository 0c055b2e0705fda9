//! SQLite-backed store for cache generations.
//!
//! This module provides a persistent cache keyed by generation name using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named cache generations (one per version tag)
//! - Snapshot storage keyed by SHA-256 over request method + URL
//! - All-or-nothing bulk precache in a single transaction
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod snapshots;

pub use crate::Error;

pub use connection::CacheDb;
pub use snapshots::Snapshot;
