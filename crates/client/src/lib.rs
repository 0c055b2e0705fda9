//! Network client for stratus.
//!
//! This crate provides URL handling for fetch interception and the network
//! seam the cache agent issues requests through.

pub mod fetch;

pub use fetch::{FetchConfig, FetchResponse, HttpNetwork, Network, WebRequest};
pub use fetch::url::{UrlError, is_web_scheme, resolve, same_origin};
