//! HTTP networking module
//!
//! Provides the HTTP client sources use to reach their APIs.

mod client;

pub use client::HttpClient;
