//! Test Helper Utilities
//!
//! Shared utilities for testing ctun-ai

#![allow(dead_code)]

pub mod mock_server;
pub mod providers;

// Re-export commonly used items
pub use mock_server::{closed_port_url, MockResponse, MockServer, RecordedRequest};
pub use providers::{gated, hanging, static_set, test_fix, test_places, test_weather};
