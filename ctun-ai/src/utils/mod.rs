//! Utility modules for ctun-ai

pub mod retry;

pub use retry::{retry_transient, RetryPolicy};
