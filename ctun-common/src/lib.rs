//! # ContextTunes Common Library
//!
//! Shared code for the ContextTunes crates including:
//! - Context and recommendation value types
//! - Event types (CtunEvent enum) and the event bus
//! - TOML configuration loading and API key resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
