//! # Skislope Common Library
//!
//! Shared code for the skislope terrain services including:
//! - Error type shared by configuration and CLI plumbing
//! - TOML configuration loading, resolution and atomic write-back
//! - Elevation event types and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
