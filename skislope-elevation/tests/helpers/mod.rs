//! Test Helper Utilities
//!
//! Shared utilities for testing skislope-elevation

#![allow(dead_code)]

pub mod fakes;
pub mod mock_server;

// Re-export commonly used items
pub use fakes::{FakeProgress, FakeSource, GridReply};
pub use mock_server::{unreachable_url, GridMode, MockServer};
