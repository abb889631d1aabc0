//! Utility functions shared across the plugin manager.

pub mod fs;
