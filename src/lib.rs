//! Fragment Config Library
//!
//! Resolves a consistent configuration view from per-service YAML fragments,
//! validates mutations against a schema catalog, and keeps a merged snapshot.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod settings;
