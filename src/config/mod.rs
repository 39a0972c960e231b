//! Configuration module for College-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use college_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Listing endpoint: {}", config.source.listing_path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CollectionMode, CollectorConfig, Config, OutputConfig, SourceConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
