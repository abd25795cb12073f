//! Orbit - federated search core for a keyboard-driven launcher.
//!
//! Every keystroke fans out to independent candidate sources (apps, files,
//! clipboard history, processes, calculator, bookmarks, system commands)
//! and comes back as one deduplicated, relevance-ordered list.
//!
//! # Architecture
//!
//! - [`core`] - candidate shape, fuzzy scorer, weighting and ranking
//! - [`search`] - the [`Provider`] trait and per-query [`SearchContext`]
//! - [`aggregator`] - fast and full query paths, timeouts, generations
//! - [`services`] - the concrete providers
//! - [`executor`] - turns an activated candidate into a side effect
//! - [`platform`] - OS abstraction (Linux, macOS)
//! - [`config`] - TOML configuration
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use orbit::{services::{Services, UsageTracker}, Config};
//!
//! let config = Config::load();
//! let platform = orbit::platform::current();
//! let services = Services::new(&config, platform, Arc::new(UsageTracker::in_memory()));
//! let aggregator = services.aggregator(&config);
//!
//! // Synchronous, in-memory providers only
//! let instant = aggregator.fast_query("chr");
//! ```

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod logging;
pub mod platform;
pub mod search;
pub mod services;

// Re-export commonly used types for convenience
pub use aggregator::{Aggregator, AggregatorOptions, Generation, LatestResults};
pub use config::Config;
pub use core::{Action, Candidate, Category};
pub use error::{ActionError, OrbitError, OrbitResult, ProviderError};
pub use executor::{ActionOutcome, Dispatcher, Modifier};
pub use platform::{AppEntry, Platform, SystemCommand};
pub use search::{Provider, ProviderKind, SearchContext};
