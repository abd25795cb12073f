//! Provider trait and per-query context for federated search
//!
//! Every candidate source implements [`Provider`]. Providers are explicit
//! objects owning their own caches and locks; the aggregator only holds
//! `Arc<dyn Provider>` handles and never shares mutable state between calls.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::Candidate;
use crate::error::ProviderResult;

/// Whether a provider can answer without risking an unbounded OS call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Pure in-memory lookups; called from both query paths
    Fast,
    /// May block on the OS; only called from the full, asynchronous path
    Slow,
}

/// A source of candidates
pub trait Provider: Send + Sync {
    /// Unique name of this provider (e.g., "apps", "calculator", "files").
    /// Also the key for per-provider timeout overrides in the config.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Cheap pre-check; returning false skips the provider for this query.
    fn should_search(&self, _ctx: &SearchContext) -> bool {
        true
    }

    /// Produce candidates for the query. "No results" is `Ok(vec![])`.
    ///
    /// Slow providers should poll [`SearchContext::is_cancelled`] between
    /// units of work and stop early once it flips.
    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>>;

    /// Time budget overriding the aggregator default.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Context passed to providers
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// The query, trimmed
    pub query: String,
    /// Query converted to lowercase
    pub query_lower: String,
    /// First word of query (keyword)
    pub keyword: String,
    /// Text after the keyword (if any)
    pub remaining: Option<String>,
    cancel: CancellationToken,
}

impl SearchContext {
    pub fn new(query: &str) -> Self {
        Self::with_cancel(query, CancellationToken::new())
    }

    pub fn with_cancel(query: &str, cancel: CancellationToken) -> Self {
        let query = query.trim();
        let query_lower = query.to_lowercase();
        let mut parts = query.splitn(2, ' ');
        let keyword = parts.next().unwrap_or_default().to_lowercase();
        let remaining = parts
            .next()
            .map(str::trim)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);

        Self {
            query: query.to_string(),
            query_lower,
            keyword,
            remaining,
            cancel,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// True once the query was superseded or the provider's time ran out.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
