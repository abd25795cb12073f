//! Aggregator - fans a query out to every provider and ranks the union.
//!
//! Two entry points:
//!
//! - [`Aggregator::fast_query`] runs only [`ProviderKind::Fast`] providers,
//!   inline on the caller's thread, for immediate feedback.
//! - [`Aggregator::full_query`] / [`Aggregator::spawn_full_query`] run every
//!   provider concurrently on the tokio blocking pool, each under its own
//!   timeout, and rank once all of them have answered or timed out.
//!
//! Each keystroke starts a new [`Generation`]. Starting one cancels the
//! previous session's token, and results are only handed to the caller if
//! their generation is still current when they are ready.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::core::{ranking, Candidate};
use crate::error::ProviderError;
use crate::search::{Provider, ProviderKind, SearchContext};

/// Default number of candidates returned by the fast path.
pub const DEFAULT_FAST_LIMIT: usize = 50;

/// Default number of candidates displayed after a full query.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Default per-provider time budget on the full path.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_millis(150);

/// Knobs for the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    pub fast_limit: usize,
    pub max_results: usize,
    pub provider_timeout: Duration,
    /// Per-provider overrides keyed by provider name
    pub timeouts: HashMap<String, Duration>,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            fast_limit: DEFAULT_FAST_LIMIT,
            max_results: DEFAULT_MAX_RESULTS,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            timeouts: HashMap::new(),
        }
    }
}

impl From<&SearchConfig> for AggregatorOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            fast_limit: config.fast_limit as usize,
            max_results: config.max_results as usize,
            provider_timeout: Duration::from_millis(config.provider_timeout_ms),
            timeouts: config
                .timeouts
                .iter()
                .map(|(name, ms)| (name.clone(), Duration::from_millis(*ms)))
                .collect(),
        }
    }
}

impl AggregatorOptions {
    /// Config override, then the provider's own budget, then the default.
    pub fn timeout_for(&self, provider: &dyn Provider) -> Duration {
        self.timeouts
            .get(provider.name())
            .copied()
            .or_else(|| provider.timeout())
            .unwrap_or(self.provider_timeout)
    }
}

/// Monotonically increasing query token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

struct Session {
    generation: Generation,
    cancel: CancellationToken,
}

/// The only shared mutable state of the aggregator.
struct GenerationState {
    latest: AtomicU64,
    session: Mutex<Session>,
}

impl GenerationState {
    fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
            session: Mutex::new(Session {
                generation: Generation::default(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    fn advance(&self) -> Generation {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session.cancel.cancel();

        let generation = Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        *session = Session {
            generation,
            cancel: CancellationToken::new(),
        };
        generation
    }

    fn current(&self) -> Generation {
        Generation(self.latest.load(Ordering::SeqCst))
    }

    fn token_for(&self, generation: Generation) -> Option<CancellationToken> {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        (session.generation == generation).then(|| session.cancel.clone())
    }
}

/// Federated search over a fixed set of injected providers
pub struct Aggregator {
    providers: Arc<[Arc<dyn Provider>]>,
    options: Arc<AggregatorOptions>,
    state: Arc<GenerationState>,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn Provider>>, options: AggregatorOptions) -> Self {
        Self {
            providers: providers.into(),
            options: Arc::new(options),
            state: Arc::new(GenerationState::new()),
        }
    }

    /// Names and kinds of the registered providers, in registration order.
    pub fn providers(&self) -> impl Iterator<Item = (&str, ProviderKind)> {
        self.providers.iter().map(|p| (p.name(), p.kind()))
    }

    /// Query the fast providers synchronously on the calling thread.
    ///
    /// Slow providers are never called from here.
    pub fn fast_query(&self, query: &str) -> Vec<Candidate> {
        let started = Instant::now();
        let ctx = SearchContext::new(query);

        let batches: Vec<Vec<Candidate>> = self
            .providers
            .iter()
            .filter(|provider| provider.kind() == ProviderKind::Fast)
            .filter(|provider| provider.should_search(&ctx))
            .filter_map(|provider| search_inline(provider.as_ref(), &ctx))
            .collect();

        let results = ranking::rank(batches, Some(self.options.fast_limit));
        debug!(
            query = %ctx.query,
            results = results.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "fast query"
        );
        results
    }

    /// Query every provider concurrently and return the ranked, truncated list.
    ///
    /// Not tied to a generation; nothing can supersede it.
    pub async fn full_query(&self, query: &str) -> Vec<Candidate> {
        run_full(&self.providers, &self.options, query, CancellationToken::new())
            .await
            .unwrap_or_default()
    }

    /// Start a new query session, cancelling the previous one.
    pub fn next_generation(&self) -> Generation {
        self.state.advance()
    }

    pub fn current_generation(&self) -> Generation {
        self.state.current()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.state.current() == generation
    }

    /// Run a full query in the background and hand the results to
    /// `on_complete`, unless a newer generation started in the meantime.
    ///
    /// Returns `None` without spawning if `generation` is already stale.
    /// Must be called from within a tokio runtime.
    pub fn spawn_full_query<F>(
        &self,
        query: &str,
        generation: Generation,
        on_complete: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Vec<Candidate>) + Send + 'static,
    {
        let Some(cancel) = self.state.token_for(generation) else {
            debug!(generation = generation.value(), "not spawning stale query");
            return None;
        };

        let providers = Arc::clone(&self.providers);
        let options = Arc::clone(&self.options);
        let state = Arc::clone(&self.state);
        let query = query.to_string();

        Some(tokio::spawn(async move {
            let Some(results) = run_full(&providers, &options, &query, cancel).await else {
                debug!(generation = generation.value(), "full query superseded");
                return;
            };

            if state.current() == generation {
                on_complete(results);
            } else {
                debug!(generation = generation.value(), "discarding stale results");
            }
        }))
    }
}

/// Call a fast provider inline. Errors and panics count as "no results".
fn search_inline(provider: &dyn Provider, ctx: &SearchContext) -> Option<Vec<Candidate>> {
    match panic::catch_unwind(AssertUnwindSafe(|| provider.search(ctx))) {
        Ok(Ok(candidates)) => Some(candidates),
        Ok(Err(e)) => {
            warn!(provider = provider.name(), error = %e, "provider failed");
            None
        }
        Err(_) => {
            warn!(provider = provider.name(), "provider panicked");
            None
        }
    }
}

/// `None` when the session was cancelled before every provider settled.
async fn run_full(
    providers: &[Arc<dyn Provider>],
    options: &AggregatorOptions,
    query: &str,
    cancel: CancellationToken,
) -> Option<Vec<Candidate>> {
    let started = Instant::now();
    let gate = SearchContext::new(query);
    let mut tasks = JoinSet::new();

    for (index, provider) in providers.iter().enumerate() {
        if !provider.should_search(&gate) {
            continue;
        }

        let provider = Arc::clone(provider);
        let budget = options.timeout_for(provider.as_ref());
        let ctx = SearchContext::with_cancel(query, cancel.child_token());
        tasks.spawn(async move { (index, call_provider(provider, ctx, budget).await) });
    }

    let mut batches: Vec<(usize, Vec<Candidate>)> = Vec::with_capacity(tasks.len());

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tasks.abort_all();
                return None;
            }

            joined = tasks.join_next() => match joined {
                Some(Ok(batch)) => batches.push(batch),
                Some(Err(e)) => warn!(error = %e, "provider task failed to join"),
                None => break,
            }
        }
    }

    // Completion order must not influence dedup tie-breaks.
    batches.sort_by_key(|(index, _)| *index);

    let results = ranking::rank(
        batches.into_iter().map(|(_, candidates)| candidates),
        Some(options.max_results),
    );

    debug!(
        query = %gate.query,
        results = results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "full query"
    );
    Some(results)
}

/// One provider call on the blocking pool, bounded by `budget`.
async fn call_provider(
    provider: Arc<dyn Provider>,
    ctx: SearchContext,
    budget: Duration,
) -> Vec<Candidate> {
    let name = provider.name().to_string();
    let cancel = ctx.cancellation().clone();
    let worker = tokio::task::spawn_blocking(move || provider.search(&ctx));

    let outcome = match tokio::time::timeout(budget, worker).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ProviderError::failed(&name, join_error.to_string())),
        Err(_) => {
            // Ask the provider to stop; whatever it returns later is dropped.
            cancel.cancel();
            Err(ProviderError::Timeout {
                provider: name.clone(),
                after: budget,
            })
        }
    };

    match outcome {
        Ok(candidates) => candidates,
        Err(ProviderError::Cancelled) => {
            debug!(provider = %name, "provider cancelled");
            Vec::new()
        }
        Err(e) => {
            warn!(provider = %name, error = %e, "provider contributed nothing");
            Vec::new()
        }
    }
}

/// Apply-side holder for the list the UI is showing.
///
/// Accepts a result set only if its generation is not older than the one
/// already shown, so results applied in completion order never regress.
#[derive(Debug, Default)]
pub struct LatestResults {
    inner: Mutex<(Generation, Vec<Candidate>)>,
}

impl LatestResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the results were applied.
    pub fn apply(&self, generation: Generation, results: Vec<Candidate>) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if generation < inner.0 {
            debug!(
                generation = generation.value(),
                shown = inner.0.value(),
                "ignoring older results"
            );
            return false;
        }
        *inner = (generation, results);
        true
    }

    pub fn generation(&self) -> Generation {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    pub fn snapshot(&self) -> Vec<Candidate> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .clone()
    }
}
