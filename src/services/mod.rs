//! Search providers and the state they share.
//!
//! - [`apps`] - installed applications
//! - [`bookmarks`] - configured bookmarks and aliases
//! - [`calculator`] / [`units`] - expression and unit conversion evaluators
//! - [`clipboard`] - clipboard history
//! - [`file_search`] - files and folders (slow)
//! - [`processes`] - running processes (slow)
//! - [`settings`] - settings entry and toggles
//! - [`system_commands`] - lock, sleep, restart and friends
//! - [`frecency`] - usage counters feeding the ranking tie-break

pub mod apps;
pub mod bookmarks;
pub mod calculator;
pub mod clipboard;
pub mod file_search;
pub mod format;
pub mod frecency;
pub mod processes;
pub mod settings;
pub mod system_commands;
pub mod units;

use std::sync::Arc;

pub use apps::AppProvider;
pub use bookmarks::BookmarkProvider;
pub use calculator::CalculatorProvider;
pub use clipboard::ClipboardProvider;
pub use file_search::FileProvider;
pub use frecency::UsageTracker;
pub use processes::ProcessProvider;
pub use settings::SettingsProvider;
pub use system_commands::SystemCommandProvider;
pub use units::UnitProvider;

use tracing::debug;

use crate::aggregator::{Aggregator, AggregatorOptions};
use crate::config::Config;
use crate::core::{Candidate, Category};
use crate::platform::Platform;
use crate::search::Provider;

/// Every provider built from one config, plus handles to the stateful ones.
pub struct Services {
    pub usage: Arc<UsageTracker>,
    pub apps: Arc<AppProvider>,
    pub clipboard: Arc<ClipboardProvider>,
    pub settings: Arc<SettingsProvider>,
    providers: Vec<Arc<dyn Provider>>,
}

impl Services {
    pub fn new(config: &Config, platform: Arc<dyn Platform>, usage: Arc<UsageTracker>) -> Self {
        let apps = Arc::new(AppProvider::new(Arc::clone(&platform), Arc::clone(&usage)));
        let clipboard = Arc::new(ClipboardProvider::new(config.clipboard.max_items));
        let settings = Arc::new(SettingsProvider::new(
            Config::config_path(),
            config.toggles.clone(),
        ));

        // Order breaks identity ties: earlier providers win
        let providers: Vec<Arc<dyn Provider>> = vec![
            apps.clone(),
            Arc::new(SystemCommandProvider::new(platform.as_ref(), Arc::clone(&usage))),
            settings.clone(),
            Arc::new(BookmarkProvider::new(
                config.bookmarks.clone(),
                config.aliases.clone(),
                Arc::clone(&usage),
            )),
            Arc::new(CalculatorProvider),
            Arc::new(UnitProvider),
            clipboard.clone(),
            Arc::new(FileProvider::new(config.files.clone())),
            Arc::new(ProcessProvider::new(config.processes.enabled)),
        ];
        debug!(count = providers.len(), apps = apps.len(), "providers ready");

        Self {
            usage,
            apps,
            clipboard,
            settings,
            providers,
        }
    }

    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.providers.clone()
    }

    /// An aggregator over every provider, tuned by `[search]`.
    pub fn aggregator(&self, config: &Config) -> Aggregator {
        Aggregator::new(self.providers(), AggregatorOptions::from(&config.search))
    }

    /// Provider-side bookkeeping after a candidate's action succeeded.
    pub fn activated(&self, candidate: &Candidate) {
        if candidate.category == Category::Toggle {
            if let Some(active) = self.settings.flip(&candidate.identity) {
                debug!(toggle = %candidate.identity, active, "toggle flipped");
            }
        }
    }
}
