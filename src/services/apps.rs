//! Installed applications, discovered through the platform and cached.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tracing::debug;

use crate::core::{fuzzy, Action, Candidate, Category};
use crate::error::ProviderResult;
use crate::platform::{AppEntry, Platform};
use crate::search::{Provider, ProviderKind, SearchContext};

use super::UsageTracker;

/// Keyword matches count for less than name matches.
const KEYWORD_DISCOUNT: f64 = 0.8;

/// Apps listed for an empty query
const EMPTY_QUERY_LIMIT: usize = 8;

pub struct AppProvider {
    platform: Arc<dyn Platform>,
    apps: RwLock<Vec<AppEntry>>,
    usage: Arc<UsageTracker>,
}

impl AppProvider {
    /// Discover applications now; searches only read the cache.
    pub fn new(platform: Arc<dyn Platform>, usage: Arc<UsageTracker>) -> Self {
        let provider = Self {
            platform,
            apps: RwLock::new(Vec::new()),
            usage,
        };
        provider.refresh();
        provider
    }

    /// Re-run discovery and replace the cache. Returns the number of apps.
    pub fn refresh(&self) -> usize {
        let started = Instant::now();
        let apps = self.platform.discover_apps();
        let count = apps.len();

        *self.apps.write().unwrap_or_else(PoisonError::into_inner) = apps;
        debug!(
            count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexed applications"
        );
        count
    }

    pub fn len(&self) -> usize {
        self.apps.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn candidate(&self, app: &AppEntry, match_score: f64) -> Candidate {
        let mut candidate = Candidate::new(
            Category::Application,
            app.id.clone(),
            app.name.clone(),
            Action::Launch(app.path.clone()),
        )
        .with_match_score(match_score)
        .with_usage(self.usage.score(Category::Application, &app.id));

        if let Some(description) = &app.description {
            candidate = candidate.with_subtitle(description.clone());
        }
        candidate
    }

    fn match_score(query: &str, app: &AppEntry) -> f64 {
        let by_name = fuzzy::score(query, &app.name);
        let by_keyword = app
            .keywords
            .iter()
            .map(|keyword| fuzzy::score(query, keyword) * KEYWORD_DISCOUNT)
            .fold(0.0, f64::max);
        by_name.max(by_keyword)
    }
}

impl Provider for AppProvider {
    fn name(&self) -> &str {
        "apps"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fast
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let apps = self.apps.read().unwrap_or_else(PoisonError::into_inner);

        if ctx.is_empty() {
            let by_id: HashMap<&str, &AppEntry> =
                apps.iter().map(|app| (app.id.as_str(), app)).collect();

            return Ok(self
                .usage
                .most_used(Category::Application, EMPTY_QUERY_LIMIT)
                .into_iter()
                .filter_map(|(id, _)| by_id.get(id.as_str()).map(|app| self.candidate(app, 0.0)))
                .collect());
        }

        Ok(apps
            .iter()
            .filter_map(|app| {
                let score = Self::match_score(&ctx.query, app);
                (score > 0.0).then(|| self.candidate(app, score))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::RecordingPlatform;
    use std::path::PathBuf;

    fn app(id: &str, name: &str, keywords: &[&str]) -> AppEntry {
        AppEntry {
            id: id.into(),
            name: name.into(),
            path: PathBuf::from(format!("/usr/share/applications/{id}.desktop")),
            description: Some(format!("{name} application")),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn provider(usage: Arc<UsageTracker>) -> AppProvider {
        let platform = RecordingPlatform {
            apps: vec![
                app("google-chrome", "Google Chrome", &["browser", "web"]),
                app("org.gnome.Terminal", "Terminal", &["shell", "console"]),
                app("firefox", "Firefox", &["browser", "internet"]),
            ],
            ..Default::default()
        };
        AppProvider::new(Arc::new(platform), usage)
    }

    #[test]
    fn test_name_match() {
        let provider = provider(Arc::new(UsageTracker::in_memory()));
        assert_eq!(provider.len(), 3);

        let results = provider.search(&SearchContext::new("chr")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].identity, "google-chrome");
        assert_eq!(
            results[0].action,
            Action::Launch(PathBuf::from("/usr/share/applications/google-chrome.desktop"))
        );
    }

    #[test]
    fn test_keyword_match_is_discounted() {
        let provider = provider(Arc::new(UsageTracker::in_memory()));
        let results = provider.search(&SearchContext::new("browser")).unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!((result.match_score - KEYWORD_DISCOUNT).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_query_lists_most_used() {
        let usage = Arc::new(UsageTracker::in_memory());
        usage.record(Category::Application, "firefox");
        usage.record(Category::Application, "firefox");
        usage.record(Category::Application, "org.gnome.Terminal");
        usage.record(Category::Application, "uninstalled-app");

        let provider = provider(Arc::clone(&usage));
        let results = provider.search(&SearchContext::new("")).unwrap();
        let ids: Vec<&str> = results.iter().map(|c| c.identity.as_str()).collect();

        assert_eq!(ids, vec!["firefox", "org.gnome.Terminal"]);
        assert!(results.iter().all(|c| c.match_score == 0.0 && c.usage > 0.0));
    }

    #[test]
    fn test_empty_query_without_history_is_empty() {
        let provider = provider(Arc::new(UsageTracker::in_memory()));
        assert!(provider.search(&SearchContext::new("")).unwrap().is_empty());
    }
}
