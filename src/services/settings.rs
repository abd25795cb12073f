//! Settings entry and configured toggles.
//!
//! A toggle runs its `enable` or `disable` command depending on its current
//! state, which this provider tracks in memory. Toggles marked
//! `always_visible` are listed even when the query does not match them.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use crate::config::ToggleConfig;
use crate::core::{fuzzy, Action, Candidate, Category};
use crate::error::ProviderResult;
use crate::search::{Provider, ProviderKind, SearchContext};

const SETTINGS_TITLE: &str = "Orbit Settings";

pub struct SettingsProvider {
    config_path: PathBuf,
    toggles: Vec<ToggleConfig>,
    /// Names of toggles currently on
    active: RwLock<HashSet<String>>,
}

impl SettingsProvider {
    pub fn new(config_path: PathBuf, toggles: Vec<ToggleConfig>) -> Self {
        Self {
            config_path,
            toggles,
            active: RwLock::new(HashSet::new()),
        }
    }

    fn toggle_identity(toggle: &ToggleConfig) -> String {
        format!("toggle:{}", toggle.name.to_lowercase())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&name.to_lowercase())
    }

    /// Record a toggle's new state after its command was started.
    pub fn set_active(&self, name: &str, active: bool) {
        let mut states = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if active {
            states.insert(name.to_lowercase());
        } else {
            states.remove(&name.to_lowercase());
        }
    }

    /// Flip the state of the toggle behind `identity`; returns the new state.
    pub fn flip(&self, identity: &str) -> Option<bool> {
        let toggle = self
            .toggles
            .iter()
            .find(|t| Self::toggle_identity(t) == identity)?;
        let now_active = !self.is_active(&toggle.name);
        self.set_active(&toggle.name, now_active);
        Some(now_active)
    }

    fn settings_candidate(&self, ctx: &SearchContext) -> Option<Candidate> {
        let score = fuzzy::score(&ctx.query, SETTINGS_TITLE)
            .max(fuzzy::score(&ctx.query, "preferences") * 0.9)
            .max(fuzzy::score(&ctx.query, "config") * 0.9);
        if score <= 0.0 {
            return None;
        }

        Some(
            Candidate::new(
                Category::Setting,
                "settings:config",
                SETTINGS_TITLE,
                Action::Launch(self.config_path.clone()),
            )
            .with_subtitle(self.config_path.display().to_string())
            .with_match_score(score),
        )
    }

    fn toggle_candidate(&self, toggle: &ToggleConfig, ctx: &SearchContext) -> Option<Candidate> {
        let score = if ctx.is_empty() {
            0.0
        } else {
            fuzzy::score(&ctx.query, &toggle.name)
        };
        if score <= 0.0 && !toggle.always_visible {
            return None;
        }

        let active = self.is_active(&toggle.name);
        let (command, subtitle) = if active {
            (&toggle.disable, "On · select to turn off")
        } else {
            (&toggle.enable, "Off · select to turn on")
        };

        Some(
            Candidate::new(
                Category::Toggle,
                Self::toggle_identity(toggle),
                toggle.name.clone(),
                Action::RunShellCommand(command.clone()),
            )
            .with_subtitle(subtitle)
            .with_match_score(score)
            .with_active(active),
        )
    }
}

impl Provider for SettingsProvider {
    fn name(&self) -> &str {
        "settings"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fast
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let settings = if ctx.is_empty() {
            None
        } else {
            self.settings_candidate(ctx)
        };

        let toggles = self
            .toggles
            .iter()
            .filter_map(|toggle| self.toggle_candidate(toggle, ctx));

        Ok(settings.into_iter().chain(toggles).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SettingsProvider {
        SettingsProvider::new(
            PathBuf::from("/home/me/.config/orbit/config.toml"),
            vec![
                ToggleConfig {
                    name: "Do Not Disturb".into(),
                    enable: "dnd on".into(),
                    disable: "dnd off".into(),
                    always_visible: true,
                },
                ToggleConfig {
                    name: "Night Light".into(),
                    enable: "night on".into(),
                    disable: "night off".into(),
                    always_visible: false,
                },
            ],
        )
    }

    #[test]
    fn test_settings_entry() {
        let results = provider().search(&SearchContext::new("settings")).unwrap();
        let settings = results.iter().find(|c| c.category == Category::Setting).unwrap();
        assert_eq!(settings.title, SETTINGS_TITLE);
        assert!(matches!(settings.action, Action::Launch(_)));
    }

    #[test]
    fn test_always_visible_toggle_has_zero_score_when_unmatched() {
        let results = provider().search(&SearchContext::new("settings")).unwrap();
        let dnd = results
            .iter()
            .find(|c| c.identity == "toggle:do not disturb")
            .unwrap();

        assert_eq!(dnd.match_score, 0.0);
        assert!(!results.iter().any(|c| c.title == "Night Light"));
    }

    #[test]
    fn test_empty_query_lists_only_always_visible() {
        let results = provider().search(&SearchContext::new("")).unwrap();
        let titles: Vec<&str> = results.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Do Not Disturb"]);
    }

    #[test]
    fn test_toggle_state_switches_command() {
        let provider = provider();
        let ctx = SearchContext::new("night");

        let off = provider.search(&ctx).unwrap();
        let night = off.iter().find(|c| c.title == "Night Light").unwrap();
        assert!(!night.is_active);
        assert_eq!(night.action, Action::RunShellCommand("night on".into()));

        assert_eq!(provider.flip(&night.identity), Some(true));

        let on = provider.search(&ctx).unwrap();
        let night = on.iter().find(|c| c.title == "Night Light").unwrap();
        assert!(night.is_active);
        assert_eq!(night.action, Action::RunShellCommand("night off".into()));
    }

    #[test]
    fn test_flip_unknown_toggle() {
        assert_eq!(provider().flip("toggle:missing"), None);
    }
}
