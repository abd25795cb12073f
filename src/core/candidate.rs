//! The result shape every provider emits.
//!
//! A [`Candidate`] is built fresh by its provider for each query and is never
//! modified afterwards. The rank score is attached by the ranking pipeline,
//! which produces a new value rather than editing the provider's.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Source category of a candidate. Determines the base score tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Application,
    SystemCommand,
    Calculation,
    Bookmark,
    Clipboard,
    Process,
    File,
    Setting,
    Toggle,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Application,
        Category::SystemCommand,
        Category::Calculation,
        Category::Bookmark,
        Category::Clipboard,
        Category::Process,
        Category::File,
        Category::Setting,
        Category::Toggle,
    ];

    /// Human-readable group label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Application => "Application",
            Category::SystemCommand => "System",
            Category::Calculation => "Calculator",
            Category::Bookmark => "Bookmark",
            Category::Clipboard => "Clipboard",
            Category::Process => "Process",
            Category::File => "File",
            Category::Setting => "Setting",
            Category::Toggle => "Toggle",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happens when a candidate is activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Action {
    /// Launch an application bundle / desktop entry, or open a file with its default app
    Launch(PathBuf),

    /// Open a URL in the default browser
    OpenUrl(String),

    /// Put text on the clipboard
    CopyToClipboard(String),

    /// Show the item in the file manager
    Reveal(PathBuf),

    /// Run a command through the shell
    RunShellCommand(String),

    /// Nothing to do (e.g. a bookmark still waiting for its query)
    NoOp,
}

impl Action {
    /// The action used for an Alternate activation when none was given explicitly.
    pub fn default_alternate(&self) -> Action {
        match self {
            Action::Launch(path) | Action::Reveal(path) => Action::Reveal(path.clone()),
            Action::OpenUrl(url) => Action::CopyToClipboard(url.clone()),
            other => other.clone(),
        }
    }
}

/// One result produced by a provider for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub title: String,
    pub subtitle: Option<String>,
    pub category: Category,
    /// Stable dedup key: bundle/desktop id, absolute path, URL...
    pub identity: String,
    /// Fuzzy match quality in [0, 1]. 0 means included unconditionally.
    pub match_score: f64,
    pub action: Action,
    pub alternate: Option<Action>,
    /// Usage counter / frecency provided by the owning provider (tie-break only)
    pub usage: f64,
    /// UI flag (e.g. a toggle that is on); ignored by ranking
    pub is_active: bool,
    rank_score: Option<f64>,
}

impl Candidate {
    pub fn new(
        category: Category,
        identity: impl Into<String>,
        title: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            category,
            identity: identity.into(),
            match_score: 0.0,
            action,
            alternate: None,
            usage: 0.0,
            is_active: false,
            rank_score: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        let subtitle = subtitle.into();
        self.subtitle = (!subtitle.is_empty()).then_some(subtitle);
        self
    }

    /// Set the match score, clamped into [0, 1]. NaN becomes 0.
    pub fn with_match_score(mut self, score: f64) -> Self {
        self.match_score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_alternate(mut self, action: Action) -> Self {
        self.alternate = Some(action);
        self
    }

    pub fn with_usage(mut self, usage: f64) -> Self {
        self.usage = usage.max(0.0);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Rank score assigned by the ranking pipeline. `None` until weighted.
    pub fn rank_score(&self) -> Option<f64> {
        self.rank_score
    }

    /// Action for an Alternate activation.
    pub fn alternate_action(&self) -> Action {
        self.alternate
            .clone()
            .unwrap_or_else(|| self.action.default_alternate())
    }

    /// Dedup key for the identity pass.
    pub fn key(&self) -> (Category, &str) {
        (self.category, &self.identity)
    }

    /// Display label normalised for the cross-provider label pass:
    /// lowercased, trimmed, inner whitespace collapsed.
    pub fn normalized_label(&self) -> String {
        self.title
            .split_whitespace()
            .flat_map(|word| word.chars().chain(std::iter::once(' ')))
            .flat_map(char::to_lowercase)
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    /// A new candidate carrying `score` as its rank score.
    pub(crate) fn into_ranked(self, score: f64) -> Candidate {
        Candidate {
            rank_score: Some(score),
            ..self
        }
    }
}
