//! Clipboard history provider.
//!
//! A bounded ring buffer, most recent first. Re-copying an existing entry
//! moves it to the front instead of duplicating it.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::core::{fuzzy, Action, Candidate, Category};
use crate::error::ProviderResult;
use crate::platform::Platform;
use crate::search::{Provider, ProviderKind, SearchContext};

/// Queries starting with one of these list the history.
const KEYWORDS: &[&str] = &["clip", "clipboard", "paste"];

const PREVIEW_CHARS: usize = 60;

/// Entry in clipboard history
#[derive(Debug, Clone)]
pub struct ClipboardEntry {
    pub content: String,
    pub copied_at: Instant,
}

impl ClipboardEntry {
    /// First non-blank line, at most `max_chars` characters.
    pub fn preview(&self, max_chars: usize) -> String {
        let line = self
            .content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();

        let mut preview: String = line.chars().take(max_chars).collect();
        if line.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }

    pub fn time_ago(&self) -> String {
        let secs = self.copied_at.elapsed().as_secs();

        if secs < 60 {
            "just now".to_string()
        } else if secs < 3600 {
            format!("{}m ago", secs / 60)
        } else if secs < 86400 {
            format!("{}h ago", secs / 3600)
        } else {
            format!("{}d ago", secs / 86400)
        }
    }
}

#[derive(Debug)]
struct History {
    items: VecDeque<ClipboardEntry>,
    max_items: usize,
    last_seen: Option<String>,
}

impl History {
    fn add(&mut self, content: String) -> bool {
        if content.trim().is_empty() {
            return false;
        }

        self.items.retain(|item| item.content != content);
        self.items.push_front(ClipboardEntry {
            content,
            copied_at: Instant::now(),
        });
        self.items.truncate(self.max_items);
        true
    }
}

pub struct ClipboardProvider {
    history: Mutex<History>,
}

impl ClipboardProvider {
    pub fn new(max_items: usize) -> Self {
        let max_items = max_items.max(1);
        Self {
            history: Mutex::new(History {
                items: VecDeque::with_capacity(max_items),
                max_items,
                last_seen: None,
            }),
        }
    }

    /// Add content to history. Returns false for blank content.
    pub fn record(&self, content: impl Into<String>) -> bool {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(content.into())
    }

    /// Read the system clipboard and record it if it changed since the last poll.
    pub fn poll(&self, platform: &dyn Platform) -> bool {
        let Some(content) = platform.clipboard_read() else {
            return false;
        };

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.last_seen.as_deref() == Some(content.as_str()) {
            return false;
        }
        history.last_seen = Some(content.clone());
        history.add(content)
    }

    /// Snapshot of the history, most recent first.
    pub fn entries(&self) -> Vec<ClipboardEntry> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn candidate(entry: &ClipboardEntry, match_score: f64, recency: f64) -> Candidate {
        let chars = entry.content.chars().count();
        Candidate::new(
            Category::Clipboard,
            entry.content.clone(),
            entry.preview(PREVIEW_CHARS),
            Action::CopyToClipboard(entry.content.clone()),
        )
        .with_subtitle(format!("{} · {chars} chars", entry.time_ago()))
        .with_match_score(match_score)
        .with_usage(recency)
    }
}

impl Provider for ClipboardProvider {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fast
    }

    fn should_search(&self, ctx: &SearchContext) -> bool {
        !ctx.is_empty()
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let total = history.items.len();
        // Newer entries win ties
        let recency = |index: usize| (total - index) as f64;

        if KEYWORDS.contains(&ctx.keyword.as_str()) {
            let filter = ctx.remaining.as_deref().unwrap_or_default().to_lowercase();
            return Ok(history
                .items
                .iter()
                .enumerate()
                .filter(|(_, entry)| filter.is_empty() || entry.content.to_lowercase().contains(&filter))
                .map(|(index, entry)| Self::candidate(entry, 1.0, recency(index)))
                .collect());
        }

        // Outside keyword mode only substring hits count; a subsequence
        // match somewhere in a long paste is noise.
        Ok(history
            .items
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.content.to_lowercase().contains(&ctx.query_lower))
            .map(|(index, entry)| {
                let score = fuzzy::score(&ctx.query, &entry.preview(PREVIEW_CHARS)).max(0.1);
                Self::candidate(entry, score, recency(index))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::RecordingPlatform;

    fn titles(results: &[Candidate]) -> Vec<&str> {
        results.iter().map(|c| c.title.as_str()).collect()
    }

    #[test]
    fn test_most_recent_first() {
        let provider = ClipboardProvider::new(5);
        provider.record("first");
        provider.record("second");
        provider.record("third");

        let contents: Vec<String> = provider.entries().into_iter().map(|e| e.content).collect();
        assert_eq!(contents, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_recopy_moves_to_front() {
        let provider = ClipboardProvider::new(5);
        provider.record("first");
        provider.record("second");
        provider.record("first");

        assert_eq!(provider.len(), 2);
        assert_eq!(provider.entries()[0].content, "first");
    }

    #[test]
    fn test_bounded() {
        let provider = ClipboardProvider::new(3);
        for i in 0..10 {
            provider.record(format!("item {i}"));
        }
        assert_eq!(provider.len(), 3);
        assert_eq!(provider.entries()[0].content, "item 9");
    }

    #[test]
    fn test_blank_content_is_ignored() {
        let provider = ClipboardProvider::new(3);
        assert!(!provider.record("   \n"));
        assert!(provider.is_empty());
    }

    #[test]
    fn test_keyword_lists_history() {
        let provider = ClipboardProvider::new(10);
        provider.record("hello world");
        provider.record("goodbye world");
        provider.record("hello there");

        let all = provider.search(&SearchContext::new("clip")).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].usage > all[2].usage);

        let filtered = provider.search(&SearchContext::new("paste hello")).unwrap();
        assert_eq!(titles(&filtered), vec!["hello there", "hello world"]);
    }

    #[test]
    fn test_plain_query_needs_substring() {
        let provider = ClipboardProvider::new(10);
        provider.record("cargo test --release");
        provider.record("a long sentence with c h r scattered");

        let results = provider.search(&SearchContext::new("test")).unwrap();
        assert_eq!(titles(&results), vec!["cargo test --release"]);
        assert!(results[0].match_score > 0.0);
        assert_eq!(
            results[0].action,
            Action::CopyToClipboard("cargo test --release".into())
        );
    }

    #[test]
    fn test_preview_is_char_safe() {
        let entry = ClipboardEntry {
            content: "\n  héllo wörld ünïcode text that is long".to_string(),
            copied_at: Instant::now(),
        };
        assert_eq!(entry.preview(5), "héllo...");
    }

    #[test]
    fn test_poll_records_changes_once() {
        let platform = RecordingPlatform::default();
        *platform.clipboard.lock().unwrap() = Some("copied text".into());

        let provider = ClipboardProvider::new(5);
        assert!(provider.poll(&platform));
        assert!(!provider.poll(&platform));
        assert_eq!(provider.len(), 1);
    }
}
