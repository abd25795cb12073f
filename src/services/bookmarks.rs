//! Bookmarks and aliases from the config file.
//!
//! A bookmark opens a URL; `{query}` in the URL is filled with the text
//! typed after the bookmark's keyword. An alias runs a shell command.

use std::sync::Arc;

use crate::config::{AliasConfig, BookmarkConfig};
use crate::core::{fuzzy, Action, Candidate, Category};
use crate::error::ProviderResult;
use crate::search::{Provider, ProviderKind, SearchContext};

use super::UsageTracker;

pub struct BookmarkProvider {
    bookmarks: Vec<BookmarkConfig>,
    aliases: Vec<AliasConfig>,
    usage: Arc<UsageTracker>,
}

impl BookmarkProvider {
    pub fn new(
        bookmarks: Vec<BookmarkConfig>,
        aliases: Vec<AliasConfig>,
        usage: Arc<UsageTracker>,
    ) -> Self {
        Self {
            bookmarks,
            aliases,
            usage,
        }
    }

    /// Best of matching the query against the name and the keyword.
    fn text_score(ctx: &SearchContext, name: &str, keyword: &str) -> f64 {
        fuzzy::score(&ctx.query, name).max(fuzzy::score(&ctx.query, keyword))
    }

    fn bookmark_candidate(&self, bookmark: &BookmarkConfig, ctx: &SearchContext) -> Option<Candidate> {
        let keyword_hit = ctx.keyword == bookmark.keyword.to_lowercase();
        let identity = format!("bookmark:{}", bookmark.keyword);
        let usage = self.usage.score(Category::Bookmark, &identity);

        let base = |title: String, action: Action| {
            Candidate::new(Category::Bookmark, identity.clone(), title, action).with_usage(usage)
        };

        if bookmark.has_query_placeholder() {
            if let (true, Some(query)) = (keyword_hit, ctx.remaining.as_deref()) {
                let url = bookmark.resolve_url(query);
                return Some(
                    base(format!("{}: {query}", bookmark.name), Action::OpenUrl(url.clone()))
                        .with_subtitle(url)
                        .with_match_score(1.0),
                );
            }

            let score = if keyword_hit {
                1.0
            } else {
                Self::text_score(ctx, &bookmark.name, &bookmark.keyword)
            };
            return (score > 0.0).then(|| {
                base(bookmark.name.clone(), Action::NoOp)
                    .with_subtitle(format!("Type \"{} <query>\"", bookmark.keyword))
                    .with_match_score(score)
            });
        }

        let score = if keyword_hit {
            1.0
        } else {
            Self::text_score(ctx, &bookmark.name, &bookmark.keyword)
        };
        (score > 0.0).then(|| {
            base(bookmark.name.clone(), Action::OpenUrl(bookmark.url.clone()))
                .with_subtitle(bookmark.url.clone())
                .with_match_score(score)
        })
    }

    fn alias_candidate(&self, alias: &AliasConfig, ctx: &SearchContext) -> Option<Candidate> {
        let score = if ctx.query_lower == alias.keyword.to_lowercase() {
            1.0
        } else {
            Self::text_score(ctx, &alias.name, &alias.keyword)
        };
        if score <= 0.0 {
            return None;
        }

        let identity = format!("alias:{}", alias.keyword);
        Some(
            Candidate::new(
                Category::Bookmark,
                identity.clone(),
                alias.name.clone(),
                Action::RunShellCommand(alias.target.clone()),
            )
            .with_subtitle(alias.target.clone())
            .with_match_score(score)
            .with_usage(self.usage.score(Category::Bookmark, &identity))
            .with_alternate(Action::CopyToClipboard(alias.target.clone())),
        )
    }
}

impl Provider for BookmarkProvider {
    fn name(&self) -> &str {
        "bookmarks"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fast
    }

    fn should_search(&self, ctx: &SearchContext) -> bool {
        !ctx.is_empty() && !(self.bookmarks.is_empty() && self.aliases.is_empty())
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let bookmarks = self
            .bookmarks
            .iter()
            .filter_map(|bookmark| self.bookmark_candidate(bookmark, ctx));
        let aliases = self
            .aliases
            .iter()
            .filter_map(|alias| self.alias_candidate(alias, ctx));

        Ok(bookmarks.chain(aliases).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> BookmarkProvider {
        BookmarkProvider::new(
            vec![
                BookmarkConfig {
                    keyword: "gh".into(),
                    name: "GitHub Search".into(),
                    url: "https://github.com/search?q={query}".into(),
                },
                BookmarkConfig {
                    keyword: "docs".into(),
                    name: "Rust Docs".into(),
                    url: "https://doc.rust-lang.org".into(),
                },
            ],
            vec![AliasConfig {
                keyword: "up".into(),
                name: "Update System".into(),
                target: "sudo apt update".into(),
            }],
            Arc::new(UsageTracker::in_memory()),
        )
    }

    #[test]
    fn test_keyword_with_query_resolves_url() {
        let results = provider().search(&SearchContext::new("gh tokio select")).unwrap();
        let hit = results
            .iter()
            .find(|c| c.identity == "bookmark:gh")
            .unwrap();

        assert_eq!(hit.title, "GitHub Search: tokio select");
        assert_eq!(
            hit.action,
            Action::OpenUrl("https://github.com/search?q=tokio%20select".into())
        );
        assert_eq!(hit.match_score, 1.0);
    }

    #[test]
    fn test_placeholder_without_query_is_noop() {
        let results = provider().search(&SearchContext::new("gh")).unwrap();
        let hit = results.iter().find(|c| c.identity == "bookmark:gh").unwrap();
        assert_eq!(hit.action, Action::NoOp);
        assert_eq!(hit.match_score, 1.0);
    }

    #[test]
    fn test_plain_bookmark_by_name() {
        let results = provider().search(&SearchContext::new("rust d")).unwrap();
        let hit = results.iter().find(|c| c.identity == "bookmark:docs").unwrap();
        assert_eq!(hit.action, Action::OpenUrl("https://doc.rust-lang.org".into()));
        assert!(hit.match_score > 0.5);
    }

    #[test]
    fn test_alias_runs_command() {
        let results = provider().search(&SearchContext::new("up")).unwrap();
        let hit = results.iter().find(|c| c.identity == "alias:up").unwrap();

        assert_eq!(hit.category, Category::Bookmark);
        assert_eq!(hit.action, Action::RunShellCommand("sudo apt update".into()));
        assert_eq!(hit.match_score, 1.0);
        assert_eq!(
            hit.alternate_action(),
            Action::CopyToClipboard("sudo apt update".into())
        );
    }

    #[test]
    fn test_no_match() {
        assert!(provider().search(&SearchContext::new("zzzz")).unwrap().is_empty());
        assert!(!provider().should_search(&SearchContext::new("")));
    }
}
