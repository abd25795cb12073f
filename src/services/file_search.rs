//! File and folder search over the configured roots.
//!
//! A plain query is fuzzy-matched against file names under every root. A
//! query starting with `~` or `/` is treated as a path: its longest existing
//! parent becomes the only root and the last segment becomes the term, so
//! `~/Documents/re` searches `~/Documents` for `re`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::FilesConfig;
use crate::core::{fuzzy, Action, Candidate, Category};
use crate::error::{ProviderError, ProviderResult};
use crate::search::{Provider, ProviderKind, SearchContext};

pub struct FileProvider {
    roots: Vec<PathBuf>,
    config: FilesConfig,
}

/// Where to look and what to look for.
#[derive(Debug, PartialEq)]
struct Scope {
    roots: Vec<PathBuf>,
    term: String,
    max_depth: usize,
}

impl FileProvider {
    pub fn new(config: FilesConfig) -> Self {
        Self {
            roots: config.expanded_roots(),
            config,
        }
    }

    fn scope(&self, query: &str) -> Option<Scope> {
        if !(query.starts_with('~') || query.starts_with('/')) {
            return Some(Scope {
                roots: self.roots.clone(),
                term: query.to_string(),
                max_depth: self.config.max_depth,
            });
        }

        let (base, term) = split_path_query(query)?;
        // Listing a directory only shows its direct children
        let max_depth = if term.is_empty() { 1 } else { self.config.max_depth };
        Some(Scope {
            roots: vec![base],
            term,
            max_depth,
        })
    }

    fn allows(&self, entry: &DirEntry, term: &str) -> bool {
        entry.depth() == 0
            || self.config.show_hidden
            || term.starts_with('.')
            || !entry.file_name().to_string_lossy().starts_with('.')
    }
}

/// Split a path-like query into its longest existing parent and the
/// remaining name fragment.
fn split_path_query(query: &str) -> Option<(PathBuf, String)> {
    let expanded = shellexpand::tilde(query).into_owned();

    if expanded.ends_with('/') {
        let mut base = PathBuf::from(&expanded);
        while !base.is_dir() {
            base = base.parent()?.to_path_buf();
        }
        return Some((base, String::new()));
    }

    let path = Path::new(&expanded);
    if path.is_dir() && query == "~" {
        return Some((path.to_path_buf(), String::new()));
    }

    let term = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut base = path.parent()?.to_path_buf();
    while !base.is_dir() {
        base = base.parent()?.to_path_buf();
    }
    Some((base, term))
}

/// `~/...` for paths under the home directory.
fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(suffix) = path.strip_prefix(&home) {
            return format!("~/{}", suffix.display());
        }
    }
    path.display().to_string()
}

impl Provider for FileProvider {
    fn name(&self) -> &str {
        "files"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Slow
    }

    fn should_search(&self, ctx: &SearchContext) -> bool {
        !ctx.is_empty() && self.config.max_results > 0
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let Some(scope) = self.scope(&ctx.query) else {
            return Ok(Vec::new());
        };

        let mut scanned = 0usize;
        let mut hits: Vec<(f64, PathBuf, bool)> = Vec::new();

        'roots: for root in &scope.roots {
            let walker = WalkDir::new(root)
                .max_depth(scope.max_depth)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| self.allows(entry, &scope.term));

            for entry in walker {
                if ctx.is_cancelled() {
                    debug!(scanned, "file scan cancelled");
                    return Err(ProviderError::Cancelled);
                }

                scanned += 1;
                if scanned > self.config.max_scanned {
                    break 'roots;
                }

                // Unreadable directories are skipped
                let Ok(entry) = entry else {
                    continue;
                };
                if entry.depth() == 0 {
                    continue;
                }

                let score = if scope.term.is_empty() {
                    0.0
                } else {
                    match fuzzy::score(&scope.term, &entry.file_name().to_string_lossy()) {
                        s if s > 0.0 => s,
                        _ => continue,
                    }
                };
                let is_dir = entry.file_type().is_dir();
                hits.push((score, entry.into_path(), is_dir));
            }
        }

        hits.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        hits.truncate(self.config.max_results);

        debug!(scanned, hits = hits.len(), "file scan finished");

        Ok(hits
            .into_iter()
            .map(|(score, path, is_dir)| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let location = display_path(&path);
                let subtitle = if is_dir {
                    format!("Folder · {location}")
                } else {
                    location
                };

                Candidate::new(
                    Category::File,
                    path.display().to_string(),
                    name,
                    Action::Launch(path),
                )
                .with_subtitle(subtitle)
                .with_match_score(score)
            })
            .collect())
    }
}
