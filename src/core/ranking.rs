//! Merge, dedup, weight, sort, truncate.
//!
//! Pure functions over provider batches; the aggregator calls [`rank`] once
//! every provider has answered or timed out. Truncation is always the last
//! step so a duplicate can never push the right item out of the list.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::candidate::{Candidate, Category};
use super::weighting;

/// Collapse candidates sharing `(category, identity)`, keeping the higher
/// match score. On a tie the earlier candidate stays.
pub fn dedup_identity(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut slots: HashMap<(Category, String), usize> = HashMap::with_capacity(candidates.len());
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.entry((candidate.category, candidate.identity.clone())) {
            Entry::Occupied(slot) => {
                let index = *slot.get();
                if candidate.match_score > kept[index].match_score {
                    kept[index] = candidate;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

/// Attach rank scores. Returns new candidates; the inputs are consumed.
pub fn weigh(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let score = weighting::rank_score(&candidate);
            candidate.into_ranked(score)
        })
        .collect()
}

/// Collapse weighted candidates whose normalised label is identical, keeping
/// the one that sorts first (highest rank score).
pub fn dedup_labels(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(candidates.len());
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.entry(candidate.normalized_label()) {
            Entry::Occupied(slot) => {
                let index = *slot.get();
                if weighting::compare(&candidate, &kept[index]).is_lt() {
                    kept[index] = candidate;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

/// Full pipeline over the batches of every provider that answered.
///
/// `limit` of `None` keeps everything.
pub fn rank<I>(batches: I, limit: Option<usize>) -> Vec<Candidate>
where
    I: IntoIterator<Item = Vec<Candidate>>,
{
    // Identity dedup over the merged set also covers duplicates inside each batch.
    let merged: Vec<Candidate> = batches.into_iter().flatten().collect();
    let unique = dedup_identity(merged);
    let mut ranked = dedup_labels(weigh(unique));

    ranked.sort_by(weighting::compare);

    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Action;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn app(identity: &str, title: &str, score: f64) -> Candidate {
        Candidate::new(
            Category::Application,
            identity,
            title,
            Action::Launch(PathBuf::from(format!("/apps/{identity}"))),
        )
        .with_match_score(score)
    }

    fn file(path: &str, score: f64) -> Candidate {
        let name = path.rsplit('/').next().unwrap_or(path);
        Candidate::new(Category::File, path, name, Action::Launch(PathBuf::from(path)))
            .with_match_score(score)
    }

    #[test]
    fn test_identity_dedup_keeps_higher_match() {
        let ranked = rank(
            vec![
                vec![app("com.app.safari", "Safari", 0.6)],
                vec![app("com.app.safari", "Safari", 0.9)],
            ],
            None,
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "Safari");
        assert_eq!(ranked[0].match_score, 0.9);
    }

    #[test]
    fn test_identity_dedup_ignores_label_differences() {
        let ranked = dedup_identity(vec![
            app("org.gnome.Terminal", "Terminal", 0.4),
            app("org.gnome.Terminal", "GNOME Terminal", 0.7),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "GNOME Terminal");
    }

    #[test]
    fn test_same_identity_different_category_survives_identity_pass() {
        let bookmark = Candidate::new(
            Category::Bookmark,
            "https://example.com",
            "Example",
            Action::OpenUrl("https://example.com".into()),
        );
        let clip = Candidate::new(
            Category::Clipboard,
            "https://example.com",
            "https://example.com",
            Action::CopyToClipboard("https://example.com".into()),
        );
        assert_eq!(dedup_identity(vec![bookmark, clip]).len(), 2);
    }

    #[test]
    fn test_label_dedup_keeps_highest_rank() {
        let ranked = rank(
            vec![
                vec![file("/home/me/Chrome", 1.0)],
                vec![app("google-chrome", "Chrome", 0.8)],
            ],
            None,
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].category, Category::Application);
        assert_eq!(
            ranked[0].rank_score(),
            Some(weighting::base_score(Category::Application) + 0.8 * weighting::MATCH_WEIGHT)
        );
    }

    #[test]
    fn test_application_outranks_file_for_same_query() {
        let query = "chr";
        let chrome = app("google-chrome", "Chrome", crate::core::fuzzy::score(query, "Chrome"));
        let notes = file(
            "/home/me/chrome_notes.txt",
            crate::core::fuzzy::score(query, "chrome_notes.txt"),
        );
        assert!(chrome.match_score > 0.0 && notes.match_score > 0.0);

        let ranked = rank(vec![vec![notes], vec![chrome]], None);
        assert_eq!(ranked[0].title, "Chrome");
        assert_eq!(ranked[1].title, "chrome_notes.txt");
    }

    #[test]
    fn test_truncation_after_dedup() {
        // Without dedup first, the three duplicates would fill the top three
        // slots and push "Files" out.
        let ranked = rank(
            vec![
                vec![app("a", "Terminal", 0.9), app("b", "Files", 0.5)],
                vec![app("a", "Terminal", 0.95)],
                vec![app("c", "terminal", 0.8)],
            ],
            Some(2),
        );

        let titles: Vec<&str> = ranked.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Terminal", "Files"]);
        assert_eq!(ranked[0].match_score, 0.95);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::<Vec<Candidate>>::new(), Some(10)).is_empty());
        assert!(rank(vec![Vec::new(), Vec::new()], None).is_empty());
    }

    #[test]
    fn test_unconditional_candidates_rank_by_tier() {
        let toggle = Candidate::new(Category::Toggle, "dnd", "Do Not Disturb", Action::NoOp);
        let setting = Candidate::new(Category::Setting, "settings", "Settings", Action::NoOp);
        let ranked = rank(vec![vec![toggle, setting]], None);
        assert_eq!(ranked[0].category, Category::Setting);
    }

    fn arb_candidate() -> impl Strategy<Value = Candidate> {
        (
            prop::sample::select(Category::ALL.to_vec()),
            0u8..6,
            0u8..6,
            0.0f64..=1.0,
            0u8..3,
        )
            .prop_map(|(category, id, label, score, usage)| {
                Candidate::new(
                    category,
                    format!("id-{id}"),
                    format!("Label {label}"),
                    Action::NoOp,
                )
                .with_match_score(score)
                .with_usage(f64::from(usage))
            })
    }

    fn arb_batches() -> impl Strategy<Value = Vec<Vec<Candidate>>> {
        prop::collection::vec(prop::collection::vec(arb_candidate(), 0..8), 0..4)
    }

    proptest! {
        #[test]
        fn prop_one_entry_per_identity(batches in arb_batches()) {
            let best: HashMap<(Category, String), f64> = batches
                .iter()
                .flatten()
                .fold(HashMap::new(), |mut acc, c| {
                    let slot = acc.entry((c.category, c.identity.clone())).or_insert(c.match_score);
                    *slot = slot.max(c.match_score);
                    acc
                });

            let unique = dedup_identity(batches.into_iter().flatten().collect());
            let mut seen = HashSet::new();
            for c in &unique {
                prop_assert!(seen.insert((c.category, c.identity.clone())));
                prop_assert_eq!(c.match_score, best[&(c.category, c.identity.clone())]);
            }
            prop_assert_eq!(unique.len(), best.len());
        }

        #[test]
        fn prop_one_entry_per_label_with_highest_rank(batches in arb_batches()) {
            let weighted = weigh(dedup_identity(batches.clone().into_iter().flatten().collect()));
            let mut best: HashMap<String, f64> = HashMap::new();
            for c in &weighted {
                let score = c.rank_score().unwrap_or_default();
                let slot = best.entry(c.normalized_label()).or_insert(score);
                *slot = slot.max(score);
            }

            let ranked = rank(batches, None);
            let mut labels = HashSet::new();
            for c in &ranked {
                prop_assert!(labels.insert(c.normalized_label()));
                prop_assert_eq!(c.rank_score(), Some(best[&c.normalized_label()]));
            }
            prop_assert_eq!(ranked.len(), best.len());
        }

        #[test]
        fn prop_rank_is_idempotent(batches in arb_batches(), limit in 1usize..12) {
            let first = rank(batches.clone(), Some(limit));
            let second = rank(batches, Some(limit));
            prop_assert_eq!(&first, &second);

            let again = rank(vec![first.clone()], Some(limit));
            prop_assert_eq!(first, again);
        }

        #[test]
        fn prop_output_is_sorted(batches in arb_batches()) {
            let ranked = rank(batches, None);
            for pair in ranked.windows(2) {
                prop_assert!(!weighting::compare(&pair[0], &pair[1]).is_gt());
            }
        }
    }
}
