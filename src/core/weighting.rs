//! Category tiers and the total order used to sort ranked candidates.

use std::cmp::Ordering;

use super::candidate::{Candidate, Category};

/// Multiplier applied to the fuzzy match score.
///
/// Larger than the widest tier gap (`Application` − `Toggle` = 90), so a
/// near-perfect low-tier match can still beat a weak high-tier one, while
/// candidates of equal match quality keep their tier order.
pub const MATCH_WEIGHT: f64 = 150.0;

/// Base score of each category tier.
pub fn base_score(category: Category) -> f64 {
    match category {
        Category::Application => 100.0,
        Category::SystemCommand => 90.0,
        Category::Calculation => 85.0,
        Category::Bookmark => 70.0,
        Category::Clipboard => 30.0,
        Category::Process => 25.0,
        Category::File => 20.0,
        Category::Setting => 15.0,
        Category::Toggle => 10.0,
    }
}

/// `base_score(category) + match_score × MATCH_WEIGHT`
pub fn rank_score(candidate: &Candidate) -> f64 {
    base_score(candidate.category) + candidate.match_score * MATCH_WEIGHT
}

/// Display order: rank descending, then usage descending, then label.
///
/// Category and identity close the order so equal-looking candidates still
/// sort the same way every time.
pub fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    let rank_a = a.rank_score().unwrap_or_else(|| rank_score(a));
    let rank_b = b.rank_score().unwrap_or_else(|| rank_score(b));

    rank_b
        .total_cmp(&rank_a)
        .then_with(|| b.usage.total_cmp(&a.usage))
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.identity.cmp(&b.identity))
}
