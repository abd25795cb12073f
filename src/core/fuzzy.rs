//! Subsequence fuzzy scorer.
//!
//! Every query character must appear in the label, in order, ignoring case.
//! Among all such alignments the best-scoring one is taken:
//!
//! ```text
//! per matched char          BASE
//! run extension             CONSECUTIVE_STEP × min(run length so far, CONSECUTIVE_CAP)
//! run starting at index 0   START_BONUS
//! run starting after sep.   WORD_START_BONUS      (sep = ' ' '-' '_' '.')
//! ```
//!
//! The raw score is divided by the score a label identical to the query would
//! get, plus `LENGTH_PENALTY` per label character the query leaves unmatched.
//! An exact (case-insensitive) match scores 1.0.

const BASE: f64 = 1.0;
const START_BONUS: f64 = 2.0;
// Must stay <= CONSECUTIVE_STEP so no alignment can beat an exact match.
const WORD_START_BONUS: f64 = 1.0;
const CONSECUTIVE_STEP: f64 = 1.0;
const CONSECUTIVE_CAP: usize = 3;
const LENGTH_PENALTY: f64 = 0.1;

/// Score how well `query` matches `label`, in [0, 1].
///
/// Returns 0.0 for an empty query or when `query` is not a subsequence of `label`.
pub fn score(query: &str, label: &str) -> f64 {
    let query = fold(query);
    let label = fold(label);

    if query.is_empty() || query.len() > label.len() {
        return 0.0;
    }

    let Some(raw) = best_alignment(&query, &label) else {
        return 0.0;
    };

    let bound = perfect_score(query.len()) + LENGTH_PENALTY * (label.len() - query.len()) as f64;
    (raw / bound).clamp(0.0, 1.0)
}

/// True when every query character appears in `label` in order.
pub fn is_subsequence(query: &str, label: &str) -> bool {
    let mut label = fold(label).into_iter();
    fold(query)
        .into_iter()
        .all(|qc| label.by_ref().any(|lc| lc == qc))
}

fn fold(s: &str) -> Vec<char> {
    s.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '-' | '_' | '.')
}

fn run_start_bonus(label: &[char], j: usize) -> f64 {
    if j == 0 {
        START_BONUS
    } else if is_separator(label[j - 1]) {
        WORD_START_BONUS
    } else {
        0.0
    }
}

fn extension_bonus(run: usize) -> f64 {
    CONSECUTIVE_STEP * run.min(CONSECUTIVE_CAP) as f64
}

/// Raw score of a label that equals the query exactly.
fn perfect_score(len: usize) -> f64 {
    let runs: f64 = (1..len).map(extension_bonus).sum();
    len as f64 * BASE + START_BONUS + runs
}

/// Best scores ending at one label index, slot `k` for a current run of
/// length `k + 1`. Runs of `CONSECUTIVE_CAP` or more share the last slot
/// since they earn the same extension bonus from then on.
type Cell = [Option<f64>; CONSECUTIVE_CAP];

fn cell_best(cell: &Cell) -> Option<f64> {
    cell.iter().flatten().copied().max_by(f64::total_cmp)
}

fn keep_max(slot: &mut Option<f64>, score: f64) {
    if slot.map_or(true, |best| score > best) {
        *slot = Some(score);
    }
}

/// Best raw score over all alignments, `None` if there is none.
///
/// `row[j]` holds, per run length, the best score with the current query
/// char matched at label index `j`.
fn best_alignment(query: &[char], label: &[char]) -> Option<f64> {
    let n = label.len();
    let mut prev: Vec<Cell> = vec![[None; CONSECUTIVE_CAP]; n];

    for (i, &qc) in query.iter().enumerate() {
        let mut row: Vec<Cell> = vec![[None; CONSECUTIVE_CAP]; n];
        // max over prev[..j - 1]: alignments that leave a gap before j
        let mut best_gapped: Option<f64> = None;

        for j in 0..n {
            if j >= 2 {
                if let Some(s) = cell_best(&prev[j - 2]) {
                    best_gapped = Some(best_gapped.map_or(s, |b| b.max(s)));
                }
            }

            if label[j] != qc {
                continue;
            }

            let fresh = BASE + run_start_bonus(label, j);
            let cell = &mut row[j];

            if i == 0 {
                cell[0] = Some(fresh);
                continue;
            }

            if let Some(s) = best_gapped {
                keep_max(&mut cell[0], s + fresh);
            }

            if j >= 1 {
                for (k, s) in prev[j - 1].iter().enumerate() {
                    let Some(s) = *s else { continue };
                    let run = k + 1;
                    let slot = run.min(CONSECUTIVE_CAP - 1);
                    keep_max(&mut cell[slot], s + BASE + extension_bonus(run));
                }
            }
        }

        prev = row;
    }

    prev.iter().filter_map(cell_best).max_by(f64::total_cmp)
}
