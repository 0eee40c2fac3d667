//! Approximate matcher: roster pairs against the contact roster.

use tracing::{debug, info};

use rosterwatch_shared::{CandidatePair, MatchResult, RosterPair};

use crate::similarity;

/// Minimum similarity for a pairing to be accepted.
pub const SIMILARITY_CUTOFF: f64 = 0.9;

/// The best-scoring candidate for one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    /// Index into the candidate slice.
    pub index: usize,
    pub score: f64,
}

/// Find the highest-scoring candidate with `score >= cutoff`.
///
/// The candidate is the first sequence of the ratio; the score is not
/// symmetric. Equal scores keep the first candidate encountered.
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S], cutoff: f64) -> Option<BestMatch> {
    let mut best: Option<BestMatch> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let candidate = candidate.as_ref();
        let floor = best.map_or(cutoff, |b| b.score);
        if similarity::length_bound(query, candidate) < floor {
            continue;
        }
        let score = similarity::ratio(candidate, query);
        if score < cutoff {
            continue;
        }
        if best.is_none_or(|b| score > b.score) {
            best = Some(BestMatch { index, score });
        }
    }
    best
}

/// Match every roster pair, in roster order, against the candidate pairs.
pub fn match_pairs(roster: &[RosterPair], candidates: &[CandidatePair]) -> Vec<MatchResult> {
    let labels: Vec<String> = candidates.iter().map(|c| c.pair.label()).collect();

    let results: Vec<MatchResult> = roster
        .iter()
        .filter_map(|rp| {
            let query = rp.pair.label();
            let found = best_match(&query, &labels, SIMILARITY_CUTOFF)?;
            debug!(pair = %query, candidate = %labels[found.index], score = found.score, "pair matched");
            Some(MatchResult {
                pair: query,
                category: rp.category.clone(),
                score: found.score,
                contact: candidates[found.index].contact.clone(),
            })
        })
        .collect();

    info!(
        roster_pairs = roster.len(),
        candidates = candidates.len(),
        matched = results.len(),
        "matching complete"
    );
    results
}

/// Split match results into parallel `(pairs, categories)` columns.
pub fn into_columns(results: &[MatchResult]) -> (Vec<String>, Vec<String>) {
    results
        .iter()
        .map(|r| (r.pair.clone(), r.category.clone()))
        .unzip()
}
