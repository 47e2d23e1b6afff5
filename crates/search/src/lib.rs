//! gridwatch search: fuzzy ranking of cell text against a free-text query.
//!
//! Matching is subsequence-aware: query characters must appear in order but not
//! necessarily next to each other. Contiguous runs and early matches rank higher,
//! gaps rank lower. Ranks depend only on `(value, query)`.

#![forbid(unsafe_code)]

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Higher is better.
pub type Rank = i64;

/// Rank given to every value when the query is empty.
pub const NEUTRAL_RANK: Rank = 0;

pub struct Ranker {
    matcher: SkimMatcherV2,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ranker {
    pub fn new() -> Self {
        Self { matcher: SkimMatcherV2::default() }
    }

    /// Rank `value` against `query`; `None` means no match.
    pub fn score(&self, value: &str, query: &str) -> Option<Rank> {
        let q = query.trim();
        if q.is_empty() {
            return Some(NEUTRAL_RANK);
        }
        self.matcher.fuzzy_match(value, q)
    }

    /// Best rank among several field values; `None` when no field matches.
    pub fn best<'a, I>(&self, values: I, query: &str) -> Option<Rank>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if query.trim().is_empty() {
            return Some(NEUTRAL_RANK);
        }
        values.into_iter().filter_map(|v| self.score(v, query)).max()
    }
}

/// One-off scoring without keeping a ranker around.
pub fn score(value: &str, query: &str) -> Option<Rank> {
    Ranker::new().score(value, query)
}
