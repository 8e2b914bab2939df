use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::{
    config::EngineConfig,
    error::{AppError, AppResult},
    models::{Candidate, NormalizedItem},
};

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{Alphabetic}\p{N}]+").expect("valid regex"));

/// Ordered title-normalization rules that reduce a title to its franchise key
#[derive(Debug, Clone)]
pub struct FranchiseRules {
    markers: Vec<Regex>,
    min_match_len: usize,
}

impl FranchiseRules {
    /// Compiles the marker patterns, case-insensitively, in the given order
    pub fn new(patterns: &[String], min_match_len: usize) -> AppResult<Self> {
        let markers = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        AppError::InvalidConfig(format!(
                            "invalid franchise marker {:?}: {}",
                            pattern, e
                        ))
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            markers,
            min_match_len,
        })
    }

    pub fn from_config(config: &EngineConfig) -> AppResult<Self> {
        Self::new(&config.franchise_markers, config.min_franchise_match_len)
    }

    /// Lowercased title with every marker removed and punctuation folded to single spaces
    ///
    /// A title made only of markers (e.g. "Movie") keeps its plain normalized form
    /// rather than collapsing to an empty key.
    pub fn franchise_key(&self, title: &str) -> String {
        let lowered = title.to_lowercase();
        let mut stripped = lowered.clone();
        for marker in &self.markers {
            stripped = marker.replace_all(&stripped, " ").into_owned();
        }

        let key = fold(&stripped);
        if key.is_empty() {
            fold(&lowered)
        } else {
            key
        }
    }

    /// Equal keys, or the shorter key appearing as a whole-word run inside the longer one
    ///
    /// The containment rule only applies when the shorter key is at least
    /// `min_match_len` characters long. Empty keys never match.
    pub fn same_franchise(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        if a == b {
            return true;
        }

        let (shorter, longer) = if a.chars().count() <= b.chars().count() {
            (a, b)
        } else {
            (b, a)
        };
        if shorter.chars().count() < self.min_match_len {
            return false;
        }

        format!(" {} ", longer).contains(&format!(" {} ", shorter))
    }
}

fn fold(text: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Franchise keys for every item of a batch, by row
#[derive(Debug, Clone)]
pub struct FranchiseIndex {
    rules: FranchiseRules,
    keys: Vec<String>,
}

impl FranchiseIndex {
    pub fn build(rules: FranchiseRules, items: &[NormalizedItem]) -> Self {
        let keys = items
            .iter()
            .map(|item| rules.franchise_key(&item.title))
            .collect();
        Self { rules, keys }
    }

    pub fn key(&self, row: usize) -> &str {
        &self.keys[row]
    }

    /// Removes candidates of the source's franchise, and later entries of any
    /// franchise already kept
    ///
    /// Candidates must be in rank order; the first member of each franchise wins.
    /// Survivors are pairwise distinct franchises, so applying the filter again
    /// returns the same list.
    pub fn filter_franchise_duplicates(
        &self,
        source_row: usize,
        candidates: &[Candidate],
    ) -> Vec<Candidate> {
        let source_key = self.key(source_row);
        let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if candidate.row == source_row {
                continue;
            }

            let key = self.key(candidate.row);
            if self.rules.same_franchise(source_key, key) {
                continue;
            }
            if kept
                .iter()
                .any(|other| self.rules.same_franchise(self.key(other.row), key))
            {
                continue;
            }

            kept.push(*candidate);
        }

        kept
    }
}
