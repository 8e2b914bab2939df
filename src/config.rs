use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// JSON or JSON Lines file of item records
    #[serde(default)]
    pub input_path: Option<PathBuf>,

    /// PostgreSQL connection URL, used when no input file is configured
    #[serde(default)]
    pub database_url: Option<String>,

    /// Where the recommendation artifact is published
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/recommendations.json")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

/// Tuning knobs of the similarity engine
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Items must score strictly above this to be a source or a candidate
    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: i64,

    /// Minimum tag relevance rank (0-100) for a tag to count as a meta feature
    #[serde(default = "default_min_tag_rank")]
    pub min_tag_rank: u32,

    #[serde(default = "default_w_meta")]
    pub w_meta: f64,

    #[serde(default = "default_w_desc")]
    pub w_desc: f64,

    /// Candidates kept per source before franchise filtering
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,

    /// Final recommendation list length
    #[serde(default = "default_result_count")]
    pub result_count: usize,

    /// Ordered, case-insensitive regex patterns stripped from titles to derive franchise keys
    #[serde(default = "default_franchise_markers")]
    pub franchise_markers: Vec<String>,

    /// Shortest franchise key allowed to collide by substring
    #[serde(default = "default_min_franchise_match_len")]
    pub min_franchise_match_len: usize,

    /// Candidates must score strictly above this to be published
    #[serde(default)]
    pub min_similarity: f64,

    /// Description terms must appear in at least this many synopses
    #[serde(default = "default_desc_min_df")]
    pub desc_min_df: usize,

    /// Cap on the description vocabulary (most frequent terms kept)
    #[serde(default)]
    pub desc_max_features: Option<usize>,

    /// Drop English stop words from descriptions
    #[serde(default = "default_desc_stop_words")]
    pub desc_stop_words: bool,
}

fn default_min_quality_score() -> i64 {
    60
}

fn default_min_tag_rank() -> u32 {
    60
}

fn default_w_meta() -> f64 {
    0.7
}

fn default_w_desc() -> f64 {
    0.3
}

fn default_candidate_k() -> usize {
    30
}

fn default_result_count() -> usize {
    10
}

fn default_min_franchise_match_len() -> usize {
    5
}

fn default_desc_min_df() -> usize {
    1
}

fn default_desc_stop_words() -> bool {
    true
}

/// Built-in sequel/season/format markers, applied in order
pub fn default_franchise_markers() -> Vec<String> {
    [
        // subtitle after ": ", " - " or a full-width colon; "Re:Zero" keeps its colon
        r"\s*:\s+.*$",
        r"\s*：.*$",
        r"\s+-\s+.*$",
        // parenthesised qualifiers, e.g. "(TV)" or "(2011)"
        r"\([^)]*\)",
        r"\b\d+(st|nd|rd|th)\s+season\b",
        r"\bseason\s*\d+\b",
        r"\bfinal\s+season\b",
        r"\bseason\b",
        r"\bpart\s*\d+\b",
        r"\bcour\s*\d+\b",
        r"\bthe\s+movie\b",
        r"\bmovie\b",
        r"\bfilm\b",
        r"\bgekijouban\b",
        r"\bov[ad]\b",
        r"\bona\b",
        r"\bspecials?\b",
        r"\bshipp[uū]+den\b",
        r"\bkanketsu-?hen\b",
        r"\bzoku\b",
        r"\bsequel\b",
        r"\b(ii|iii|iv)\b",
        r"\b\d+\s*$",
    ]
    .iter()
    .map(|pattern| pattern.to_string())
    .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_quality_score: default_min_quality_score(),
            min_tag_rank: default_min_tag_rank(),
            w_meta: default_w_meta(),
            w_desc: default_w_desc(),
            candidate_k: default_candidate_k(),
            result_count: default_result_count(),
            franchise_markers: default_franchise_markers(),
            min_franchise_match_len: default_min_franchise_match_len(),
            min_similarity: 0.0,
            desc_min_df: default_desc_min_df(),
            desc_max_features: None,
            desc_stop_words: default_desc_stop_words(),
        }
    }
}

impl EngineConfig {
    /// Load engine configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<EngineConfig>()
            .map_err(|e| anyhow::anyhow!("Failed to load engine config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot run with
    ///
    /// Weights that do not sum to 1.0 are accepted as given; only a warning is logged.
    /// Marker patterns are compiled later by the franchise rules, which report bad patterns.
    pub fn validate(&self) -> AppResult<()> {
        for (name, weight) in [("w_meta", self.w_meta), ("w_desc", self.w_desc)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AppError::InvalidConfig(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, weight
                )));
            }
        }

        if self.w_meta == 0.0 && self.w_desc == 0.0 {
            return Err(AppError::InvalidConfig(
                "w_meta and w_desc cannot both be zero".to_string(),
            ));
        }

        if (self.w_meta + self.w_desc - 1.0).abs() > 1e-9 {
            tracing::warn!(
                w_meta = self.w_meta,
                w_desc = self.w_desc,
                "Feature weights do not sum to 1.0; using them as given"
            );
        }

        if self.candidate_k == 0 {
            return Err(AppError::InvalidConfig(
                "candidate_k must be at least 1".to_string(),
            ));
        }

        if self.result_count == 0 {
            return Err(AppError::InvalidConfig(
                "result_count must be at least 1".to_string(),
            ));
        }

        if !self.min_similarity.is_finite() {
            return Err(AppError::InvalidConfig(
                "min_similarity must be finite".to_string(),
            ));
        }

        Ok(())
    }
}
