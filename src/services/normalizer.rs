use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::{
    config::EngineConfig,
    models::{ExclusionReason, NormalizedItem, RawItemRecord, RawTag},
};

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("valid regex"));

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&mdash;", "-"),
    ("&ndash;", "-"),
    // last, so "&amp;lt;" decodes to the literal "&lt;"
    ("&amp;", "&"),
];

/// Outcome of normalizing one record
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Item(NormalizedItem),
    Excluded(ExclusionReason),
}

/// Cleans a raw record into the meta/description text pair used for vectorization
///
/// Pure function of the record and the quality/tag thresholds in `config`.
pub fn normalize(record: &RawItemRecord, config: &EngineConfig) -> Normalized {
    let Some(id) = record.id else {
        return Normalized::Excluded(ExclusionReason::MissingId);
    };

    let Some(quality_score) = record.quality_score else {
        return Normalized::Excluded(ExclusionReason::MissingQualityScore);
    };

    if quality_score <= config.min_quality_score {
        return Normalized::Excluded(ExclusionReason::BelowQualityThreshold {
            score: quality_score,
        });
    }

    let title = record
        .title
        .as_ref()
        .and_then(|title| title.resolve())
        .unwrap_or_default()
        .to_string();

    let genres = record.genres.iter().flatten().map(String::as_str);
    let tags = record
        .tags
        .iter()
        .flatten()
        .filter(|tag| tag_passes_gate(tag, config.min_tag_rank))
        .map(|tag| tag.name.as_str());

    Normalized::Item(NormalizedItem {
        id,
        title,
        meta_terms: clean_terms(genres.chain(tags)),
        description: record
            .synopsis
            .as_deref()
            .map(strip_markup)
            .unwrap_or_default(),
        quality_score,
        popularity: record.popularity.unwrap_or(0),
    })
}

/// Non-spoiler tags at or above the rank threshold; a missing rank counts as 0
fn tag_passes_gate(tag: &RawTag, min_tag_rank: u32) -> bool {
    !tag.is_spoiler.unwrap_or(false) && tag.rank.unwrap_or(0) >= min_tag_rank
}

/// Lowercases and whitespace-collapses category names, dropping blanks and repeats
fn clean_terms<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|name| collapse_whitespace(&name.to_lowercase()))
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Removes markup tags and decodes common entities
///
/// Never fails: an unterminated `<` is left in place as ordinary text.
pub fn strip_markup(raw: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(raw, " ");
    let mut text = decode_numeric_entities(&without_tags);
    for (entity, replacement) in HTML_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    collapse_whitespace(&text)
}

/// Decodes `&#NNN;` and `&#xHH;`; references to invalid code points are kept as written
fn decode_numeric_entities(text: &str) -> String {
    NUMERIC_ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(decimal)) => decimal.as_str().parse::<u32>().ok(),
                (None, None) => None,
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawTitle;

    fn record(id: u64, score: Option<i64>) -> RawItemRecord {
        RawItemRecord {
            id: Some(id),
            title: Some(RawTitle::Plain("Cowboy Bebop".to_string())),
            synopsis: Some("Bounty hunters<br><br>in <i>space</i>.".to_string()),
            genres: Some(vec!["Action".to_string(), "Sci-Fi".to_string()]),
            tags: Some(vec![
                RawTag {
                    name: "Space Opera".to_string(),
                    rank: Some(90),
                    is_spoiler: Some(false),
                },
                RawTag {
                    name: "Tragedy".to_string(),
                    rank: Some(80),
                    is_spoiler: Some(true),
                },
                RawTag {
                    name: "Jazz".to_string(),
                    rank: Some(59),
                    is_spoiler: Some(false),
                },
                RawTag {
                    name: "Bounty Hunters".to_string(),
                    rank: Some(60),
                    is_spoiler: None,
                },
            ]),
            quality_score: score,
            popularity: Some(1000),
        }
    }

    fn item(normalized: Normalized) -> NormalizedItem {
        match normalized {
            Normalized::Item(item) => item,
            Normalized::Excluded(reason) => panic!("unexpected exclusion: {:?}", reason),
        }
    }

    #[test]
    fn test_quality_gate_is_strict() {
        let config = EngineConfig::default();

        assert_eq!(
            normalize(&record(1, Some(60)), &config),
            Normalized::Excluded(ExclusionReason::BelowQualityThreshold { score: 60 })
        );
        assert!(matches!(
            normalize(&record(1, Some(61)), &config),
            Normalized::Item(_)
        ));
    }

    #[test]
    fn test_missing_quality_score_is_excluded() {
        assert_eq!(
            normalize(&record(1, None), &EngineConfig::default()),
            Normalized::Excluded(ExclusionReason::MissingQualityScore)
        );
    }

    #[test]
    fn test_missing_id_is_excluded() {
        let mut raw = record(1, Some(80));
        raw.id = None;
        assert_eq!(
            normalize(&raw, &EngineConfig::default()),
            Normalized::Excluded(ExclusionReason::MissingId)
        );
    }

    #[test]
    fn test_meta_terms_keep_multi_word_tags_atomic() {
        let item = item(normalize(&record(1, Some(80)), &EngineConfig::default()));

        // spoiler and low-rank tags are gated out; rank 60 is the inclusive boundary
        assert_eq!(
            item.meta_terms,
            vec!["action", "sci-fi", "space opera", "bounty hunters"]
        );
    }

    #[test]
    fn test_tag_rank_threshold_is_configurable() {
        let config = EngineConfig {
            min_tag_rank: 50,
            ..EngineConfig::default()
        };
        let item = item(normalize(&record(1, Some(80)), &config));
        assert!(item.meta_terms.contains(&"jazz".to_string()));
    }

    #[test]
    fn test_description_markup_is_stripped() {
        let item = item(normalize(&record(1, Some(80)), &EngineConfig::default()));
        assert_eq!(item.description, "Bounty hunters in space .");
    }

    #[test]
    fn test_missing_optional_fields_become_empty() {
        let raw = RawItemRecord {
            id: Some(9),
            quality_score: Some(75),
            ..RawItemRecord::default()
        };
        let item = item(normalize(&raw, &EngineConfig::default()));
        assert_eq!(item.title, "");
        assert_eq!(item.description, "");
        assert!(item.meta_terms.is_empty());
        assert_eq!(item.popularity, 0);
    }

    #[test]
    fn test_duplicate_terms_kept_once() {
        let raw = RawItemRecord {
            id: Some(3),
            quality_score: Some(75),
            genres: Some(vec!["Drama".to_string(), " drama ".to_string(), "".to_string()]),
            ..RawItemRecord::default()
        };
        let item = item(normalize(&raw, &EngineConfig::default()));
        assert_eq!(item.meta_terms, vec!["drama"]);
    }

    #[test]
    fn test_strip_markup_tolerates_malformed_input() {
        assert_eq!(strip_markup("a < b and <b>bold"), "a < b and bold");
        assert_eq!(strip_markup("unterminated <i"), "unterminated <i");
        assert_eq!(strip_markup("Tom &amp; Jerry&#39;s"), "Tom & Jerry's");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn test_strip_markup_decodes_numeric_references() {
        assert_eq!(
            strip_markup("Gintoki&#039;s friend &#x27;Kagura&#x27; &#8212; &#X41;"),
            "Gintoki's friend 'Kagura' \u{2014} A"
        );
        assert_eq!(strip_markup("bad &#xD800; ref"), "bad &#xD800; ref");
        assert_eq!(strip_markup("&amp;#39;"), "&#39;");
    }
}
