use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// Stable catalog identifier of an item
pub type ItemId = u64;

/// Title of a work, either a plain string or the catalog's localized form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawTitle {
    Plain(String),
    Localized {
        #[serde(default)]
        romaji: Option<String>,
        #[serde(default)]
        english: Option<String>,
        #[serde(default)]
        native: Option<String>,
    },
}

impl RawTitle {
    /// Resolves the display title, preferring romaji, then english, then native
    pub fn resolve(&self) -> Option<&str> {
        let candidates = match self {
            RawTitle::Plain(title) => [Some(title.as_str()), None, None],
            RawTitle::Localized {
                romaji,
                english,
                native,
            } => [romaji.as_deref(), english.as_deref(), native.as_deref()],
        };

        candidates
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|title| !title.is_empty())
    }
}

/// A categorical tag attached to an item, with relevance rank (0-100) and spoiler flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawTag {
    pub name: String,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default, alias = "isMediaSpoiler")]
    pub is_spoiler: Option<bool>,
}

/// Item record as supplied by the extraction collaborator
///
/// Every field is optional at the decoding level so that one malformed record
/// can be excluded by the normalizer instead of failing the whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawItemRecord {
    #[serde(default, alias = "anime_id")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: Option<RawTitle>,
    #[serde(default, alias = "description")]
    pub synopsis: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub genres: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tags: Option<Vec<RawTag>>,
    #[serde(default, alias = "averageScore")]
    pub quality_score: Option<i64>,
    #[serde(default)]
    pub popularity: Option<i64>,
}

/// Decodes a list element by element, dropping the elements that do not fit `T`
///
/// A value that is not a list at all decodes as `None`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(elements)) => Some(
            elements
                .into_iter()
                .filter_map(|element| serde_json::from_value(element).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// Item after cleanup, ready for vectorization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub id: ItemId,
    pub title: String,
    /// Cleaned genre and tag names; each entry is one atomic feature
    pub meta_terms: Vec<String>,
    /// Synopsis with markup removed, possibly empty
    pub description: String,
    pub quality_score: i64,
    pub popularity: i64,
}

/// Reason an input record never reaches vectorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    MissingId,
    MissingQualityScore,
    BelowQualityThreshold { score: i64 },
}
