use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    config::EngineConfig,
    models::NormalizedItem,
    services::sparse::{SparseMatrix, SparseVector},
};

static WORD_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// Common English function words dropped from descriptions
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "even",
    "ever", "every", "few", "for", "from", "further", "get", "gets", "had", "has", "have",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however",
    "if", "in", "into", "is", "it", "its", "itself", "just", "may", "me", "might", "more",
    "most", "much", "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "on",
    "once", "one", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "upon", "very", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "within", "without", "would",
    "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// How a document is split into terms
#[derive(Debug, Clone)]
pub enum Analyzer {
    /// Each pre-cleaned term is one feature, never split on whitespace
    Atomic,
    /// Lowercased word tokens of two or more characters
    Words { stop_words: Option<HashSet<String>> },
}

impl Analyzer {
    pub fn words(remove_stop_words: bool) -> Self {
        let stop_words = remove_stop_words.then(|| {
            ENGLISH_STOP_WORDS
                .iter()
                .map(|word| word.to_string())
                .collect()
        });
        Analyzer::Words { stop_words }
    }

    fn analyze(&self, document: &Document<'_>) -> Vec<String> {
        match (self, document) {
            (Analyzer::Atomic, Document::Terms(terms)) => terms.to_vec(),
            (Analyzer::Atomic, Document::Text(text)) => vec![text.to_string()],
            (Analyzer::Words { stop_words }, document) => {
                let text = match document {
                    Document::Terms(terms) => terms.join(" "),
                    Document::Text(text) => text.to_string(),
                };
                let lowered = text.to_lowercase();
                WORD_TOKEN
                    .find_iter(&lowered)
                    .map(|token| token.as_str())
                    .filter(|token| {
                        stop_words
                            .as_ref()
                            .map_or(true, |words| !words.contains(*token))
                    })
                    .map(str::to_string)
                    .collect()
            }
        }
    }
}

/// One document of a corpus, either pre-split terms or free text
#[derive(Debug, Clone, Copy)]
pub enum Document<'a> {
    Terms(&'a [String]),
    Text(&'a str),
}

/// Corpus-derived vocabulary with its inverse document frequencies
///
/// Built once per batch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, u32>,
    idf: Vec<f64>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<u32> {
        self.index.get(term).copied()
    }

    pub fn idf(&self, index: u32) -> Option<f64> {
        self.idf.get(index as usize).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// TF-IDF weighting over a single feature space
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    analyzer: Analyzer,
    min_df: usize,
    max_features: Option<usize>,
}

impl TfidfVectorizer {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            min_df: 1,
            max_features: None,
        }
    }

    /// Terms found in fewer than `min_df` documents are ignored
    pub fn with_min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df.max(1);
        self
    }

    /// Keep only the `max_features` terms with the highest corpus frequency
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Learns the vocabulary from `documents` and returns their unit-norm TF-IDF rows
    ///
    /// Uses smoothed idf, `ln((1 + n) / (1 + df)) + 1`. Documents without any
    /// vocabulary term produce an all-zero row.
    pub fn fit_transform(&self, documents: &[Document<'_>]) -> (SparseMatrix, Vocabulary) {
        let analyzed: Vec<Vec<String>> = documents
            .iter()
            .map(|document| self.analyzer.analyze(document))
            .collect();

        let vocabulary = self.fit_vocabulary(&analyzed);
        let rows = analyzed
            .iter()
            .map(|tokens| {
                let entries = tokens
                    .iter()
                    .filter_map(|token| vocabulary.index_of(token))
                    .map(|index| (index, 1.0))
                    .collect();
                let counts = SparseVector::from_entries(entries);
                let weighted = counts
                    .entries()
                    .iter()
                    .map(|(index, tf)| (*index, tf * vocabulary.idf[*index as usize]))
                    .collect();
                SparseVector::from_entries(weighted).normalized()
            })
            .collect();

        (SparseMatrix::new(rows, vocabulary.len()), vocabulary)
    }

    fn fit_vocabulary(&self, analyzed: &[Vec<String>]) -> Vocabulary {
        let n_docs = analyzed.len();
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        let mut corpus_frequency: BTreeMap<&str, usize> = BTreeMap::new();

        for tokens in analyzed {
            let mut seen = HashSet::new();
            for token in tokens {
                *corpus_frequency.entry(token.as_str()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *document_frequency.entry(token.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut kept: Vec<(&str, usize)> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= self.min_df)
            .collect();

        if let Some(max_features) = self.max_features {
            if kept.len() > max_features {
                kept.sort_by(|(a_term, _), (b_term, _)| {
                    corpus_frequency[b_term]
                        .cmp(&corpus_frequency[a_term])
                        .then_with(|| a_term.cmp(b_term))
                });
                kept.truncate(max_features);
                kept.sort_by(|(a_term, _), (b_term, _)| a_term.cmp(b_term));
            }
        }

        let mut terms = Vec::with_capacity(kept.len());
        let mut index = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (position, (term, df)) in kept.into_iter().enumerate() {
            terms.push(term.to_string());
            index.insert(term.to_string(), position as u32);
            idf.push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
        }

        Vocabulary { terms, index, idf }
    }
}

/// Both fitted feature spaces for one batch, rows in item order
///
/// Meta and description vocabularies are separate dimension sets; they are
/// only ever joined by the weighted combiner.
#[derive(Debug, Clone)]
pub struct FittedSpaces {
    pub meta: SparseMatrix,
    pub description: SparseMatrix,
    pub meta_vocabulary: Vocabulary,
    pub description_vocabulary: Vocabulary,
}

/// Fits the meta and description TF-IDF spaces independently
#[derive(Debug, Clone)]
pub struct DualVectorizer {
    meta: TfidfVectorizer,
    description: TfidfVectorizer,
}

impl DualVectorizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            meta: TfidfVectorizer::new(Analyzer::Atomic),
            description: TfidfVectorizer::new(Analyzer::words(config.desc_stop_words))
                .with_min_df(config.desc_min_df)
                .with_max_features(config.desc_max_features),
        }
    }

    pub fn fit_transform(&self, items: &[NormalizedItem]) -> FittedSpaces {
        let meta_docs: Vec<Document<'_>> = items
            .iter()
            .map(|item| Document::Terms(&item.meta_terms))
            .collect();
        let description_docs: Vec<Document<'_>> = items
            .iter()
            .map(|item| Document::Text(&item.description))
            .collect();

        let (meta, meta_vocabulary) = self.meta.fit_transform(&meta_docs);
        let (description, description_vocabulary) =
            self.description.fit_transform(&description_docs);

        tracing::info!(
            items = items.len(),
            meta_terms = meta_vocabulary.len(),
            description_terms = description_vocabulary.len(),
            meta_nnz = meta.nnz(),
            description_nnz = description.nnz(),
            "Fitted TF-IDF feature spaces"
        );

        FittedSpaces {
            meta,
            description,
            meta_vocabulary,
            description_vocabulary,
        }
    }
}
