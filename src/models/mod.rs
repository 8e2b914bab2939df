pub mod item;
pub mod recommendation;

pub use item::{ExclusionReason, ItemId, NormalizedItem, RawItemRecord, RawTag, RawTitle};
pub use recommendation::{BatchReport, Candidate, Recommendation, RecommendationMap};
