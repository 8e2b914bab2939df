pub mod batch;
pub mod combiner;
pub mod franchise;
pub mod normalizer;
pub mod pipeline;
pub mod publisher;
pub mod ranking;
pub mod similarity;
pub mod sources;
pub mod sparse;
pub mod vectorizer;

pub use batch::run_batch;
pub use pipeline::{BatchOutput, RecommendationPipeline};
pub use publisher::ArtifactPublisher;
