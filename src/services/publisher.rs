use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{
    error::{AppError, AppResult},
    models::RecommendationMap,
};

/// Publishes the recommendation map as a JSON document, replacing the previous one atomically
///
/// The new document is written to a temporary file next to the target and
/// renamed over it, so readers see either the old map or the complete new one.
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    path: PathBuf,
}

impl ArtifactPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn publish(&self, recommendations: &RecommendationMap) -> AppResult<u64> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&directory)?;

        let bytes = serde_json::to_vec_pretty(recommendations)?;
        let mut staged = NamedTempFile::new_in(&directory)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged
            .persist(&self.path)
            .map_err(|e| AppError::Io(e.error))?;

        tracing::info!(
            path = %self.path.display(),
            items = recommendations.len(),
            bytes = bytes.len(),
            "Published recommendation artifact"
        );

        Ok(bytes.len() as u64)
    }

    /// Reads back a previously published map
    pub fn load(&self) -> AppResult<RecommendationMap> {
        let contents = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recommendation;

    fn sample_map() -> RecommendationMap {
        let mut map = RecommendationMap::new();
        map.insert(1, vec![Recommendation { id: 2, score: 0.75 }]);
        map.insert(2, vec![]);
        map
    }

    #[test]
    fn test_publish_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("nested/recommendations.json"));

        publisher.publish(&sample_map()).unwrap();

        assert_eq!(publisher.load().unwrap(), sample_map());
    }

    #[test]
    fn test_publish_replaces_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("recommendations.json"));
        publisher.publish(&sample_map()).unwrap();

        let mut replacement = RecommendationMap::new();
        replacement.insert(7, vec![Recommendation { id: 8, score: 0.5 }]);
        publisher.publish(&replacement).unwrap();

        let loaded = publisher.load().unwrap();
        assert_eq!(loaded, replacement);
        assert!(!loaded.contains_key(&1));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("recommendations.json"));
        publisher.publish(&sample_map()).unwrap();

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_load_missing_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("absent.json"));
        assert!(matches!(publisher.load(), Err(AppError::Io(_))));
    }
}
