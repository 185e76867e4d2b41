//! Model backends for the statistical tier.
//!
//! A backend is consulted exactly once, when the classifier initialises.  It
//! either hands over a ready [`TextModel`] or explains why none is available;
//! loading never fails the host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::TextModel;
use super::naive_bayes::NaiveBayesModel;
use crate::error::IntentError;

/// Outcome of a backend load.
#[derive(Clone)]
pub enum BackendStatus {
    Ready(Arc<dyn TextModel>),
    Unavailable(String),
}

impl std::fmt::Debug for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(model) => f
                .debug_tuple("Ready")
                .field(&model.labels().len())
                .finish(),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// Source of a statistical model.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Load the model.  Called at most once per classifier.
    async fn load(&self) -> BackendStatus;
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// Loads a [`NaiveBayesModel`] artifact from disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ClassifierBackend for FileBackend {
    fn name(&self) -> &str {
        "naive-bayes-file"
    }

    async fn load(&self) -> BackendStatus {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let err = IntentError::ModelNotFound {
                    path: self.path.display().to_string(),
                };
                return BackendStatus::Unavailable(err.to_string());
            }
            Err(e) => {
                let err = IntentError::ModelLoad {
                    reason: format!("{}: {e}", self.path.display()),
                };
                return BackendStatus::Unavailable(err.to_string());
            }
        };

        match NaiveBayesModel::from_json(&content) {
            Ok(model) => {
                tracing::debug!(
                    path = %self.path.display(),
                    labels = model.labels().len(),
                    vocabulary = model.vocabulary_size(),
                    "model artifact parsed"
                );
                BackendStatus::Ready(Arc::new(model))
            }
            Err(e) => BackendStatus::Unavailable(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Serves a model that is already in memory.
pub struct ModelBackend {
    model: Arc<dyn TextModel>,
}

impl ModelBackend {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ClassifierBackend for ModelBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn load(&self) -> BackendStatus {
        BackendStatus::Ready(Arc::clone(&self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("absent.json"));
        match backend.load().await {
            BackendStatus::Unavailable(reason) => {
                assert!(reason.starts_with("model artifact not found"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{ not json").unwrap();
        match FileBackend::new(&path).load().await {
            BackendStatus::Unavailable(reason) => assert!(reason.contains("malformed")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_file_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"version":1,"classes":{"help":{"documents":1,"tokens":{"help":1}}}}"#,
        )
        .unwrap();
        match FileBackend::new(&path).load().await {
            BackendStatus::Ready(model) => assert_eq!(model.labels(), vec!["help"]),
            other => panic!("expected Ready, got {other:?}"),
        }
    }
}
