//! Statistical tier.
//!
//! [`StatisticalClassifier`] wraps an optional [`TextModel`] supplied by a
//! [`ClassifierBackend`].  The backend is asked for its model once; every
//! concurrent caller of [`StatisticalClassifier::initialize`] waits on the
//! same load and observes the same outcome.  When no model is available the
//! classifier keeps answering with a zero-confidence `"unknown"` result so the
//! router treats the tier as declined.

mod backend;
mod naive_bayes;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::OnceCell;

use fastpath_kernel::ClassificationResult;

pub use backend::{BackendStatus, ClassifierBackend, FileBackend, ModelBackend};
pub use naive_bayes::{ARTIFACT_VERSION, ClassCounts, ModelArtifact, NaiveBayesModel};

/// Number of runner-up labels reported alongside the top prediction.
const MAX_ALTERNATIVES: usize = 2;

/// A bag-of-words text classifier.
pub trait TextModel: Send + Sync {
    /// Every label the model can predict.
    fn labels(&self) -> Vec<String>;

    /// Rank labels for already-normalised text, most probable first.
    ///
    /// Returns an empty vector when the text carries no usable signal.
    fn predict(&self, normalized: &str) -> Vec<(String, f64)>;
}

/// Lifecycle of the statistical tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierState {
    Uninitialized,
    Initializing,
    Ready,
    Unavailable,
}

/// Lazily-loaded statistical classifier.
pub struct StatisticalClassifier {
    backend: Option<Arc<dyn ClassifierBackend>>,
    initializing: AtomicBool,
    loaded: OnceCell<BackendStatus>,
}

impl StatisticalClassifier {
    pub fn new(backend: Arc<dyn ClassifierBackend>) -> Self {
        Self {
            backend: Some(backend),
            initializing: AtomicBool::new(false),
            loaded: OnceCell::new(),
        }
    }

    /// A classifier with no backend.  It becomes unavailable on first use.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            initializing: AtomicBool::new(false),
            loaded: OnceCell::new(),
        }
    }

    /// Load the model.  Idempotent: only the first call reaches the backend.
    pub async fn initialize(&self) {
        self.loaded
            .get_or_init(|| async {
                self.initializing.store(true, Ordering::Release);
                let status = match &self.backend {
                    Some(backend) => {
                        tracing::debug!(backend = backend.name(), "loading classifier model");
                        backend.load().await
                    }
                    None => BackendStatus::Unavailable("no classifier backend configured".into()),
                };
                match &status {
                    BackendStatus::Ready(model) => {
                        tracing::info!(labels = model.labels().len(), "statistical classifier ready");
                    }
                    BackendStatus::Unavailable(reason) => {
                        tracing::warn!(reason = %reason, "statistical classifier unavailable");
                    }
                }
                self.initializing.store(false, Ordering::Release);
                status
            })
            .await;
    }

    pub fn state(&self) -> ClassifierState {
        match self.loaded.get() {
            Some(BackendStatus::Ready(_)) => ClassifierState::Ready,
            Some(BackendStatus::Unavailable(_)) => ClassifierState::Unavailable,
            None if self.initializing.load(Ordering::Acquire) => ClassifierState::Initializing,
            None => ClassifierState::Uninitialized,
        }
    }

    /// Whether a model is loaded and ready to classify.
    pub fn is_available(&self) -> bool {
        matches!(self.loaded.get(), Some(BackendStatus::Ready(_)))
    }

    /// Why the tier is unavailable, once loading has concluded.
    pub fn get_error(&self) -> Option<&str> {
        match self.loaded.get() {
            Some(BackendStatus::Unavailable(reason)) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Labels of the loaded model, empty until ready.
    pub fn labels(&self) -> Vec<String> {
        match self.loaded.get() {
            Some(BackendStatus::Ready(model)) => model.labels(),
            _ => Vec::new(),
        }
    }

    /// Classify `query`.  Never fails; see [`ClassificationResult::unknown`].
    pub fn classify(&self, query: &str) -> ClassificationResult {
        let Some(BackendStatus::Ready(model)) = self.loaded.get() else {
            return ClassificationResult::unknown();
        };

        let normalized = normalize(query);
        if normalized.is_empty() {
            return ClassificationResult::unknown();
        }

        let mut ranked = model.predict(&normalized).into_iter();
        let Some((intent, confidence)) = ranked.next() else {
            return ClassificationResult::unknown();
        };

        let result = ClassificationResult {
            intent,
            confidence: clamp_probability(confidence),
            alternatives: ranked
                .take(MAX_ALTERNATIVES)
                .map(|(label, p)| (label, clamp_probability(p)))
                .collect(),
        };
        tracing::trace!(
            intent = %result.intent,
            confidence = result.confidence,
            "statistical classification"
        );
        result
    }
}

impl std::fmt::Debug for StatisticalClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticalClassifier")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("state", &self.state())
            .finish()
    }
}

/// Lowercase, replace punctuation with spaces and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    struct FixedModel(Vec<(String, f64)>);

    impl TextModel for FixedModel {
        fn labels(&self) -> Vec<String> {
            self.0.iter().map(|(l, _)| l.clone()).collect()
        }

        fn predict(&self, _normalized: &str) -> Vec<(String, f64)> {
            self.0.clone()
        }
    }

    struct SlowBackend {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl ClassifierBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        async fn load(&self) -> BackendStatus {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            BackendStatus::Ready(Arc::new(FixedModel(vec![("help".into(), 1.0)])))
        }
    }

    fn ranked(pairs: &[(&str, f64)]) -> Arc<dyn TextModel> {
        Arc::new(FixedModel(
            pairs.iter().map(|(l, p)| (l.to_string(), *p)).collect(),
        ))
    }

    #[test]
    fn normalize_strips_punctuation() {
        assert_eq!(normalize("  Turn it UP!!  please?"), "turn it up please");
        assert_eq!(normalize("what's-the time"), "what s the time");
        assert_eq!(normalize("...!"), "");
    }

    #[tokio::test]
    async fn uninitialized_classifier_returns_unknown() {
        let clf = StatisticalClassifier::new(Arc::new(ModelBackend::new(ranked(&[("a", 1.0)]))));
        assert_eq!(clf.state(), ClassifierState::Uninitialized);
        assert!(clf.classify("anything").is_unknown());
    }

    #[tokio::test]
    async fn disabled_classifier_is_unavailable() {
        let clf = StatisticalClassifier::disabled();
        clf.initialize().await;
        assert!(!clf.is_available());
        assert_eq!(clf.state(), ClassifierState::Unavailable);
        assert_eq!(clf.get_error(), Some("no classifier backend configured"));
        let result = clf.classify("turn the volume up");
        assert_eq!(result.intent, "unknown");
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn reports_top_label_and_two_alternatives() {
        let model = ranked(&[("a", 0.6), ("b", 0.2), ("c", 0.15), ("d", 0.05)]);
        let clf = StatisticalClassifier::new(Arc::new(ModelBackend::new(model)));
        clf.initialize().await;

        let result = clf.classify("Hello there");
        assert_eq!(result.intent, "a");
        assert_eq!(result.confidence, 0.6);
        assert_eq!(
            result.alternatives,
            vec![("b".to_string(), 0.2), ("c".to_string(), 0.15)]
        );
        assert_eq!(clf.get_error(), None);
    }

    #[tokio::test]
    async fn empty_prediction_is_unknown() {
        let clf = StatisticalClassifier::new(Arc::new(ModelBackend::new(ranked(&[]))));
        clf.initialize().await;
        assert!(clf.is_available());
        assert!(clf.classify("anything").is_unknown());
        assert!(clf.classify("?!").is_unknown());
    }

    #[tokio::test]
    async fn concurrent_initialize_loads_once() {
        let backend = Arc::new(SlowBackend {
            loads: AtomicUsize::new(0),
        });
        let clf = Arc::new(StatisticalClassifier::new(backend.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let clf = Arc::clone(&clf);
            handles.push(tokio::spawn(async move {
                clf.initialize().await;
                clf.is_available()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        clf.initialize().await;
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert_eq!(clf.labels(), vec!["help"]);
    }
}
