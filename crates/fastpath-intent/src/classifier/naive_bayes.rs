//! Multinomial naive-Bayes text model.
//!
//! The artifact is a JSON document of per-class counts:
//!
//! ```json
//! {
//!   "version": 1,
//!   "classes": {
//!     "system_volume": { "documents": 12, "tokens": { "volume": 9, "louder": 3 } },
//!     "get_time":      { "documents": 8,  "tokens": { "time": 8, "clock": 2 } }
//!   }
//! }
//! ```
//!
//! Scores are computed in log space with Laplace smoothing and normalised to
//! probabilities with a softmax.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::TextModel;
use crate::error::{IntentError, Result};

/// Artifact format version understood by this loader.
pub const ARTIFACT_VERSION: u32 = 1;

/// On-disk representation of a trained model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub classes: BTreeMap<String, ClassCounts>,
}

/// Training counts for one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassCounts {
    /// Number of training documents carrying this label.
    pub documents: u64,
    /// Token occurrence counts across those documents.
    #[serde(default)]
    pub tokens: HashMap<String, u64>,
}

impl ModelArtifact {
    /// Accumulate counts from labelled, already-normalised samples.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut classes: BTreeMap<String, ClassCounts> = BTreeMap::new();
        for (label, text) in samples {
            let counts = classes.entry(label.to_string()).or_default();
            counts.documents += 1;
            for token in text.split_whitespace() {
                *counts.tokens.entry(token.to_string()).or_default() += 1;
            }
        }
        Self {
            version: ARTIFACT_VERSION,
            classes,
        }
    }
}

#[derive(Debug)]
struct ClassModel {
    label: String,
    log_prior: f64,
    log_likelihood: HashMap<String, f64>,
    log_unseen: f64,
}

/// A loaded naive-Bayes model ready for prediction.
#[derive(Debug)]
pub struct NaiveBayesModel {
    classes: Vec<ClassModel>,
    vocabulary: HashSet<String>,
}

impl NaiveBayesModel {
    /// Parse and validate a JSON artifact.
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json).map_err(|e| {
            IntentError::ModelLoad {
                reason: format!("malformed artifact: {e}"),
            }
        })?;
        Self::from_artifact(artifact)
    }

    /// Build a model from an in-memory artifact.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        if artifact.version != ARTIFACT_VERSION {
            return Err(IntentError::ModelLoad {
                reason: format!(
                    "unsupported artifact version {} (expected {ARTIFACT_VERSION})",
                    artifact.version
                ),
            });
        }
        if artifact.classes.is_empty() {
            return Err(IntentError::ModelLoad {
                reason: "artifact defines no classes".into(),
            });
        }
        if let Some((label, _)) = artifact.classes.iter().find(|(_, c)| c.documents == 0) {
            return Err(IntentError::ModelLoad {
                reason: format!("class `{label}` has no training documents"),
            });
        }

        let vocabulary: HashSet<String> = artifact
            .classes
            .values()
            .flat_map(|c| c.tokens.keys().cloned())
            .collect();
        let vocab_size = vocabulary.len() as f64;
        let total_documents: u64 = artifact.classes.values().map(|c| c.documents).sum();

        let classes = artifact
            .classes
            .into_iter()
            .map(|(label, counts)| {
                let token_total: u64 = counts.tokens.values().sum();
                let denominator = token_total as f64 + vocab_size;
                let log_likelihood = counts
                    .tokens
                    .into_iter()
                    .map(|(token, n)| (token, ((n as f64 + 1.0) / denominator).ln()))
                    .collect();
                ClassModel {
                    label,
                    log_prior: (counts.documents as f64 / total_documents as f64).ln(),
                    log_likelihood,
                    log_unseen: (1.0 / denominator).ln(),
                }
            })
            .collect();

        Ok(Self {
            classes,
            vocabulary,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

impl TextModel for NaiveBayesModel {
    fn labels(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.label.clone()).collect()
    }

    fn predict(&self, normalized: &str) -> Vec<(String, f64)> {
        let tokens: Vec<&str> = normalized
            .split_whitespace()
            .filter(|t| self.vocabulary.contains(*t))
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let scores: Vec<f64> = self
            .classes
            .iter()
            .map(|class| {
                class.log_prior
                    + tokens
                        .iter()
                        .map(|t| {
                            class
                                .log_likelihood
                                .get(*t)
                                .copied()
                                .unwrap_or(class.log_unseen)
                        })
                        .sum::<f64>()
            })
            .collect();

        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let norm: f64 = exp.iter().sum();

        let mut ranked: Vec<(String, f64)> = self
            .classes
            .iter()
            .zip(exp)
            .map(|(class, e)| (class.label.clone(), e / norm))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> NaiveBayesModel {
        let artifact = ModelArtifact::from_samples([
            ("system_volume", "turn the volume up"),
            ("system_volume", "make it louder"),
            ("system_volume", "volume down please"),
            ("get_time", "what time is it"),
            ("get_time", "tell me the time"),
            ("get_weather", "what is the weather like"),
            ("get_weather", "will it rain today"),
        ]);
        NaiveBayesModel::from_artifact(artifact).unwrap()
    }

    #[test]
    fn predicts_the_obvious_label() {
        let ranked = model().predict("louder volume");
        assert_eq!(ranked[0].0, "system_volume");
        assert!(ranked[0].1 > 0.5);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let ranked = model().predict("what is the time");
        let total: f64 = ranked.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn unknown_tokens_give_no_prediction() {
        assert!(model().predict("zzqx blorp").is_empty());
        assert!(model().predict("").is_empty());
    }

    #[test]
    fn labels_are_sorted() {
        assert_eq!(
            model().labels(),
            vec!["get_time", "get_weather", "system_volume"]
        );
    }

    #[test]
    fn parses_json_artifact() {
        let json = r#"{
            "version": 1,
            "classes": {
                "media_control": { "documents": 2, "tokens": { "pause": 2, "music": 1 } },
                "help": { "documents": 1, "tokens": { "help": 1 } }
            }
        }"#;
        let model = NaiveBayesModel::from_json(json).unwrap();
        assert_eq!(model.vocabulary_size(), 3);
        assert_eq!(model.predict("pause the music")[0].0, "media_control");
    }

    #[test]
    fn rejects_bad_artifacts() {
        assert!(NaiveBayesModel::from_json("not json").is_err());
        assert!(NaiveBayesModel::from_json(r#"{"version": 2, "classes": {}}"#).is_err());
        assert!(NaiveBayesModel::from_json(r#"{"version": 1, "classes": {}}"#).is_err());
        let err = NaiveBayesModel::from_json(
            r#"{"version": 1, "classes": {"a": {"documents": 0, "tokens": {}}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no training documents"));
    }
}
