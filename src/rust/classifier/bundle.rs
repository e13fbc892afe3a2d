use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use super::embedding::{Embedder, OnnxEmbedder};
use super::error::ClassifierError;
use super::logistic::{LogisticClassifier, LogisticHead};
use super::tfidf::TfidfVectorizer;
use super::Classifier;
use crate::model_manager::ModelManager;
use crate::models::BuiltinModel;
use crate::runtime::RuntimeConfig;

pub const BUNDLE_VERSION: u32 = 1;

/// How texts are turned into features for the logistic head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmbedderSpec {
    /// Bag-of-words features; the fitted vectorizer travels inside the bundle.
    Tfidf(TfidfVectorizer),
    /// Sentence embeddings from the built-in MiniLM model.
    #[serde(rename = "minilm")]
    MiniLm,
}

impl EmbedderSpec {
    /// Built-in model that must be downloaded before this embedder can be instantiated.
    pub fn required_model(&self) -> Option<BuiltinModel> {
        match self {
            Self::Tfidf(_) => None,
            Self::MiniLm => Some(BuiltinModel::MiniLM),
        }
    }
}

/// A trained tone model as written by `linguame_train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: u32,
    pub embedder: EmbedderSpec,
    pub head: LogisticHead,
}

/// Ready-to-use collaborators for a `SessionService`.
pub struct LoadedModel {
    pub embedder: Arc<dyn Embedder>,
    pub classifier: Arc<dyn Classifier>,
}

impl ModelBundle {
    pub fn new(embedder: EmbedderSpec, head: LogisticHead) -> Self {
        Self { version: BUNDLE_VERSION, embedder, head }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ClassifierError> {
        let path = path.as_ref();
        let json = serde_json::to_string(self)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to serialize model: {}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create {:?}: {}", parent, e)))?;
        }
        fs::write(path, json)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to write model to {:?}: {}", path, e)))?;
        info!("Model saved to {:?}", path);
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to read model {:?}: {}", path, e)))?;
        let bundle: Self = serde_json::from_str(&json)
            .map_err(|e| ClassifierError::ModelError(format!("Invalid model file {:?}: {}", path, e)))?;
        if bundle.version != BUNDLE_VERSION {
            return Err(ClassifierError::ModelError(format!(
                "Unsupported model version {} (expected {})",
                bundle.version, BUNDLE_VERSION
            )));
        }
        info!("Loaded model from {:?} with {} classes", path, bundle.head.classes.len());
        Ok(bundle)
    }

    /// Builds the embedder and classifier this bundle describes.
    ///
    /// Fails if a class is missing from the label catalog or if the embedder
    /// dimension does not match the head.
    pub fn instantiate(self, manager: &ModelManager, config: &RuntimeConfig) -> Result<LoadedModel, ClassifierError> {
        let classifier = LogisticClassifier::new(self.head)?;
        let embedder: Arc<dyn Embedder> = match self.embedder {
            EmbedderSpec::Tfidf(vectorizer) => Arc::new(vectorizer),
            EmbedderSpec::MiniLm => Arc::new(OnnxEmbedder::from_builtin(BuiltinModel::MiniLM, manager, config)?),
        };

        let expected = classifier.head().n_features();
        if embedder.dimension() != expected {
            return Err(ClassifierError::BuildError(format!(
                "Embedder produces {} dimensions but the classifier expects {}",
                embedder.dimension(),
                expected
            )));
        }

        Ok(LoadedModel { embedder, classifier: Arc::new(classifier) })
    }
}
