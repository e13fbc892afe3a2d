use ndarray::Array1;

mod bundle;
mod embedding;
mod error;
mod logistic;
mod tfidf;
pub(crate) mod utils;

pub use bundle::{EmbedderSpec, LoadedModel, ModelBundle, BUNDLE_VERSION};
pub use embedding::{Embedder, OnnxEmbedder};
pub use error::ClassifierError;
pub use logistic::{LogisticClassifier, LogisticHead};
pub use tfidf::TfidfVectorizer;

use crate::labels::ToneLabel;

/// Scores an embedding against the fixed, ordered list of tone labels.
///
/// `predict_proba` returns one probability per entry of `labels()`, in the
/// same order.
pub trait Classifier: Send + Sync {
    fn labels(&self) -> &[ToneLabel];

    fn predict_proba(&self, embedding: &Array1<f32>) -> Result<Array1<f32>, ClassifierError>;
}

/// Summary of a loaded model.
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Labels of the classes, in classifier order
    pub class_labels: Vec<ToneLabel>,
    /// Size of the embedding vectors
    pub embedding_size: usize,
}

impl LoadedModel {
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            class_labels: self.classifier.labels().to_vec(),
            embedding_size: self.embedder.dimension(),
        }
    }
}
