use std::collections::HashSet;

use linfa::prelude::*;
use linfa_logistic::MultiLogisticRegression;
use log::info;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::utils::softmax;
use super::Classifier;
use crate::labels::{LabelCatalog, ToneLabel};

/// Parameters of a multinomial logistic regression, as stored in a model file.
///
/// `weights` is shaped `[n_features, n_classes]`; column `j` and
/// `intercept[j]` belong to `classes[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticHead {
    pub classes: Vec<String>,
    pub weights: Array2<f64>,
    pub intercept: Array1<f64>,
}

impl LogisticHead {
    /// Fits a multinomial logistic regression on `features` (one row per sample).
    ///
    /// Classes come out in sorted label order, the order linfa assigns to
    /// parameter columns.
    pub fn fit(
        features: Array2<f64>,
        targets: Array1<ToneLabel>,
        max_iterations: u64,
    ) -> Result<Self, ClassifierError> {
        if features.nrows() != targets.len() {
            return Err(ClassifierError::ValidationError(format!(
                "{} feature rows but {} targets",
                features.nrows(),
                targets.len()
            )));
        }

        let mut classes: Vec<ToneLabel> = targets.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ClassifierError::ValidationError(
                "Training data must contain at least two distinct labels".into(),
            ));
        }

        info!(
            "Fitting logistic regression on {} samples, {} features, {} classes",
            features.nrows(),
            features.ncols(),
            classes.len()
        );
        let dataset = Dataset::new(features, targets);
        let model = MultiLogisticRegression::default()
            .max_iterations(max_iterations)
            .fit(&dataset)
            .map_err(|e| ClassifierError::BuildError(format!("Logistic regression failed to fit: {}", e)))?;

        let weights = model.params().to_owned();
        let intercept = model.intercept().to_owned();
        if weights.ncols() != classes.len() || intercept.len() != classes.len() {
            return Err(ClassifierError::BuildError(format!(
                "Fitted parameters cover {} classes, expected {}",
                weights.ncols(),
                classes.len()
            )));
        }

        Ok(Self {
            classes: classes.iter().map(|label| label.as_str().to_string()).collect(),
            weights,
            intercept,
        })
    }

    pub fn n_features(&self) -> usize {
        self.weights.nrows()
    }
}

/// Tone classifier scoring embeddings with a [`LogisticHead`].
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    labels: Vec<ToneLabel>,
    head: LogisticHead,
}

impl LogisticClassifier {
    /// Validates the head against the label catalog and its own shapes.
    ///
    /// A class name the catalog does not know is fatal: the session could
    /// never explain that prediction.
    pub fn new(head: LogisticHead) -> Result<Self, ClassifierError> {
        let labels = LabelCatalog::resolve_all(&head.classes)?;

        let unique: HashSet<_> = labels.iter().collect();
        if unique.len() != labels.len() {
            return Err(ClassifierError::BuildError("Model lists a class more than once".into()));
        }
        if head.weights.ncols() != labels.len() || head.intercept.len() != labels.len() {
            return Err(ClassifierError::BuildError(format!(
                "Model has {} classes but weights for {} and intercepts for {}",
                labels.len(),
                head.weights.ncols(),
                head.intercept.len()
            )));
        }

        Ok(Self { labels, head })
    }

    pub fn head(&self) -> &LogisticHead {
        &self.head
    }
}

impl Classifier for LogisticClassifier {
    fn labels(&self) -> &[ToneLabel] {
        &self.labels
    }

    fn predict_proba(&self, embedding: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        if embedding.len() != self.head.n_features() {
            return Err(ClassifierError::PredictionError(format!(
                "Embedding has {} dimensions, model expects {}",
                embedding.len(),
                self.head.n_features()
            )));
        }
        let x = embedding.mapv(f64::from);
        let logits = x.dot(&self.head.weights) + &self.head.intercept;
        Ok(softmax(&logits).mapv(|p| p as f32))
    }
}
