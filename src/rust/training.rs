//! Fitting a tone model from a labeled CSV dataset.
//!
//! The pipeline mirrors a classic text classification setup: a stratified
//! train/test split, a feature extractor (TF-IDF or MiniLM sentence
//! embeddings), class balancing by oversampling, and a multinomial logistic
//! regression. [`evaluate`] produces a per-class precision/recall report.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::classifier::utils::argmax;
use crate::classifier::{
    ClassifierError, Embedder, EmbedderSpec, LoadedModel, LogisticHead, ModelBundle, OnnxEmbedder, TfidfVectorizer,
};
use crate::labels::ToneLabel;
use crate::model_manager::{ModelError, ModelManager};
use crate::models::BuiltinModel;
use crate::runtime::RuntimeConfig;

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Row {row}: unknown label '{label}'")]
    UnknownLabel { row: usize, label: String },
    #[error("Dataset contains no rows")]
    EmptyDataset,
    #[error("Invalid training option: {0}")]
    InvalidOption(String),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Feature extractor to train the logistic head on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmbedderKind {
    #[default]
    Tfidf,
    #[value(name = "minilm")]
    MiniLm,
}

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub embedder: EmbedderKind,
    /// Fraction of each class held out for evaluation
    pub test_size: f64,
    pub seed: u64,
    pub max_iterations: u64,
    /// Vocabulary cap for TF-IDF; `None` keeps every term
    pub max_features: Option<usize>,
    /// Oversample minority classes up to the size of the largest one
    pub balance_classes: bool,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::Tfidf,
            test_size: 0.2,
            seed: 42,
            max_iterations: 1000,
            max_features: None,
            balance_classes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledText {
    pub text: String,
    pub label: ToneLabel,
}

#[derive(Debug, Deserialize)]
struct DatasetRow {
    text: String,
    label: String,
}

/// Reads a CSV with `text` and `label` columns. Other columns are ignored.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<LabeledText>, TrainingError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<DatasetRow>().enumerate() {
        let row = row?;
        let label = row.label.parse::<ToneLabel>().map_err(|_| TrainingError::UnknownLabel {
            // Line 1 holds the header
            row: index + 2,
            label: row.label.clone(),
        })?;
        records.push(LabeledText { text: row.text, label });
    }

    if records.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    info!("Loaded {} labeled texts from {:?}", records.len(), path);
    Ok(records)
}

/// Splits per class so every label keeps its share in both halves.
///
/// A class with a single example goes entirely to the training half.
pub fn stratified_split(
    records: &[LabeledText],
    test_size: f64,
    seed: u64,
) -> Result<(Vec<LabeledText>, Vec<LabeledText>), TrainingError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainingError::InvalidOption(format!(
            "test size must be between 0 and 1, got {}",
            test_size
        )));
    }

    let mut by_label: BTreeMap<ToneLabel, Vec<&LabeledText>> = BTreeMap::new();
    for record in records {
        by_label.entry(record.label).or_default().push(record);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (label, mut group) in by_label {
        group.shuffle(&mut rng);
        let n = group.len();
        let n_test = ((n as f64 * test_size).round() as usize).min(n.saturating_sub(1));
        if n_test == 0 {
            warn!("Label '{}' has too few examples ({}) to hold any out", label, n);
        }
        test.extend(group[..n_test].iter().map(|r| (*r).clone()));
        train.extend(group[n_test..].iter().map(|r| (*r).clone()));
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok((train, test))
}

/// Indices into `labels` with minority classes resampled up to the majority count.
fn balanced_indices(labels: &[ToneLabel], rng: &mut StdRng) -> Vec<usize> {
    let mut by_label: BTreeMap<ToneLabel, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_label.entry(*label).or_default().push(i);
    }
    let target = by_label.values().map(Vec::len).max().unwrap_or(0);

    let mut indices = Vec::with_capacity(target * by_label.len());
    for members in by_label.values() {
        indices.extend(members.iter().copied());
        for _ in members.len()..target {
            indices.push(members[rng.gen_range(0..members.len())]);
        }
    }
    indices
}

/// Fits an embedder (when it is learned) and a logistic head on `train`.
pub fn fit_model(
    train: &[LabeledText],
    options: &TrainingOptions,
    manager: &ModelManager,
    runtime: &RuntimeConfig,
) -> Result<ModelBundle, TrainingError> {
    if train.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    let texts: Vec<&str> = train.iter().map(|r| r.text.as_str()).collect();

    let (spec, embedder): (EmbedderSpec, Arc<dyn Embedder>) = match options.embedder {
        EmbedderKind::Tfidf => {
            let vectorizer = TfidfVectorizer::fit(&texts, options.max_features)?;
            info!("TF-IDF vocabulary holds {} terms", vectorizer.vocabulary_size());
            (EmbedderSpec::Tfidf(vectorizer.clone()), Arc::new(vectorizer) as Arc<dyn Embedder>)
        }
        EmbedderKind::MiniLm => {
            manager.require_downloaded(BuiltinModel::MiniLM)?;
            let embedder = OnnxEmbedder::from_builtin(BuiltinModel::MiniLM, manager, runtime)?;
            (EmbedderSpec::MiniLm, Arc::new(embedder) as Arc<dyn Embedder>)
        }
    };

    let vectors = embedder.encode(&texts)?;
    let labels: Vec<ToneLabel> = train.iter().map(|r| r.label).collect();

    let mut rng = StdRng::seed_from_u64(options.seed);
    let indices: Vec<usize> = if options.balance_classes {
        balanced_indices(&labels, &mut rng)
    } else {
        (0..labels.len()).collect()
    };

    let dim = embedder.dimension();
    let features = Array2::from_shape_fn((indices.len(), dim), |(row, col)| f64::from(vectors[indices[row]][col]));
    let targets: Array1<ToneLabel> = indices.iter().map(|&i| labels[i]).collect();

    let head = LogisticHead::fit(features, targets, options.max_iterations)?;
    Ok(ModelBundle::new(spec, head))
}

/// Per-class scores of a [`ClassificationReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    pub label: ToneLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub total: usize,
}

impl ClassificationReport {
    /// Builds the report from paired (expected, predicted) labels.
    pub fn from_predictions(pairs: &[(ToneLabel, ToneLabel)]) -> Self {
        let mut labels: Vec<ToneLabel> = pairs.iter().flat_map(|(a, b)| [*a, *b]).collect();
        labels.sort();
        labels.dedup();

        let classes = labels
            .into_iter()
            .map(|label| {
                let tp = pairs.iter().filter(|(e, p)| *e == label && *p == label).count();
                let predicted = pairs.iter().filter(|(_, p)| *p == label).count();
                let support = pairs.iter().filter(|(e, _)| *e == label).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassScores { label, precision, recall, f1, support }
            })
            .collect();

        let correct = pairs.iter().filter(|(e, p)| e == p).count();
        Self {
            classes,
            accuracy: ratio(correct, pairs.len()),
            total: pairs.len(),
        }
    }

    /// Unweighted mean of (precision, recall, f1) over classes.
    pub fn macro_avg(&self) -> (f64, f64, f64) {
        let n = self.classes.len().max(1) as f64;
        let sum = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, c| {
            (acc.0 + c.precision, acc.1 + c.recall, acc.2 + c.f1)
        });
        (sum.0 / n, sum.1 / n, sum.2 / n)
    }

    /// Support-weighted mean of (precision, recall, f1) over classes.
    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        let n = self.total.max(1) as f64;
        let sum = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, c| {
            let w = c.support as f64;
            (acc.0 + c.precision * w, acc.1 + c.recall * w, acc.2 + c.f1 * w)
        });
        (sum.0 / n, sum.1 / n, sum.2 / n)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>22} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>22} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>22} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.total)?;
        let (p, r, f1) = self.macro_avg();
        writeln!(f, "{:>22} {:>9.2} {:>9.2} {:>9.2} {:>9}", "macro avg", p, r, f1, self.total)?;
        let (p, r, f1) = self.weighted_avg();
        writeln!(f, "{:>22} {:>9.2} {:>9.2} {:>9.2} {:>9}", "weighted avg", p, r, f1, self.total)
    }
}

/// Scores `model` on held-out examples, bypassing language detection.
pub fn evaluate(model: &LoadedModel, test: &[LabeledText]) -> Result<ClassificationReport, TrainingError> {
    let labels = model.classifier.labels();
    let mut pairs = Vec::with_capacity(test.len());
    for record in test {
        let embedding = model
            .embedder
            .encode(&[record.text.as_str()])?
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::PredictionError("Embedder returned no vectors".into()))?;
        let probabilities = model.classifier.predict_proba(&embedding)?;
        let top = argmax(probabilities.view())
            .filter(|&i| i < labels.len())
            .ok_or_else(|| ClassifierError::PredictionError("Classifier returned no valid probabilities".into()))?;
        pairs.push((record.label, labels[top]));
    }
    Ok(ClassificationReport::from_predictions(&pairs))
}
