use std::collections::{BTreeMap, HashMap, HashSet};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::embedding::Embedder;
use super::error::ClassifierError;

/// Bag-of-words vectorizer weighting term counts by smoothed inverse document frequency.
///
/// Tokens are lowercased runs of at least two alphanumeric characters. Vectors
/// are L2 normalized; terms outside the fitted vocabulary are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learns the vocabulary and idf weights from `documents`.
    ///
    /// With `max_features`, only the most frequent terms across the corpus are kept.
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: Option<usize>) -> Result<Self, ClassifierError> {
        if documents.is_empty() {
            return Err(ClassifierError::ValidationError("Cannot fit a vectorizer without documents".into()));
        }

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            for token in &tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
            }
            let unique: HashSet<String> = tokens.into_iter().collect();
            for token in unique {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = term_freq.into_iter().collect();
        if let Some(limit) = max_features {
            // Highest frequency first, alphabetical among equals
            terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            terms.truncate(limit);
        }
        let mut kept: Vec<String> = terms.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        if kept.is_empty() {
            return Err(ClassifierError::ValidationError(
                "Documents contain no tokens of two or more characters".into(),
            ));
        }

        let n_docs = documents.len() as f32;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (index, term) in kept.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f32;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Ok(Self { vocabulary, idf })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn transform(&self, document: &str) -> Array1<f32> {
        let mut vector = Array1::<f32>::zeros(self.vocabulary.len());
        for token in tokenize(document) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += 1.0;
            }
        }
        for (value, weight) in vector.iter_mut().zip(&self.idf) {
            *value *= weight;
        }
        super::utils::normalize_vector(&vector)
    }
}

impl Embedder for TfidfVectorizer {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>, ClassifierError> {
        Ok(texts.iter().map(|text| self.transform(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}
