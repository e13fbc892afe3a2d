use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

use super::{FeedbackError, FeedbackStore, SessionState, SessionStats, Verdict};
use crate::classifier::utils::{argmax, round_to};
use crate::classifier::{Classifier, ClassifierError, Embedder, LoadedModel};
use crate::labels::{LabelCatalog, ToneLabel};
use crate::language::{Detection, LanguageDetector, WhatlangDetector};

pub const UNDETECTABLE_MESSAGE: &str = "Could not detect language.";
pub const UNDETECTABLE_SUGGESTION: &str = "Please enter a valid message.";
pub const NON_ENGLISH_MESSAGE: &str = "Unsupported language detected.";
pub const NON_ENGLISH_SUGGESTION: &str = "Please submit your message in English.";

const PROBABILITY_DECIMALS: i32 = 3;

/// A successful classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: ToneLabel,
    /// Probability per label in classifier order, rounded to three decimals.
    pub distribution: Vec<(ToneLabel, f32)>,
    pub interpretation: &'static str,
    pub suggestion: &'static str,
}

impl ClassificationResult {
    pub fn probability(&self, label: ToneLabel) -> Option<f32> {
        self.distribution
            .iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, p)| *p)
    }

    /// Distribution ordered from most to least likely.
    pub fn ranked(&self) -> Vec<(ToneLabel, f32)> {
        let mut ranked = self.distribution.clone();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// What `classify` produced for a message.
///
/// The two language variants are advisories, not failures: nothing was
/// classified and nothing was recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    Classified(ClassificationResult),
    LanguageUndetectable,
    UnsupportedLanguage { language: String },
}

impl ClassificationOutcome {
    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Classified(result) => Some(result),
            _ => None,
        }
    }

    pub fn interpretation(&self) -> &'static str {
        match self {
            Self::Classified(result) => result.interpretation,
            Self::LanguageUndetectable => UNDETECTABLE_MESSAGE,
            Self::UnsupportedLanguage { .. } => NON_ENGLISH_MESSAGE,
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Classified(result) => result.suggestion,
            Self::LanguageUndetectable => UNDETECTABLE_SUGGESTION,
            Self::UnsupportedLanguage { .. } => NON_ENGLISH_SUGGESTION,
        }
    }
}

/// Runs tone classification for one session and keeps its bookkeeping.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use linguame::{ModelBundle, ModelManager, RuntimeConfig, SessionService};
///
/// let manager = ModelManager::new_default()?;
/// let model = ModelBundle::load("linguame_model.json")?
///     .instantiate(&manager, &RuntimeConfig::default())?;
/// let session = SessionService::builder().with_model(model).build()?;
///
/// let outcome = session.classify("Sure, if that's what you want.")?;
/// println!("{}", outcome.interpretation());
/// # Ok(())
/// # }
/// ```
pub struct SessionService {
    embedder: Arc<dyn Embedder>,
    classifier: Arc<dyn Classifier>,
    detector: Arc<dyn LanguageDetector>,
    state: Arc<SessionState>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<SessionService>();
    }
};

impl SessionService {
    pub fn builder() -> SessionServiceBuilder {
        SessionServiceBuilder::new()
    }

    /// Classifies `text`, recording the winning label on success.
    ///
    /// Embedder and classifier failures are returned as errors and leave the
    /// session history untouched.
    pub fn classify(&self, text: &str) -> Result<ClassificationOutcome, ClassifierError> {
        let language = match self.detector.detect(text) {
            Detection::Detected(code) => code,
            Detection::Undetectable => {
                info!("Language of the message could not be detected");
                return Ok(ClassificationOutcome::LanguageUndetectable);
            }
        };
        if language != "en" {
            info!("Rejecting message in unsupported language '{}'", language);
            return Ok(ClassificationOutcome::UnsupportedLanguage { language });
        }

        let embedding = self
            .embedder
            .encode(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::PredictionError("Embedder returned no vectors".into()))?;
        let probabilities = self.classifier.predict_proba(&embedding)?;

        let labels = self.classifier.labels();
        if probabilities.len() != labels.len() {
            return Err(ClassifierError::PredictionError(format!(
                "Classifier returned {} probabilities for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }
        let top = argmax(probabilities.view())
            .ok_or_else(|| ClassifierError::PredictionError("Classifier returned no valid probabilities".into()))?;
        let label = labels[top];
        let explanation = LabelCatalog::explain(label);

        let distribution = labels
            .iter()
            .copied()
            .zip(probabilities.iter().map(|&p| round_to(p, PROBABILITY_DECIMALS)))
            .collect();

        self.state.lock().history.record(label);
        debug!("Classified message as '{}' ({:.3})", label, probabilities[top]);

        Ok(ClassificationOutcome::Classified(ClassificationResult {
            label,
            distribution,
            interpretation: explanation.interpretation,
            suggestion: explanation.suggestion,
        }))
    }

    pub fn summarize(&self) -> Option<SessionStats> {
        self.state.lock().history.summarize()
    }

    pub fn submit_feedback(&self, text: &str, predicted_label: &str, is_correct: Verdict) -> &'static str {
        self.state.lock().feedback.submit(text, predicted_label, is_correct)
    }

    pub fn export_feedback(&self) -> Result<Option<PathBuf>, FeedbackError> {
        self.state.lock().feedback.export_csv()
    }

    pub fn labels(&self) -> &[ToneLabel] {
        self.classifier.labels()
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }
}

/// Fluent construction of a [`SessionService`].
///
/// The embedder and classifier are required. Without a detector the
/// whatlang-based one is used; without a state a fresh session is started.
#[derive(Default)]
pub struct SessionServiceBuilder {
    embedder: Option<Arc<dyn Embedder>>,
    classifier: Option<Arc<dyn Classifier>>,
    detector: Option<Arc<dyn LanguageDetector>>,
    state: Option<Arc<SessionState>>,
    export_path: Option<PathBuf>,
}

impl SessionServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Uses the embedder and classifier of a loaded model bundle.
    pub fn with_model(self, model: LoadedModel) -> Self {
        self.with_embedder(model.embedder).with_classifier(model.classifier)
    }

    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Shares an existing session, e.g. between services of one tenant.
    pub fn with_state(mut self, state: Arc<SessionState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Where `export_feedback` writes; only applies to a fresh session.
    pub fn with_export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(path.into());
        self
    }

    /// Assembles the service after checking the classifier's label list.
    pub fn build(self) -> Result<SessionService, ClassifierError> {
        let embedder = self
            .embedder
            .ok_or_else(|| ClassifierError::BuildError("An embedder must be set".into()))?;
        let classifier = self
            .classifier
            .ok_or_else(|| ClassifierError::BuildError("A classifier must be set".into()))?;

        let labels = classifier.labels();
        if labels.is_empty() {
            return Err(ClassifierError::BuildError("Classifier exposes no labels".into()));
        }
        let unique: HashSet<_> = labels.iter().collect();
        if unique.len() != labels.len() {
            return Err(ClassifierError::BuildError("Classifier lists a label more than once".into()));
        }

        let state = match (self.state, self.export_path) {
            (Some(_), Some(_)) => {
                return Err(ClassifierError::BuildError(
                    "An export path cannot be applied to an existing session state".into(),
                ))
            }
            (Some(state), None) => state,
            (None, Some(path)) => Arc::new(SessionState::with_feedback_store(FeedbackStore::with_export_path(path))),
            (None, None) => Arc::new(SessionState::new()),
        };
        let detector = self
            .detector
            .unwrap_or_else(|| Arc::new(WhatlangDetector::new()));

        info!("Session ready with {} labels", labels.len());
        Ok(SessionService {
            embedder,
            classifier,
            detector,
            state,
        })
    }
}
