use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use linguame::{
    ClassificationOutcome, Classifier, ClassifierError, Detection, Embedder, LabelCatalog, LanguageDetector,
    SessionService, SessionState, ToneLabel, WhatlangDetector,
};
use ndarray::{array, Array1};

/// Embeds every text as a single constant feature.
struct FlatEmbedder;

impl Embedder for FlatEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>, ClassifierError> {
        Ok(texts.iter().map(|_| array![1.0f32]).collect())
    }

    fn dimension(&self) -> usize {
        1
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn encode(&self, _texts: &[&str]) -> Result<Vec<Array1<f32>>, ClassifierError> {
        Err(ClassifierError::ModelError("embedding backend unavailable".into()))
    }

    fn dimension(&self) -> usize {
        1
    }
}

/// Favours scripted label indices in turn, then the first label.
struct KeywordClassifier {
    labels: Vec<ToneLabel>,
    calls: AtomicUsize,
    next: std::sync::Mutex<Vec<usize>>,
}

impl KeywordClassifier {
    fn new(labels: Vec<ToneLabel>) -> Self {
        Self { labels, calls: AtomicUsize::new(0), next: std::sync::Mutex::new(Vec::new()) }
    }

    /// Queue the index of the label to favour on upcoming calls.
    fn script(self, winners: Vec<usize>) -> Self {
        *self.next.lock().unwrap() = winners.into_iter().rev().collect();
        self
    }
}

impl Classifier for KeywordClassifier {
    fn labels(&self) -> &[ToneLabel] {
        &self.labels
    }

    fn predict_proba(&self, _embedding: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let winner = self.next.lock().unwrap().pop().unwrap_or(0);
        let n = self.labels.len();
        let rest = 0.3 / (n - 1) as f32;
        Ok(Array1::from_shape_fn(n, |i| if i == winner { 0.7 } else { rest }))
    }
}

/// Treats texts starting with "Bonjour" as French and empty text as undetectable.
struct StubDetector;

impl LanguageDetector for StubDetector {
    fn detect(&self, text: &str) -> Detection {
        if text.trim().is_empty() {
            Detection::Undetectable
        } else if text.starts_with("Bonjour") {
            Detection::Detected("fr".into())
        } else {
            Detection::Detected("en".into())
        }
    }
}

const LABELS: [ToneLabel; 3] = [ToneLabel::PassiveAggressive, ToneLabel::EmpatheticMature, ToneLabel::Evasive];

fn service_with(classifier: KeywordClassifier) -> SessionService {
    SessionService::builder()
        .with_embedder(Arc::new(FlatEmbedder))
        .with_classifier(Arc::new(classifier))
        .with_detector(Arc::new(StubDetector))
        .build()
        .expect("valid session")
}

#[test]
fn test_classification_records_and_explains() -> Result<(), ClassifierError> {
    let session = service_with(KeywordClassifier::new(LABELS.to_vec()).script(vec![1]));
    let outcome = session.classify("Thanks everyone for the effort this quarter.")?;

    let result = outcome.result().expect("classified");
    assert_eq!(result.label, ToneLabel::EmpatheticMature);
    let explanation = LabelCatalog::explain(ToneLabel::EmpatheticMature);
    assert_eq!(result.interpretation, explanation.interpretation);
    assert_eq!(result.suggestion, explanation.suggestion);
    assert_eq!(result.distribution.len(), LABELS.len());
    assert_eq!(
        result.distribution.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
        LABELS.to_vec()
    );

    let total: f32 = result.distribution.iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() <= 0.0005 * LABELS.len() as f32 + f32::EPSILON);

    assert_eq!(session.summarize().map(|s| s.total), Some(1));
    Ok(())
}

#[test]
fn test_non_english_is_not_recorded() -> Result<(), ClassifierError> {
    let classifier = Arc::new(KeywordClassifier::new(LABELS.to_vec()));
    let session = SessionService::builder()
        .with_embedder(Arc::new(FlatEmbedder))
        .with_classifier(classifier.clone())
        .with_detector(Arc::new(StubDetector))
        .build()?;

    let outcome = session.classify("Bonjour tout le monde")?;
    assert_eq!(outcome, ClassificationOutcome::UnsupportedLanguage { language: "fr".into() });
    assert_eq!(outcome.interpretation(), "Unsupported language detected.");
    assert_eq!(outcome.suggestion(), "Please submit your message in English.");
    assert!(session.summarize().is_none());
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_undetectable_language_is_not_recorded() -> Result<(), ClassifierError> {
    let session = SessionService::builder()
        .with_embedder(Arc::new(FlatEmbedder))
        .with_classifier(Arc::new(KeywordClassifier::new(LABELS.to_vec())))
        .with_detector(Arc::new(WhatlangDetector::new()))
        .build()?;

    let outcome = session.classify("")?;
    assert_eq!(outcome, ClassificationOutcome::LanguageUndetectable);
    assert_eq!(outcome.interpretation(), "Could not detect language.");
    assert_eq!(outcome.suggestion(), "Please enter a valid message.");
    assert!(session.summarize().is_none());
    Ok(())
}

#[test]
fn test_default_detector_accepts_short_english() -> Result<(), ClassifierError> {
    let session = SessionService::builder()
        .with_embedder(Arc::new(FlatEmbedder))
        .with_classifier(Arc::new(KeywordClassifier::new(LABELS.to_vec())))
        .build()?;

    let outcome = session.classify("Sure, if that’s what you want. I guess it doesn’t matter what I think anyway.")?;
    assert!(outcome.result().is_some());
    assert_eq!(session.summarize().map(|s| s.total), Some(1));
    Ok(())
}

#[test]
fn test_embedder_failure_leaves_history_untouched() {
    let session = SessionService::builder()
        .with_embedder(Arc::new(FailingEmbedder))
        .with_classifier(Arc::new(KeywordClassifier::new(LABELS.to_vec())))
        .with_detector(Arc::new(StubDetector))
        .build()
        .expect("valid session");

    assert!(matches!(session.classify("Please send it again."), Err(ClassifierError::ModelError(_))));
    assert!(session.summarize().is_none());
}

#[test]
fn test_stats_follow_first_seen_tie_break() -> Result<(), ClassifierError> {
    // Winners: PassiveAggressive, EmpatheticMature, PassiveAggressive, EmpatheticMature
    let session = service_with(KeywordClassifier::new(LABELS.to_vec()).script(vec![0, 1, 0, 1]));
    for text in ["one", "two", "three", "four"] {
        session.classify(text)?;
    }

    let stats = session.summarize().expect("four predictions");
    assert_eq!(stats.total, 4);
    assert_eq!(stats.mode, (ToneLabel::PassiveAggressive, 2));
    assert_eq!(stats.distribution.iter().map(|(_, n)| n).sum::<usize>(), 4);
    Ok(())
}

#[test]
fn test_sessions_are_independent() -> Result<(), ClassifierError> {
    let first = service_with(KeywordClassifier::new(LABELS.to_vec()));
    let second = service_with(KeywordClassifier::new(LABELS.to_vec()));

    first.classify("hello there")?;
    first.submit_feedback("hello there", "passive_aggressive", linguame::Verdict::Incorrect);

    assert_eq!(first.summarize().map(|s| s.total), Some(1));
    assert!(second.summarize().is_none());
    assert!(second.state().lock().feedback.is_empty());
    Ok(())
}

#[test]
fn test_shared_state_across_threads() {
    let state = Arc::new(SessionState::new());
    let session = Arc::new(
        SessionService::builder()
            .with_embedder(Arc::new(FlatEmbedder))
            .with_classifier(Arc::new(KeywordClassifier::new(LABELS.to_vec())))
            .with_detector(Arc::new(StubDetector))
            .with_state(Arc::clone(&state))
            .build()
            .expect("valid session"),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for j in 0..5 {
                    session.classify(&format!("message {} {}", i, j)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(state.lock().history.len(), 20);
}
