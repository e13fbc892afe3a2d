use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use linguame::{
    Classifier, ClassifierError, Detection, Embedder, FeedbackStore, LanguageDetector, PredictionHistory,
    SessionService, TfidfVectorizer, ToneLabel, Verdict,
};
use ndarray::Array1;

struct Uniform;

impl Classifier for Uniform {
    fn labels(&self) -> &[ToneLabel] {
        &ToneLabel::ALL
    }

    fn predict_proba(&self, embedding: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        let n = ToneLabel::ALL.len();
        let shift = embedding.sum();
        Ok(Array1::from_shape_fn(n, |i| (1.0 + shift * i as f32) / n as f32))
    }
}

struct English;

impl LanguageDetector for English {
    fn detect(&self, _text: &str) -> Detection {
        Detection::Detected("en".into())
    }
}

const CORPUS: [&str; 4] = [
    "Hi Sarah, I noticed that once again the report was submitted without the necessary attachments.",
    "Hello team, I'm happy to report that we've met our targets this quarter.",
    "Sure, if that's what you want. I guess it doesn't matter what I think anyway.",
    "Please send me the final numbers by noon so I can review them before the meeting.",
];

fn bench_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("History");
    group.sample_size(50);

    for size in [10usize, 1_000] {
        let mut history = PredictionHistory::new();
        for i in 0..size {
            history.record(ToneLabel::ALL[i % 7]);
        }
        group.bench_function(format!("summarize_{}", size), |b| b.iter(|| black_box(history.summarize())));
    }

    group.finish();
}

fn bench_feedback(c: &mut Criterion) {
    let mut group = c.benchmark_group("Feedback");
    group.sample_size(20);

    group.bench_function("submit", |b| {
        b.iter_batched(
            || FeedbackStore::with_export_path("unused.csv"),
            |mut store| {
                for text in CORPUS {
                    store.submit(black_box(text), "evasive", Verdict::Correct);
                }
                store
            },
            BatchSize::SmallInput,
        )
    });

    let dir = tempfile::tempdir().unwrap();
    let mut store = FeedbackStore::with_export_path(dir.path().join("feedback_log.csv"));
    for i in 0..100 {
        store.submit(CORPUS[i % CORPUS.len()], "controlling", Verdict::Incorrect);
    }
    group.bench_function("export_100", |b| b.iter(|| store.export_csv().unwrap()));

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("Classify");
    group.sample_size(50);

    let vectorizer = TfidfVectorizer::fit(&CORPUS, None).unwrap();
    group.bench_function("tfidf_encode", |b| {
        b.iter(|| vectorizer.encode(black_box(&CORPUS)).unwrap())
    });

    let session = SessionService::builder()
        .with_embedder(Arc::new(vectorizer.clone()))
        .with_classifier(Arc::new(Uniform))
        .with_detector(Arc::new(English))
        .build()
        .unwrap();
    group.bench_function("session_classify", |b| {
        b.iter(|| session.classify(black_box(CORPUS[2])).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_history, bench_feedback, bench_classify);
criterion_main!(benches);
