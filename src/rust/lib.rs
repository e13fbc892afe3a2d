//! Tone classification for professional messages.
//!
//! A message is checked for English, embedded, scored by a logistic
//! regression over ten tone labels and explained with a canned
//! interpretation and suggestion. Each session keeps a tally of its
//! predictions and collects user feedback that can be exported as CSV.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use linguame::{ModelBundle, ModelManager, RuntimeConfig, SessionService, Verdict};
//!
//! let manager = ModelManager::new_default()?;
//! let model = ModelBundle::load("linguame_model.json")?
//!     .instantiate(&manager, &RuntimeConfig::default())?;
//! let session = SessionService::builder().with_model(model).build()?;
//!
//! let outcome = session.classify("Sure, if that's what you want. I guess it doesn't matter what I think.")?;
//! if let Some(result) = outcome.result() {
//!     println!("{}: {}", result.label.display_name(), result.interpretation);
//!     session.submit_feedback("Sure, if that's what you want.", result.label.as_str(), Verdict::Correct);
//! }
//!
//! if let Some(stats) = session.summarize() {
//!     println!("{}", stats);
//! }
//! if let Some(path) = session.export_feedback()? {
//!     println!("Feedback written to {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! [`SessionService`] is `Send + Sync`; its history and feedback sit behind a
//! single lock, so one service can be shared across threads with `Arc`.

pub mod classifier;
pub mod labels;
pub mod language;
pub mod model_manager;
pub mod models;
mod runtime;
pub mod session;
pub mod training;

pub use classifier::{
    Classifier, ClassifierError, ClassifierInfo, Embedder, EmbedderSpec, LoadedModel, LogisticClassifier,
    LogisticHead, ModelBundle, OnnxEmbedder, TfidfVectorizer,
};
pub use labels::{LabelCatalog, LabelExplanation, ToneLabel, UnknownLabelError};
pub use language::{Detection, LanguageDetector, WhatlangDetector};
pub use model_manager::{ModelError, ModelManager};
pub use models::{BuiltinModel, ModelCharacteristics, ModelSource, RemoteFile};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use session::{
    ClassificationOutcome, ClassificationResult, FeedbackError, FeedbackRecord, FeedbackStore, PredictionHistory,
    SessionService, SessionServiceBuilder, SessionState, SessionStats, Verdict, FEEDBACK_CONFIRMATION,
};
pub use training::{ClassificationReport, EmbedderKind, LabeledText, TrainingError, TrainingOptions};

pub fn init_logger() {
    env_logger::init();
}
