use std::sync::{Mutex, MutexGuard, PoisonError};

mod feedback;
mod history;
mod service;

pub use feedback::{FeedbackError, FeedbackRecord, FeedbackStore, Verdict, DEFAULT_EXPORT_FILE, FEEDBACK_CONFIRMATION};
pub use history::{PredictionHistory, SessionStats};
pub use service::{
    ClassificationOutcome, ClassificationResult, SessionService, SessionServiceBuilder, NON_ENGLISH_MESSAGE,
    NON_ENGLISH_SUGGESTION, UNDETECTABLE_MESSAGE, UNDETECTABLE_SUGGESTION,
};

/// Everything a session accumulates: its prediction history and its feedback.
///
/// Both logs sit behind one lock, held only for the duration of a single
/// bookkeeping call.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<SessionLogs>,
}

#[derive(Debug, Default)]
pub struct SessionLogs {
    pub history: PredictionHistory,
    pub feedback: FeedbackStore,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feedback_store(feedback: FeedbackStore) -> Self {
        Self {
            inner: Mutex::new(SessionLogs {
                history: PredictionHistory::new(),
                feedback,
            }),
        }
    }

    /// Locks the session logs.
    ///
    /// Poisoning is ignored: every mutation is a single push, so a panicking
    /// holder cannot leave the logs half-updated.
    pub fn lock(&self) -> MutexGuard<'_, SessionLogs> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<SessionState>();
    }
};
