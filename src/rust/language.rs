use log::debug;
use whatlang::{Detector, Lang};

/// Outcome of running language detection over a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// ISO 639-1 code where one exists (`"en"`), ISO 639-3 otherwise.
    Detected(String),
    Undetectable,
}

impl Detection {
    pub fn is_english(&self) -> bool {
        matches!(self, Detection::Detected(code) if code == "en")
    }
}

/// Identifies the language a message is written in.
///
/// Failing to detect a language is an expected outcome, reported as
/// [`Detection::Undetectable`] rather than an error.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Detection;
}

/// Languages the detector chooses between. Restricting the candidates keeps
/// short English messages from being mistaken for a close relative.
pub const CANDIDATE_LANGUAGES: [Lang; 12] = [
    Lang::Eng,
    Lang::Fra,
    Lang::Spa,
    Lang::Deu,
    Lang::Ita,
    Lang::Por,
    Lang::Nld,
    Lang::Rus,
    Lang::Cmn,
    Lang::Jpn,
    Lang::Kor,
    Lang::Ara,
];

/// Trigram based detector backed by `whatlang`.
#[derive(Debug, Clone)]
pub struct WhatlangDetector {
    detector: Detector,
    require_reliable: bool,
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::with_candidates(CANDIDATE_LANGUAGES.to_vec())
    }
}

impl WhatlangDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_candidates(candidates: Vec<Lang>) -> Self {
        Self {
            detector: Detector::with_allowlist(candidates),
            require_reliable: false,
        }
    }

    /// Treat low-confidence guesses as undetectable.
    pub fn with_reliability_check(mut self, require_reliable: bool) -> Self {
        self.require_reliable = require_reliable;
        self
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Detection {
        if text.trim().is_empty() {
            return Detection::Undetectable;
        }

        match self.detector.detect(text) {
            Some(info) if !self.require_reliable || info.is_reliable() => {
                let code = iso_639_1(info.lang().code());
                debug!("Detected language '{}' (confidence {:.2})", code, info.confidence());
                Detection::Detected(code)
            }
            Some(info) => {
                debug!("Discarding unreliable guess '{}'", info.lang().code());
                Detection::Undetectable
            }
            None => Detection::Undetectable,
        }
    }
}

fn iso_639_1(code: &str) -> String {
    let short = match code {
        "eng" => "en",
        "fra" => "fr",
        "spa" => "es",
        "deu" => "de",
        "ita" => "it",
        "por" => "pt",
        "nld" => "nl",
        "rus" => "ru",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "ara" => "ar",
        other => other,
    };
    short.to_string()
}
