use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raised when a label name does not belong to the fixed tone catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tone label: '{0}'")]
pub struct UnknownLabelError(pub String);

/// The ten tone categories a message can be classified into.
///
/// Variants are declared alphabetically so that the derived ordering matches
/// the class order a trained model reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneLabel {
    AssertiveCritical,
    Controlling,
    EmpatheticMature,
    Evasive,
    InsecureSubmissive,
    ManipulativeGuilt,
    Overjustification,
    PassiveAggressive,
    ProfessionalClear,
    VeiledReproach,
}

impl ToneLabel {
    pub const ALL: [ToneLabel; 10] = [
        ToneLabel::AssertiveCritical,
        ToneLabel::Controlling,
        ToneLabel::EmpatheticMature,
        ToneLabel::Evasive,
        ToneLabel::InsecureSubmissive,
        ToneLabel::ManipulativeGuilt,
        ToneLabel::Overjustification,
        ToneLabel::PassiveAggressive,
        ToneLabel::ProfessionalClear,
        ToneLabel::VeiledReproach,
    ];

    /// Canonical snake_case name, as found in datasets and model files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssertiveCritical => "assertive_critical",
            Self::Controlling => "controlling",
            Self::EmpatheticMature => "empathetic_mature",
            Self::Evasive => "evasive",
            Self::InsecureSubmissive => "insecure_submissive",
            Self::ManipulativeGuilt => "manipulative_guilt",
            Self::Overjustification => "overjustification",
            Self::PassiveAggressive => "passive_aggressive",
            Self::ProfessionalClear => "professional_clear",
            Self::VeiledReproach => "veiled_reproach",
        }
    }

    /// Human readable name, e.g. "Passive Aggressive".
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ToneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToneLabel {
    type Err = UnknownLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == needle)
            .ok_or_else(|| UnknownLabelError(s.to_string()))
    }
}

/// Canned interpretation and suggestion shown next to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelExplanation {
    pub interpretation: &'static str,
    pub suggestion: &'static str,
}

const ASSERTIVE_CRITICAL: LabelExplanation = LabelExplanation {
    interpretation: "This message expresses confident critique and points out issues directly.",
    suggestion: "Consider softening the tone to maintain cooperation and avoid defensiveness.",
};

const CONTROLLING: LabelExplanation = LabelExplanation {
    interpretation: "The message reflects a need for control, possibly limiting others’ autonomy.",
    suggestion: "Try rephrasing to invite collaboration rather than imposing directions.",
};

const EMPATHETIC_MATURE: LabelExplanation = LabelExplanation {
    interpretation: "This message shows emotional intelligence and clarity.",
    suggestion: "No changes needed — the message is well-balanced and respectful.",
};

const EVASIVE: LabelExplanation = LabelExplanation {
    interpretation: "The message avoids addressing the core issue, which can create confusion.",
    suggestion: "Consider being more direct and transparent to ensure clear communication.",
};

const INSECURE_SUBMISSIVE: LabelExplanation = LabelExplanation {
    interpretation: "The message shows hesitation and lack of confidence.",
    suggestion: "Try rephrasing with more assertiveness to build trust and credibility.",
};

const MANIPULATIVE_GUILT: LabelExplanation = LabelExplanation {
    interpretation: "The tone appeals to guilt or obligation to influence others.",
    suggestion: "Use open and honest communication instead of emotional pressure.",
};

const OVERJUSTIFICATION: LabelExplanation = LabelExplanation {
    interpretation: "The message over-explains, possibly signaling defensiveness.",
    suggestion: "Be concise and trust that your reasoning is clear without too much justification.",
};

const PASSIVE_AGGRESSIVE: LabelExplanation = LabelExplanation {
    interpretation: "The message hides resentment or disagreement behind polite language.",
    suggestion: "Consider expressing concerns directly to avoid misunderstandings.",
};

const PROFESSIONAL_CLEAR: LabelExplanation = LabelExplanation {
    interpretation: "The tone is neutral, structured, and respectful.",
    suggestion: "No changes needed — this tone is appropriate for professional settings.",
};

const VEILED_REPROACH: LabelExplanation = LabelExplanation {
    interpretation: "The message implies criticism without expressing it directly.",
    suggestion: "Try rephrasing the message to be more open and constructive.",
};

/// Static lookup from tone label to its explanation.
///
/// The table is an exhaustive `match`, so a new [`ToneLabel`] variant does
/// not compile until it has an explanation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelCatalog;

impl LabelCatalog {
    pub fn explain(label: ToneLabel) -> &'static LabelExplanation {
        match label {
            ToneLabel::AssertiveCritical => &ASSERTIVE_CRITICAL,
            ToneLabel::Controlling => &CONTROLLING,
            ToneLabel::EmpatheticMature => &EMPATHETIC_MATURE,
            ToneLabel::Evasive => &EVASIVE,
            ToneLabel::InsecureSubmissive => &INSECURE_SUBMISSIVE,
            ToneLabel::ManipulativeGuilt => &MANIPULATIVE_GUILT,
            ToneLabel::Overjustification => &OVERJUSTIFICATION,
            ToneLabel::PassiveAggressive => &PASSIVE_AGGRESSIVE,
            ToneLabel::ProfessionalClear => &PROFESSIONAL_CLEAR,
            ToneLabel::VeiledReproach => &VEILED_REPROACH,
        }
    }

    /// Looks up an explanation by its snake_case label name.
    pub fn lookup(name: &str) -> Result<&'static LabelExplanation, UnknownLabelError> {
        name.parse::<ToneLabel>().map(Self::explain)
    }

    /// Resolves a list of class names, failing on the first one the catalog does not know.
    pub fn resolve_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<ToneLabel>, UnknownLabelError> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }

    pub fn all() -> &'static [ToneLabel] {
        &ToneLabel::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_label_round_trips_through_its_name() {
        for label in ToneLabel::ALL {
            assert_eq!(label.as_str().parse::<ToneLabel>(), Ok(label));
        }
    }

    #[test]
    fn test_declaration_order_is_alphabetical() {
        let names: Vec<_> = ToneLabel::ALL.iter().map(|l| l.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let mut labels = ToneLabel::ALL.to_vec();
        labels.reverse();
        labels.sort();
        assert_eq!(labels, ToneLabel::ALL.to_vec());
    }

    #[test]
    fn test_explain_is_stable() {
        for label in LabelCatalog::all() {
            let first = LabelCatalog::explain(*label);
            let second = LabelCatalog::explain(*label);
            assert_eq!(first, second);
            assert!(!first.interpretation.is_empty());
            assert!(!first.suggestion.is_empty());
        }
    }

    #[test]
    fn test_lookup_unknown_label() {
        let err = LabelCatalog::lookup("sarcastic").unwrap_err();
        assert_eq!(err, UnknownLabelError("sarcastic".into()));
        assert!(LabelCatalog::lookup("passive_aggressive").is_ok());
    }

    #[test]
    fn test_resolve_all_stops_at_unknown() {
        assert_eq!(
            LabelCatalog::resolve_all(&["evasive", "controlling"]).unwrap(),
            vec![ToneLabel::Evasive, ToneLabel::Controlling]
        );
        assert!(LabelCatalog::resolve_all(&["evasive", "cheerful"]).is_err());
    }

    #[test]
    fn test_texts_are_kept_verbatim() {
        assert_eq!(
            LabelCatalog::explain(ToneLabel::EmpatheticMature).suggestion,
            "No changes needed — the message is well-balanced and respectful."
        );
        assert_eq!(
            LabelCatalog::explain(ToneLabel::ProfessionalClear).suggestion,
            "No changes needed — this tone is appropriate for professional settings."
        );
        assert_eq!(
            LabelCatalog::explain(ToneLabel::Controlling).interpretation,
            "The message reflects a need for control, possibly limiting others’ autonomy."
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(ToneLabel::PassiveAggressive.display_name(), "Passive Aggressive");
        assert_eq!(ToneLabel::Overjustification.display_name(), "Overjustification");
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ToneLabel::VeiledReproach).unwrap();
        assert_eq!(json, "\"veiled_reproach\"");
    }
}
