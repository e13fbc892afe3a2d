use std::fmt;

use crate::labels::ToneLabel;

/// Append-only log of the labels predicted during a session.
#[derive(Debug, Clone, Default)]
pub struct PredictionHistory {
    labels: Vec<ToneLabel>,
}

/// Frequency statistics over a non-empty prediction history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    /// Most frequent label; the first one recorded wins ties.
    pub mode: (ToneLabel, usize),
    /// Count per label, highest first, ties in first-seen order.
    pub distribution: Vec<(ToneLabel, usize)>,
}

impl PredictionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: ToneLabel) {
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Tallies the history. `None` means nothing has been predicted yet.
    pub fn summarize(&self) -> Option<SessionStats> {
        let mut distribution: Vec<(ToneLabel, usize)> = Vec::new();
        for label in &self.labels {
            match distribution.iter_mut().find(|(seen, _)| seen == label) {
                Some((_, count)) => *count += 1,
                None => distribution.push((*label, 1)),
            }
        }
        // Stable sort keeps first-seen order among equal counts
        distribution.sort_by(|a, b| b.1.cmp(&a.1));

        let mode = *distribution.first()?;
        Some(SessionStats {
            total: self.labels.len(),
            mode,
            distribution,
        })
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total predictions: {}", self.total)?;
        writeln!(
            f,
            "Most frequent label: {} ({} times)",
            self.mode.0.display_name(),
            self.mode.1
        )?;
        writeln!(f)?;
        writeln!(f, "Label distribution:")?;
        for (label, count) in &self.distribution {
            writeln!(f, "- {}: {}", label.display_name(), count)?;
        }
        Ok(())
    }
}
