use std::sync::OnceLock;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;

static ENVIRONMENT: OnceLock<Result<(), String>> = OnceLock::new();

/// ONNX Runtime settings used when loading the sentence embedding model.
#[derive(Debug)]
pub struct RuntimeConfig {
    /// Threads used across operators; 0 lets ONNX Runtime decide
    pub inter_threads: usize,
    /// Threads used within an operator; 0 lets ONNX Runtime decide
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0,
            intra_threads: 0,
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl RuntimeConfig {
    /// Single-threaded execution, handy on small machines and in tests.
    pub fn single_threaded() -> Self {
        Self {
            inter_threads: 1,
            intra_threads: 1,
            ..Self::default()
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

/// Commits the process-wide ONNX Runtime environment once.
///
/// A failed initialization is remembered and reported on every call.
pub fn ensure_initialized() -> Result<(), String> {
    ENVIRONMENT
        .get_or_init(|| {
            ort::init()
                .with_name("linguame")
                .commit()
                .map(|_| ())
                .map_err(|e| {
                    log::error!("Failed to initialize ONNX Runtime environment: {}", e);
                    e.to_string()
                })
        })
        .clone()
}

pub fn create_session_builder(config: &RuntimeConfig) -> OrtResult<SessionBuilder> {
    if let Err(msg) = ensure_initialized() {
        log::warn!("Continuing without a committed environment: {}", msg);
    }
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}
