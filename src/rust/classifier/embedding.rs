use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use ndarray::{Array1, Array2};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::error::ClassifierError;
use super::utils::normalize_vector;
use crate::model_manager::ModelManager;
use crate::models::{BuiltinModel, ModelCharacteristics};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Turns texts into fixed-length vectors the tone classifier can score.
///
/// Every vector returned by one embedder has the same length,
/// [`Embedder::dimension`].
pub trait Embedder: Send + Sync {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>, ClassifierError>;

    fn dimension(&self) -> usize;
}

/// Sentence embeddings computed by a transformer model through ONNX Runtime.
///
/// The ONNX model is expected to:
/// - Accept `input_ids` and `attention_mask` (and optionally `token_type_ids`),
///   all shaped `[batch_size, sequence_length]`
/// - Output token embeddings shaped `[batch_size, sequence_length, embedding_size]`
///
/// Token embeddings are mean-pooled over the attention mask and L2 normalized,
/// which is how sentence-transformers produces MiniLM sentence vectors.
#[derive(Debug, Clone)]
pub struct OnnxEmbedder {
    tokenizer: Arc<Tokenizer>,
    session: Arc<Session>,
    characteristics: ModelCharacteristics,
    uses_token_type_ids: bool,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxEmbedder>();
    }
};

impl OnnxEmbedder {
    /// Loads a built-in model that has already been downloaded by `manager`.
    pub fn from_builtin(
        model: BuiltinModel,
        manager: &ModelManager,
        config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        if !manager.is_downloaded(model) {
            return Err(ClassifierError::BuildError(format!(
                "Model '{:?}' is not downloaded. Please download it first using ModelManager::ensure_downloaded()",
                model
            )));
        }

        let model_path = manager.model_path(model);
        let tokenizer_path = manager.tokenizer_path(model);
        Self::load(&model_path, &tokenizer_path, model.characteristics(), config)
    }

    fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        characteristics: ModelCharacteristics,
        config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
            error!("Failed to load tokenizer: {}", e);
            ClassifierError::BuildError(format!("Failed to load tokenizer: {}", e))
        })?;
        info!("Tokenizer loaded successfully");

        let session = create_session_builder(config)?.commit_from_file(model_path)?;
        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        let uses_token_type_ids = session.inputs.iter().any(|input| input.name == "token_type_ids");

        Ok(Self {
            tokenizer: Arc::new(tokenizer),
            session: Arc::new(session),
            characteristics,
            uses_token_type_ids,
        })
    }

    /// Tokenizes `text`, truncating to the model's maximum sequence length.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>, ClassifierError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;

        let mut ids = encoding.get_ids().to_vec();
        if ids.is_empty() {
            return Err(ClassifierError::ValidationError("Input text produced no tokens".into()));
        }
        let max_length = self.characteristics.max_sequence_length;
        if ids.len() > max_length {
            log::debug!("Truncating input from {} to {} tokens", ids.len(), max_length);
            ids.truncate(max_length);
        }
        Ok(ids)
    }

    fn embed_one(&self, text: &str) -> Result<Array1<f32>, ClassifierError> {
        let tokens = self.tokenize(text)?;
        self.get_embedding(&tokens)
    }

    fn get_embedding(&self, tokens: &[u32]) -> Result<Array1<f32>, ClassifierError> {
        let len = tokens.len();
        let mask: Vec<i64> = tokens.iter().map(|&x| if x == 0 { 0 } else { 1 }).collect();

        let input_ids = Array2::from_shape_vec((1, len), tokens.iter().map(|&x| x as i64).collect())
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create input array: {}", e)))?;
        let attention_mask = Array2::from_shape_vec((1, len), mask.clone())
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create mask array: {}", e)))?;

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            "input_ids",
            Tensor::from_array(input_ids)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create input tensor: {}", e)))?,
        );
        input_tensors.insert(
            "attention_mask",
            Tensor::from_array(attention_mask)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create mask tensor: {}", e)))?,
        );
        if self.uses_token_type_ids {
            input_tensors.insert(
                "token_type_ids",
                Tensor::from_array(Array2::<i64>::zeros((1, len)))
                    .map_err(|e| ClassifierError::ModelError(format!("Failed to create type tensor: {}", e)))?,
            );
        }

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e)))?;

        let shape = output_tensor.shape();
        if shape.len() != 3 || shape[1] != len {
            return Err(ClassifierError::ModelError(format!(
                "Unexpected output shape {:?} for {} tokens",
                shape, len
            )));
        }

        let mut pooled = Array1::<f32>::zeros(shape[2]);
        let mut weight = 0.0f32;
        for (position, &m) in mask.iter().enumerate() {
            if m == 0 {
                continue;
            }
            let token = output_tensor.slice(ndarray::s![0, position, ..]);
            for (acc, &value) in pooled.iter_mut().zip(token.iter()) {
                *acc += value;
            }
            weight += 1.0;
        }
        if weight > 0.0 {
            pooled /= weight;
        }

        Ok(normalize_vector(&pooled))
    }

    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        let inputs = &session.inputs;
        if inputs.len() < 2 {
            return Err(ClassifierError::ModelError(format!(
                "Model must have at least 2 inputs (input_ids and attention_mask), found {}",
                inputs.len()
            )));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for embeddings".to_string(),
            ));
        }
        Ok(())
    }
}

impl Embedder for OnnxEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>, ClassifierError> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.characteristics.embedding_size
    }
}
