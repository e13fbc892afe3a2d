/// Embedding models the tool knows how to download and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    /// Small and efficient model based on MiniLM architecture
    ///
    /// Characteristics:
    /// - Embedding size: 384
    /// - Max sequence length: 256
    /// - Size: ~85MB
    MiniLM,
}

/// Characteristics of a model including its capabilities and requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCharacteristics {
    /// Size of the embedding vectors produced by the model
    pub embedding_size: usize,
    /// Maximum sequence length the model can handle
    pub max_sequence_length: usize,
    /// Approximate size of the model in memory
    pub model_size_mb: usize,
}

/// A remote file together with its expected SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: &'static str,
    pub sha256: &'static str,
}

/// Where the files of a built-in model live, and under which directory
/// name they are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSource {
    pub name: &'static str,
    pub model: RemoteFile,
    pub tokenizer: RemoteFile,
}

impl BuiltinModel {
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::MiniLM => ModelCharacteristics {
                embedding_size: 384,
                max_sequence_length: 256,
                model_size_mb: 85,
            },
        }
    }

    pub fn source(&self) -> ModelSource {
        match self {
            Self::MiniLM => ModelSource {
                name: "minilm",
                model: RemoteFile {
                    url: "https://huggingface.co/axar-ai/minilm/resolve/main/model.onnx",
                    sha256: "37f1ea074b7166e87295fce31299287d5fb79f76b8b7227fccc8a9f2f1ba4e16",
                },
                tokenizer: RemoteFile {
                    url: "https://huggingface.co/axar-ai/minilm/resolve/main/tokenizer.json",
                    sha256: "da0e79933b9ed51798a3ae27893d3c5fa4a201126cef75586296df9b4d2c62a0",
                },
            },
        }
    }
}
