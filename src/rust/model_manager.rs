use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::models::{BuiltinModel, RemoteFile};

/// Environment variable overriding the cache root for downloaded models.
pub const CACHE_ENV_VAR: &str = "LINGUAME_CACHE";

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model '{0}' has not been downloaded")]
    NotDownloaded(&'static str),
    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: &'static str,
        actual: String,
    },
}

/// Local cache of built-in embedding models.
///
/// Each model gets a directory named after it holding `model.onnx` and
/// `tokenizer.json`. Downloads are serialized per manager and every file is
/// checked against its published SHA-256 before it is written.
#[derive(Clone, Debug)]
pub struct ModelManager {
    root: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Manager rooted at [`ModelManager::default_models_dir`].
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::default_models_dir())
    }

    /// `$LINGUAME_CACHE/models` if set, otherwise `linguame/models` under the
    /// user cache directory, falling back to the temp directory.
    pub fn default_models_dir() -> PathBuf {
        if let Some(root) = env::var_os(CACHE_ENV_VAR) {
            return PathBuf::from(root).join("models");
        }
        dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
            .unwrap_or_else(env::temp_dir)
            .join("linguame")
            .join("models")
    }

    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.root
    }

    pub fn model_path(&self, model: BuiltinModel) -> PathBuf {
        self.model_dir(model).join(MODEL_FILE)
    }

    pub fn tokenizer_path(&self, model: BuiltinModel) -> PathBuf {
        self.model_dir(model).join(TOKENIZER_FILE)
    }

    fn model_dir(&self, model: BuiltinModel) -> PathBuf {
        self.root.join(model.source().name)
    }

    /// Local paths paired with the remote file each one mirrors.
    fn files(&self, model: BuiltinModel) -> [(PathBuf, RemoteFile); 2] {
        let source = model.source();
        [
            (self.model_path(model), source.model),
            (self.tokenizer_path(model), source.tokenizer),
        ]
    }

    /// True when both files exist; their contents are not checked.
    pub fn is_downloaded(&self, model: BuiltinModel) -> bool {
        self.files(model).iter().all(|(path, _)| {
            let present = path.exists();
            debug!("{:?} present: {}", path, present);
            present
        })
    }

    /// Fails with [`ModelError::NotDownloaded`] unless both files are present.
    pub fn require_downloaded(&self, model: BuiltinModel) -> Result<(), ModelError> {
        if self.is_downloaded(model) {
            Ok(())
        } else {
            Err(ModelError::NotDownloaded(model.source().name))
        }
    }

    /// True when both files exist and match their published checksums.
    pub fn verify(&self, model: BuiltinModel) -> Result<bool, ModelError> {
        for (path, remote) in self.files(model) {
            if !path.exists() {
                debug!("{:?} is missing", path);
                return Ok(false);
            }
            if sha256_hex(&fs::read(&path)?) != remote.sha256 {
                warn!("{:?} does not match its checksum", path);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Fetches every file of `model` that is missing or corrupted.
    ///
    /// A failure removes whatever was already fetched so that a later call
    /// starts clean.
    pub async fn download(&self, model: BuiltinModel) -> Result<(), ModelError> {
        let _guard = self.download_lock.lock().await;
        fs::create_dir_all(self.model_dir(model))?;

        for (path, remote) in self.files(model) {
            if path.exists() && sha256_hex(&fs::read(&path)?) == remote.sha256 {
                debug!("{:?} already up to date", path);
                continue;
            }
            if let Err(e) = fetch(&remote, &path).await {
                error!("Could not fetch {}: {}", remote.url, e);
                if let Err(cleanup) = self.remove_download(model) {
                    warn!("Could not clean up partial download: {}", cleanup);
                }
                return Err(e);
            }
        }

        info!("Model '{}' ready in {:?}", model.source().name, self.model_dir(model));
        Ok(())
    }

    pub fn remove_download(&self, model: BuiltinModel) -> Result<(), ModelError> {
        for (path, _) in self.files(model) {
            match fs::remove_file(&path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }

    /// Downloads `model` unless a verified copy is already cached.
    pub async fn ensure_downloaded(&self, model: BuiltinModel) -> Result<(), ModelError> {
        if self.is_downloaded(model) && self.verify(model)? {
            return Ok(());
        }
        info!("Fetching model '{}'", model.source().name);
        self.download(model).await
    }
}

async fn fetch(remote: &RemoteFile, path: &Path) -> Result<(), ModelError> {
    info!("Downloading {}", remote.url);
    let bytes = reqwest::get(remote.url).await?.error_for_status()?.bytes().await?;

    let actual = sha256_hex(&bytes);
    if actual != remote.sha256 {
        return Err(ModelError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: remote.sha256,
            actual,
        });
    }
    fs::write(path, &bytes)?;
    info!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_scoped_by_model_name() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        assert!(manager.model_path(BuiltinModel::MiniLM).ends_with("minilm/model.onnx"));
        assert!(manager.tokenizer_path(BuiltinModel::MiniLM).ends_with("minilm/tokenizer.json"));
        Ok(())
    }

    #[test]
    fn test_missing_model_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        assert!(!manager.is_downloaded(BuiltinModel::MiniLM));
        assert!(!manager.verify(BuiltinModel::MiniLM)?);
        assert!(matches!(
            manager.require_downloaded(BuiltinModel::MiniLM),
            Err(ModelError::NotDownloaded("minilm"))
        ));
        Ok(())
    }

    #[test]
    fn test_corrupted_files_fail_verification() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        fs::create_dir_all(dir.path().join("minilm"))?;
        fs::write(manager.model_path(BuiltinModel::MiniLM), "not an onnx graph")?;
        fs::write(manager.tokenizer_path(BuiltinModel::MiniLM), "{}")?;

        assert!(manager.is_downloaded(BuiltinModel::MiniLM));
        assert!(!manager.verify(BuiltinModel::MiniLM)?);

        manager.remove_download(BuiltinModel::MiniLM)?;
        assert!(!manager.is_downloaded(BuiltinModel::MiniLM));
        // Removing twice is fine
        manager.remove_download(BuiltinModel::MiniLM)?;
        Ok(())
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    #[ignore = "downloads the MiniLM model over the network"]
    async fn test_download_model() -> Result<(), ModelError> {
        let dir = env::temp_dir().join("linguame-test-cache");
        let manager = ModelManager::new(&dir)?;
        manager.remove_download(BuiltinModel::MiniLM)?;

        manager.download(BuiltinModel::MiniLM).await?;
        assert!(manager.verify(BuiltinModel::MiniLM)?);
        Ok(())
    }
}
