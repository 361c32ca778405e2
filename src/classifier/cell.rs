//! Process-wide model slot with a single load attempt.
//!
//! State machine:
//! `Unloaded → Loading → Ready` or `Unloaded → Loading → Failed`.
//! Both end states are final: a failed load is never retried, every later
//! caller gets the same `ModelLoadError`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{error, info};

use super::{ClassifierConfig, EmotionClassifier};
use crate::error::EmotionError;

/// Lifecycle of the shared model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

type Loader = Box<dyn Fn(&Path) -> Result<EmotionClassifier, EmotionError> + Send + Sync>;

/// Lazily loaded, immutable-after-load classifier shared by all requests
pub struct ModelCell {
    model_path: PathBuf,
    loader: Loader,
    loading: AtomicBool,
    slot: OnceLock<Result<EmotionClassifier, EmotionError>>,
}

impl ModelCell {
    /// Slot that loads `model_path` with the standard backends on first use
    pub fn new(model_path: PathBuf, config: ClassifierConfig) -> Self {
        Self::with_loader(model_path, move |path| EmotionClassifier::load(path, &config))
    }

    /// Slot with a custom load function
    pub fn with_loader<F>(model_path: PathBuf, loader: F) -> Self
    where
        F: Fn(&Path) -> Result<EmotionClassifier, EmotionError> + Send + Sync + 'static,
    {
        Self {
            model_path,
            loader: Box::new(loader),
            loading: AtomicBool::new(false),
            slot: OnceLock::new(),
        }
    }

    /// Slot that is already `Ready`
    pub fn ready(model_path: PathBuf, classifier: EmotionClassifier) -> Self {
        let cell = Self::with_loader(model_path, |_| {
            Err(EmotionError::ModelLoadError("Model slot was pre-filled".to_string()))
        });
        let _ = cell.slot.set(Ok(classifier));
        cell
    }

    /// Return the classifier, loading it on the first call
    ///
    /// Concurrent first callers block until the single load finishes and
    /// all observe its outcome.
    pub fn get(&self) -> Result<EmotionClassifier, EmotionError> {
        self.slot
            .get_or_init(|| {
                self.loading.store(true, Ordering::SeqCst);
                info!("Loading emotion model from {:?}", self.model_path);
                let start = Instant::now();

                let result = (self.loader)(&self.model_path);

                match &result {
                    Ok(_) => info!(
                        "Emotion model ready in {} ms",
                        start.elapsed().as_millis()
                    ),
                    Err(e) => error!(
                        "Emotion model failed to load from {:?}: {}",
                        self.model_path, e
                    ),
                }
                result
            })
            .clone()
    }

    pub fn state(&self) -> ModelState {
        match self.slot.get() {
            Some(Ok(_)) => ModelState::Ready,
            Some(Err(_)) => ModelState::Failed,
            None if self.loading.load(Ordering::SeqCst) => ModelState::Loading,
            None => ModelState::Unloaded,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}
