//! Classifier runtime: the loaded model plus its label map.
//!
//! The runtime is built once at startup and never mutated afterwards. A
//! process-wide instance can be published with [`install`] and fetched with
//! [`global`]; reads need no locking beyond the cell's initialization
//! barrier.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::labels::LabelMap;
use crate::model::{EmotionModel, OnnxModel, OutputActivation};
use crate::preprocess::{InputSize, InputTensor, TensorPreprocessor};

static RUNTIME: OnceCell<Arc<ClassifierRuntime>> = OnceCell::new();

/// Raw classifier scores, index-aligned with the [`LabelMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionVector(Vec<f32>);

impl PredictionVector {
    pub fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Index and value of the highest score; the first one wins on ties.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.0.iter().enumerate() {
            match best {
                Some((_, b)) if !(v > b || b.is_nan()) => {}
                _ => best = Some((i, v)),
            }
        }
        best
    }
}

impl From<Vec<f32>> for PredictionVector {
    fn from(scores: Vec<f32>) -> Self {
        Self(scores)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub label: String,
    pub confidence: f32,
    pub distribution: BTreeMap<String, f32>,
}

impl fmt::Display for EmotionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.label, self.confidence * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub num_classes: usize,
    pub labels: Vec<String>,
}

pub struct ClassifierRuntime {
    model: Box<dyn EmotionModel>,
    labels: LabelMap,
    preprocessor: TensorPreprocessor,
    activation: OutputActivation,
}

impl fmt::Debug for ClassifierRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierRuntime")
            .field("labels", &self.labels)
            .field("input_size", &self.preprocessor.size())
            .field("activation", &self.activation)
            .finish_non_exhaustive()
    }
}

impl ClassifierRuntime {
    pub fn new(model: Box<dyn EmotionModel>, labels: LabelMap, input_size: InputSize) -> Self {
        Self {
            model,
            labels,
            preprocessor: TensorPreprocessor::new(input_size),
            activation: OutputActivation::Identity,
        }
    }

    /// Load the label map and the ONNX classifier. Either artifact missing or
    /// malformed is an [`Error::Artifact`].
    pub fn load(
        model_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
        input_size: InputSize,
    ) -> Result<Self> {
        let labels = LabelMap::load(labels_path)?;
        let model = OnnxModel::load(model_path)?;
        Ok(Self::new(Box::new(model), labels, input_size))
    }

    pub fn with_activation(mut self, activation: OutputActivation) -> Self {
        self.activation = activation;
        self
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn preprocessor(&self) -> &TensorPreprocessor {
        &self.preprocessor
    }

    /// One forward pass. Deterministic for a given model and tensor.
    pub fn predict(&self, tensor: &InputTensor) -> Result<PredictionVector> {
        self.preprocessor.validate(tensor)?;
        let raw = self.model.forward(tensor)?;
        if raw.len() != self.labels.len() {
            log::warn!(
                "classifier produced {} scores for {} labels",
                raw.len(),
                self.labels.len()
            );
        }
        Ok(PredictionVector::new(self.activation.apply(raw.into_inner())))
    }

    /// Map the arg-max to its label. A vector whose length differs from the
    /// label map is [`Error::UnknownIndex`], whichever index wins.
    pub fn resolve(&self, vector: &PredictionVector) -> Result<EmotionResult> {
        self.check_len(vector)?;
        let (index, confidence) = vector.argmax().ok_or(Error::EmptyPrediction)?;
        let label = self.label_at(index)?.to_string();

        let distribution = self
            .labels
            .iter()
            .zip(vector.as_slice())
            .map(|((_, name), &score)| (name.to_string(), score))
            .collect();

        Ok(EmotionResult {
            label,
            confidence,
            distribution,
        })
    }

    /// The `n` best labels, highest score first, lower index first on ties.
    /// `n` is clamped to `[1, K]`.
    pub fn resolve_top_n(
        &self,
        vector: &PredictionVector,
        n: usize,
    ) -> Result<Vec<(String, f32)>> {
        self.check_len(vector)?;
        let scores = vector.as_slice();
        let n = n.clamp(1, scores.len());

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b].total_cmp(&scores[a]).then(a.cmp(&b))
        });

        order
            .into_iter()
            .take(n)
            .map(|i| Ok((self.label_at(i)?.to_string(), scores[i])))
            .collect()
    }

    /// Like [`resolve`](Self::resolve) but `None` when the winning score is
    /// strictly below `threshold`.
    pub fn thresholded(
        &self,
        vector: &PredictionVector,
        threshold: f32,
    ) -> Result<Option<EmotionResult>> {
        let result = self.resolve(vector)?;
        Ok((result.confidence >= threshold).then_some(result))
    }

    pub fn describe(&self) -> ModelInfo {
        ModelInfo {
            input_shape: self.preprocessor.input_shape().to_vec(),
            output_shape: vec![1, self.labels.len()],
            num_classes: self.labels.len(),
            labels: self.labels.labels().to_vec(),
        }
    }

    /// Empty vectors are `EmptyPrediction`; any other length that is not
    /// `K` names the first index without a counterpart.
    fn check_len(&self, vector: &PredictionVector) -> Result<()> {
        let num_labels = self.labels.len();
        if vector.is_empty() {
            return Err(Error::EmptyPrediction);
        }
        if vector.len() != num_labels {
            return Err(Error::UnknownIndex {
                index: vector.len().min(num_labels),
                num_labels,
            });
        }
        Ok(())
    }

    fn label_at(&self, index: usize) -> Result<&str> {
        self.labels.get(index).ok_or(Error::UnknownIndex {
            index,
            num_labels: self.labels.len(),
        })
    }
}

/// Publish the process-wide runtime. Only the first call succeeds.
pub fn install(runtime: ClassifierRuntime) -> Result<Arc<ClassifierRuntime>> {
    let runtime = Arc::new(runtime);
    RUNTIME
        .set(Arc::clone(&runtime))
        .map_err(|_| Error::AlreadyInitialized)?;
    log::info!("classifier runtime installed: {:?}", runtime);
    Ok(runtime)
}

/// The process-wide runtime, or [`Error::ModelNotLoaded`] before
/// [`install`].
pub fn global() -> Result<Arc<ClassifierRuntime>> {
    RUNTIME.get().cloned().ok_or(Error::ModelNotLoaded)
}

pub fn is_loaded() -> bool {
    RUNTIME.get().is_some()
}
