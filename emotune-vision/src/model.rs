use std::path::Path;
use std::sync::Mutex;

#[cfg(any(feature = "openvino", feature = "cuda"))]
use ort::ep::{self, ExecutionProvider};
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
    value::Tensor,
};
use serde::{Deserialize, Serialize};

use crate::classifier::PredictionVector;
use crate::error::{Error, Result};
use crate::preprocess::InputTensor;

/// A loaded emotion classifier: one tensor in, one score per class out.
pub trait EmotionModel: Send + Sync {
    fn forward(&self, tensor: &InputTensor) -> Result<PredictionVector>;
}

/// What the classifier's last layer emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// Scores are already probabilities.
    #[default]
    Identity,
    /// Scores are logits.
    Softmax,
}

impl OutputActivation {
    pub fn apply(self, scores: Vec<f32>) -> Vec<f32> {
        match self {
            OutputActivation::Identity => scores,
            OutputActivation::Softmax => softmax(&scores),
        }
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|x| x / sum).collect()
}

pub fn session_builder() -> Result<SessionBuilder> {
    #[allow(unused_mut)]
    let mut builder = Session::builder()
        .map_err(Error::inference)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(Error::inference)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available().map_err(Error::inference)? {
            ep.register(&mut builder).map_err(Error::inference)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available().map_err(Error::inference)? {
            ep.register(&mut builder).map_err(Error::inference)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

/// Classifier exported to ONNX (`(1, H, W, 1)` in, `(1, K)` out).
pub struct OnnxModel {
    session: Mutex<Session>,
}

impl OnnxModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::artifact(path, "model file not found"));
        }
        let session = session_builder()?
            .commit_from_file(path)
            .map_err(|e| Error::artifact(path, e))?;
        log::info!("emotion model loaded from {}", path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl EmotionModel for OnnxModel {
    fn forward(&self, tensor: &InputTensor) -> Result<PredictionVector> {
        let input = Tensor::from_array(tensor.view().to_owned()).map_err(Error::inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Poisoned("onnx session"))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(Error::inference)?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(Error::inference)?;

        log::trace!("classifier output shape {:?}", shape);
        Ok(PredictionVector::new(data.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_identity_activation_passthrough() {
        let scores = vec![0.8, 0.2];
        assert_eq!(OutputActivation::Identity.apply(scores.clone()), scores);
    }

    #[test]
    fn test_missing_model_is_artifact_error() {
        assert!(matches!(
            OnnxModel::load("/nonexistent/emotion.onnx"),
            Err(Error::Artifact { .. })
        ));
    }
}
