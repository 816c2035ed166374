use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;

use crate::classifier::{self, ClassifierRuntime, EmotionResult, ModelInfo, PredictionVector};
use crate::error::Result;
use crate::locator::FaceLocator;
use crate::region::{self, FaceRegion};
use crate::smoothing::TemporalSmoother;

/// The selected face and what the classifier made of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceEmotion {
    pub region: FaceRegion,
    pub result: EmotionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Detected(FaceEmotion),
    /// A face was classified but the winning score fell under the
    /// pipeline's minimum confidence.
    LowConfidence {
        region: FaceRegion,
        best: EmotionResult,
    },
    NoFace,
}

impl Outcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, Outcome::Detected(_))
    }

    pub fn emotion(&self) -> Option<&EmotionResult> {
        match self {
            Outcome::Detected(face) => Some(&face.result),
            _ => None,
        }
    }

    pub fn region(&self) -> Option<FaceRegion> {
        match self {
            Outcome::Detected(face) => Some(face.region),
            Outcome::LowConfidence { region, .. } => Some(*region),
            Outcome::NoFace => None,
        }
    }
}

/// Per-image outcomes of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub items: Vec<Result<Outcome>>,
    pub total_processed: usize,
    pub successful: usize,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.total_processed - self.successful
    }
}

/// Full pipeline: locate faces → pick the largest → tensor → classify.
pub struct Pipeline {
    locator: Box<dyn FaceLocator>,
    runtime: Arc<ClassifierRuntime>,
    smoother: TemporalSmoother,
    min_confidence: Option<f32>,
}

impl Pipeline {
    pub fn new(
        locator: Box<dyn FaceLocator>,
        runtime: Arc<ClassifierRuntime>,
        window_size: usize,
    ) -> Self {
        Self {
            locator,
            runtime,
            smoother: TemporalSmoother::new(window_size),
            min_confidence: None,
        }
    }

    /// Build on top of the runtime published with [`classifier::install`].
    pub fn from_global(locator: Box<dyn FaceLocator>, window_size: usize) -> Result<Self> {
        Ok(Self::new(locator, classifier::global()?, window_size))
    }

    /// Report detections under `threshold` as [`Outcome::LowConfidence`].
    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence = Some(threshold);
        self
    }

    pub fn runtime(&self) -> &ClassifierRuntime {
        &self.runtime
    }

    pub fn describe(&self) -> ModelInfo {
        self.runtime.describe()
    }

    fn face_prediction(
        &self,
        img: &DynamicImage,
    ) -> Result<Option<(FaceRegion, PredictionVector)>> {
        let regions = self.locator.locate(img);
        let Some(face) = region::select(&regions) else {
            log::debug!("no face among {} candidate(s)", regions.len());
            return Ok(None);
        };
        log::debug!("selected face {} of {} candidate(s)", face, regions.len());

        let tensor = self.runtime.preprocessor().prepare(img, &face)?;
        let vector = self.runtime.predict(&tensor)?;
        Ok(Some((face, vector)))
    }

    fn finish(&self, region: FaceRegion, vector: &PredictionVector) -> Result<Outcome> {
        let Some(threshold) = self.min_confidence else {
            let result = self.runtime.resolve(vector)?;
            return Ok(Outcome::Detected(FaceEmotion { region, result }));
        };
        match self.runtime.thresholded(vector, threshold)? {
            Some(result) => Ok(Outcome::Detected(FaceEmotion { region, result })),
            None => {
                let best = self.runtime.resolve(vector)?;
                log::debug!("{} is under the {:.2} threshold", best, threshold);
                Ok(Outcome::LowConfidence { region, best })
            }
        }
    }

    /// Classify the dominant face of a still image.
    pub fn detect_single(&self, img: &DynamicImage) -> Result<Outcome> {
        match self.face_prediction(img)? {
            Some((face, vector)) => self.finish(face, &vector),
            None => Ok(Outcome::NoFace),
        }
    }

    /// Classify one frame of a live stream, averaging it with the stream's
    /// recent frames. Frames without a face leave the history alone.
    pub fn detect_frame(&self, img: &DynamicImage, stream_id: &str) -> Result<Outcome> {
        match self.face_prediction(img)? {
            Some((face, vector)) => {
                let smoothed = self.smoother.push(stream_id, vector)?;
                self.finish(face, &smoothed)
            }
            None => Ok(Outcome::NoFace),
        }
    }

    /// Run [`detect_single`](Self::detect_single) on every image. A failing
    /// image is recorded and does not stop the rest.
    pub fn detect_batch(&self, images: &[DynamicImage]) -> BatchReport {
        let items: Vec<Result<Outcome>> = images
            .iter()
            .enumerate()
            .map(|(i, img)| {
                let outcome = self.detect_single(img);
                if let Err(e) = &outcome {
                    log::warn!("batch item {}: {}", i, e);
                }
                outcome
            })
            .collect();

        let successful = items
            .iter()
            .filter(|item| matches!(item, Ok(outcome) if outcome.is_detected()))
            .count();

        BatchReport {
            total_processed: items.len(),
            successful,
            items,
        }
    }

    /// The `n` most likely emotions for the dominant face, or `None` without
    /// a face.
    pub fn top_emotions(
        &self,
        img: &DynamicImage,
        n: usize,
    ) -> Result<Option<Vec<(String, f32)>>> {
        match self.face_prediction(img)? {
            Some((_, vector)) => Ok(Some(self.runtime.resolve_top_n(&vector, n)?)),
            None => Ok(None),
        }
    }

    /// [`detect_single`](Self::detect_single) together with the `n` best
    /// labels, from a single forward pass. The ranking is empty without a
    /// face.
    pub fn detect_ranked(
        &self,
        img: &DynamicImage,
        n: usize,
    ) -> Result<(Outcome, Vec<(String, f32)>)> {
        match self.face_prediction(img)? {
            Some((face, vector)) => {
                let ranked = self.runtime.resolve_top_n(&vector, n)?;
                Ok((self.finish(face, &vector)?, ranked))
            }
            None => Ok((Outcome::NoFace, Vec::new())),
        }
    }

    /// Forget a stream's smoothing history. Returns whether it existed.
    pub fn end_stream(&self, stream_id: &str) -> bool {
        self.smoother.end_stream(stream_id)
    }

    pub fn active_streams(&self) -> usize {
        self.smoother.active_streams()
    }

    pub fn smoother(&self) -> &TemporalSmoother {
        &self.smoother
    }
}
