//! Stub detector and classifier so pipeline tests run without model files.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use emotune_vision::model::EmotionModel;
use emotune_vision::preprocess::to_gray;
use emotune_vision::{
    ClassifierRuntime, FaceLocator, FaceRegion, InputSize, InputTensor, LabelMap, Pipeline,
    PredictionVector, Result,
};
use image::{DynamicImage, GrayImage, Luma};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Treats the bounding box of all non-black pixels as the single face.
pub struct LitAreaLocator;

impl FaceLocator for LitAreaLocator {
    fn locate(&self, img: &DynamicImage) -> Vec<FaceRegion> {
        let gray = to_gray(img);
        let lit: Vec<(u32, u32)> = gray
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        if lit.is_empty() {
            return vec![];
        }
        let x0 = lit.iter().map(|p| p.0).min().unwrap();
        let y0 = lit.iter().map(|p| p.1).min().unwrap();
        let x1 = lit.iter().map(|p| p.0).max().unwrap();
        let y1 = lit.iter().map(|p| p.1).max().unwrap();
        vec![FaceRegion::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)]
    }
}

/// Always reports the same boxes, whatever the image.
pub struct FixedLocator(pub Vec<FaceRegion>);

impl FaceLocator for FixedLocator {
    fn locate(&self, _img: &DynamicImage) -> Vec<FaceRegion> {
        self.0.clone()
    }
}

/// Scores `[mean, 1 - mean]` of the input tensor: bright faces read as
/// "happy", dark ones as "sad".
pub struct BrightnessModel;

impl EmotionModel for BrightnessModel {
    fn forward(&self, tensor: &InputTensor) -> Result<PredictionVector> {
        let view = tensor.view();
        let mean = view.sum() / view.len() as f32;
        Ok(PredictionVector::new(vec![mean, 1.0 - mean]))
    }
}

/// Same scores for every tensor; counts forward passes.
pub struct FixedScores {
    pub scores: Vec<f32>,
    pub calls: Arc<AtomicUsize>,
}

impl EmotionModel for FixedScores {
    fn forward(&self, _tensor: &InputTensor) -> Result<PredictionVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PredictionVector::new(self.scores.clone()))
    }
}

/// Pipeline over a `happy`/`sad` label map whose model always answers
/// `scores`, plus the model's call counter.
pub fn fixed_pipeline(scores: Vec<f32>) -> (Pipeline, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = FixedScores {
        scores,
        calls: Arc::clone(&calls),
    };
    let runtime = ClassifierRuntime::new(
        Box::new(model),
        LabelMap::new(["happy", "sad"]).unwrap(),
        InputSize::default(),
    );
    let pipeline = Pipeline::new(Box::new(LitAreaLocator), Arc::new(runtime), 5);
    (pipeline, calls)
}

pub fn runtime() -> Arc<ClassifierRuntime> {
    Arc::new(ClassifierRuntime::new(
        Box::new(BrightnessModel),
        LabelMap::new(["happy", "sad"]).unwrap(),
        InputSize::default(),
    ))
}

pub fn pipeline(window: usize) -> Pipeline {
    Pipeline::new(Box::new(LitAreaLocator), runtime(), window)
}

/// Black canvas with one square of the given gray level.
pub fn face_image(level: u8) -> DynamicImage {
    let mut img = GrayImage::new(120, 100);
    for y in 20..80 {
        for x in 30..90 {
            img.put_pixel(x, y, Luma([level]));
        }
    }
    DynamicImage::ImageLuma8(img)
}

pub fn blank_image() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::new(120, 100))
}

/// Real artifacts, when present: (model, labels, cascade).
pub fn find_artifacts() -> Option<(PathBuf, PathBuf, PathBuf)> {
    let dir = ["models", "../models"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.join("emotion.onnx").exists())?;
    let labels = dir.join("class_indices.json");
    let cascade = dir.join("seeta_fd_frontal_v1.0.bin");
    (labels.exists() && cascade.exists()).then(|| (dir.join("emotion.onnx"), labels, cascade))
}
