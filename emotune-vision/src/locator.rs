use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::preprocess::to_gray;
use crate::region::FaceRegion;

/// Smallest face the cascade can be asked for.
const CASCADE_MIN_FACE: u32 = 20;

/// Finds candidate face rectangles in an image.
///
/// Returns every detection, unranked. An empty result is a normal outcome.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, img: &DynamicImage) -> Vec<FaceRegion>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorSettings {
    /// Minimum face side in pixels.
    pub min_face_size: u32,
    /// Step between pyramid scales (> 1.0).
    pub scale_factor: f32,
    /// Cascade score a window must reach to be kept.
    pub score_threshold: f64,
    /// Sliding window stride in pixels.
    pub window_step: u32,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            min_face_size: 30,
            scale_factor: 1.1,
            score_threshold: 2.0,
            window_step: 4,
        }
    }
}

impl LocatorSettings {
    fn pyramid_factor(&self) -> f32 {
        if self.scale_factor > 1.0 {
            1.0 / self.scale_factor
        } else {
            log::warn!(
                "scale factor {} must be above 1.0, using default",
                self.scale_factor
            );
            1.0 / LocatorSettings::default().scale_factor
        }
    }
}

/// Frontal face cascade (SeetaFace funnel model) run through `rustface`.
pub struct CascadeLocator {
    model: rustface::Model,
    settings: LocatorSettings,
}

impl CascadeLocator {
    pub fn load(path: impl AsRef<Path>, settings: LocatorSettings) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::artifact(path, e))?;
        let model =
            rustface::read_model(BufReader::new(file)).map_err(|e| Error::artifact(path, e))?;
        log::info!("face cascade loaded from {}", path.display());
        Ok(Self { model, settings })
    }

    pub fn from_bytes(bytes: &[u8], settings: LocatorSettings) -> Result<Self> {
        let model = rustface::read_model(Cursor::new(bytes))
            .map_err(|e| Error::artifact("<memory>", e))?;
        Ok(Self { model, settings })
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.settings
    }
}

impl FaceLocator for CascadeLocator {
    fn locate(&self, img: &DynamicImage) -> Vec<FaceRegion> {
        let gray = to_gray(img);
        let (width, height) = gray.dimensions();
        let min_face = self.settings.min_face_size.max(CASCADE_MIN_FACE);
        if width < min_face || height < min_face {
            return vec![];
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(min_face);
        detector.set_score_thresh(self.settings.score_threshold);
        detector.set_pyramid_scale_factor(self.settings.pyramid_factor());
        detector.set_slide_window_step(self.settings.window_step, self.settings.window_step);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        let regions: Vec<FaceRegion> = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                FaceRegion::from_detector_box(
                    bbox.x(),
                    bbox.y(),
                    bbox.width(),
                    bbox.height(),
                    width,
                    height,
                )
            })
            .collect();

        log::debug!(
            "cascade found {} face(s) in {}x{} image",
            regions.len(),
            width,
            height
        );
        regions
    }
}
