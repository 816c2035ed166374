//! Face crop to classifier tensor.
//!
//! The classifier was trained on OpenCV-style grayscale crops, so the luma
//! weights here are BT.601 rather than the Rec.709 weights `image` uses in
//! `to_luma8`.

use image::{imageops, DynamicImage, GrayImage, Luma};
use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::region::FaceRegion;

/// Spatial size of the classifier input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            width: 75,
            height: 75,
        }
    }
}

/// Normalized grayscale face, shape `(1, H, W, 1)`, values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct InputTensor(Array4<f32>);

impl InputTensor {
    pub fn from_array(array: Array4<f32>) -> Self {
        Self(array)
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }

    pub fn into_array(self) -> Array4<f32> {
        self.0
    }
}

pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Single-channel copy of `img`. Grayscale inputs pass through untouched.
pub fn to_gray(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => img.to_luma8(),
        _ => {
            let rgb = img.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let p = rgb.get_pixel(x, y);
                Luma([luma(p[0], p[1], p[2])])
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TensorPreprocessor {
    size: InputSize,
}

impl TensorPreprocessor {
    pub fn new(size: InputSize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> InputSize {
        self.size
    }

    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.size.height as usize, self.size.width as usize, 1]
    }

    /// Crop `region` out of `img` (clipped to the image), convert to gray,
    /// resize to the model size and scale into `[0, 1]`.
    pub fn prepare(&self, img: &DynamicImage, region: &FaceRegion) -> Result<InputTensor> {
        let (img_w, img_h) = (img.width(), img.height());
        let clipped = region.clip(img_w, img_h).ok_or(Error::InvalidRegion {
            region: *region,
            width: img_w,
            height: img_h,
        })?;
        if clipped != *region {
            log::debug!("face region {} clipped to {}", region, clipped);
        }

        let crop = img.crop_imm(clipped.x, clipped.y, clipped.width, clipped.height);
        let gray = to_gray(&crop);

        let (w, h) = (self.size.width, self.size.height);
        let resized = imageops::resize(&gray, w, h, imageops::FilterType::Triangle);

        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();
        let array = Array4::from_shape_vec((1, h as usize, w as usize, 1), data)?;

        Ok(InputTensor(array))
    }

    /// Reject tensors that do not match the configured input shape.
    pub fn validate(&self, tensor: &InputTensor) -> Result<()> {
        let expected = self.input_shape();
        if tensor.shape() != expected {
            return Err(Error::ShapeMismatch {
                expected: expected.to_vec(),
                actual: tensor.shape().to_vec(),
            });
        }
        Ok(())
    }
}
