use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned face rectangle in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect with a `width`x`height` image. `None` when nothing is left.
    pub fn clip(&self, width: u32, height: u32) -> Option<FaceRegion> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        let clipped = FaceRegion::new(x0, y0, x1 - x0, y1 - y0);
        (!clipped.is_empty()).then_some(clipped)
    }

    /// Build a region from a detector box that may start left of or above
    /// the image, clipping it to the image bounds.
    pub fn from_detector_box(
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    ) -> Option<FaceRegion> {
        let left = x as i64;
        let top = y as i64;
        let right = (left + width as i64).clamp(0, image_width as i64);
        let bottom = (top + height as i64).clamp(0, image_height as i64);
        let left = left.clamp(0, image_width as i64);
        let top = top.clamp(0, image_height as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(FaceRegion::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

impl fmt::Display for FaceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Pick the primary face: largest area, first one wins on ties.
pub fn select(regions: &[FaceRegion]) -> Option<FaceRegion> {
    regions
        .iter()
        .fold(None, |best: Option<&FaceRegion>, r| match best {
            Some(b) if b.area() >= r.area() => Some(b),
            _ => Some(r),
        })
        .copied()
}
