use image::{DynamicImage, GrayImage, RgbImage};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::error::{Error, Result};

fn camera_err(what: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |e| Error::Camera(format!("{what}: {e}"))
}

/// V4L2 capture device producing frames for a live stream.
pub struct Camera {
    stream: Stream<'static>,
    width: u32,
    height: u32,
    fourcc: FourCC,
}

impl Camera {
    pub fn open(device: &str) -> Result<Self> {
        let dev = Device::with_path(device).map_err(camera_err("open camera"))?;
        let mut fmt = dev.format().map_err(camera_err("get format"))?;
        // Prefer RGB, fallback to YUYV, else accept existing format
        let desired = Format::new(fmt.width, fmt.height, FourCC::new(b"RGB3"));
        fmt = dev.set_format(&desired).unwrap_or(fmt);
        if fmt.fourcc != FourCC::new(b"RGB3") {
            let yuyv = Format::new(fmt.width, fmt.height, FourCC::new(b"YUYV"));
            fmt = dev.set_format(&yuyv).unwrap_or(fmt);
        }
        let stream =
            Stream::with_buffers(&dev, Type::VideoCapture, 4).map_err(camera_err("stream"))?;
        log::info!(
            "camera {} streaming {}x{} {:?}",
            device,
            fmt.width,
            fmt.height,
            fmt.fourcc
        );
        Ok(Self {
            stream,
            width: fmt.width,
            height: fmt.height,
            fourcc: fmt.fourcc,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame(&mut self) -> Result<DynamicImage> {
        let (data, meta) = self.stream.next().map_err(camera_err("capture frame"))?;
        log::trace!(
            "captured frame: seq={} len={} fourcc={:?}",
            meta.sequence,
            data.len(),
            self.fourcc
        );
        decode_frame(self.fourcc, self.width, self.height, data)
    }
}

/// Turn a raw capture buffer into an image. Grayscale sensors stay single
/// channel; the pipeline converts color frames itself.
pub fn decode_frame(
    fourcc: FourCC,
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<DynamicImage> {
    let pixels = width as usize * height as usize;
    let short = |need: usize| {
        Error::Camera(format!(
            "short {:?} buffer: got {}, expected {}",
            fourcc,
            data.len(),
            need
        ))
    };

    if fourcc == FourCC::new(b"RGB3") {
        let need = pixels * 3;
        if data.len() < need {
            return Err(short(need));
        }
        RgbImage::from_raw(width, height, data[..need].to_vec())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| short(need))
    } else if fourcc == FourCC::new(b"YUYV") {
        let need = pixels * 2;
        if data.len() < need {
            return Err(short(need));
        }
        RgbImage::from_raw(width, height, yuyv_to_rgb(&data[..need]))
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| short(need))
    } else if fourcc == FourCC::new(b"GREY") {
        if data.len() < pixels {
            return Err(short(pixels));
        }
        GrayImage::from_raw(width, height, data[..pixels].to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| short(pixels))
    } else {
        Err(Error::Camera(format!("unsupported pixel format {fourcc:?}")))
    }
}

fn yuyv_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 * 3);
    for chunk in data.chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            out.push(clamp(y + 1.402 * v));
            out.push(clamp(y - 0.344136 * u - 0.714136 * v));
            out.push(clamp(y + 1.772 * u));
        }
    }
    out
}

fn clamp(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        let rgb = yuyv_to_rgb(&[100, 128, 200, 128]);
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn test_decode_grey_frame_stays_single_channel() {
        let img = decode_frame(FourCC::new(b"GREY"), 4, 2, &[7; 8]).unwrap();
        assert!(matches!(img, DynamicImage::ImageLuma8(_)));
        assert_eq!((img.width(), img.height()), (4, 2));
    }

    #[test]
    fn test_decode_short_buffer() {
        let err = decode_frame(FourCC::new(b"RGB3"), 4, 4, &[0; 10]).unwrap_err();
        assert!(matches!(err, Error::Camera(_)));
    }

    #[test]
    fn test_decode_huge_dimensions_report_short_buffer() {
        let err = decode_frame(FourCC::new(b"GREY"), 65_536, 65_536, &[0; 16]).unwrap_err();
        match err {
            Error::Camera(msg) => assert!(msg.contains("4294967296"), "{msg}"),
            other => panic!("expected a camera error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_format() {
        assert!(decode_frame(FourCC::new(b"MJPG"), 2, 2, &[0; 16]).is_err());
    }
}
