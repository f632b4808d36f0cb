use super::{RenderError, upscale};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, RgbImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

pub const FPS: u32 = 60;

/// Per-frame delay of the exported animation.
pub fn frame_delay() -> Delay {
    Delay::from_numer_denom_ms(1000, FPS)
}

/// Collects upscaled frames of an episode and writes them as a looping GIF.
pub struct GifRecorder {
    size: u32,
    frames: Vec<RgbImage>,
}

impl GifRecorder {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: &RgbImage) {
        self.frames.push(upscale(frame, self.size));
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn write(&self, path: &Path) -> Result<(), RenderError> {
        if self.frames.is_empty() {
            return Err(RenderError::Empty);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut encoder = GifEncoder::new(BufWriter::new(File::create(path)?));
        encoder.set_repeat(Repeat::Infinite)?;
        let delay = frame_delay();
        encoder.encode_frames(self.frames.iter().map(|frame| {
            let rgba = DynamicImage::ImageRgb8(frame.clone()).to_rgba8();
            Frame::from_parts(rgba, 0, 0, delay)
        }))?;
        tracing::debug!(path = %path.display(), frames = self.frames.len(), "wrote animation");
        Ok(())
    }
}
