//! Turning environment renders into viewable artifacts.

mod errors;
mod gif;

pub use errors::RenderError;
pub use gif::{FPS, GifRecorder, frame_delay};

use image::RgbImage;
use image::imageops::{self, FilterType};
use std::fs;
use std::path::Path;

/// Nearest-neighbour resize to a `size` x `size` square, keeping cells crisp.
pub fn upscale(frame: &RgbImage, size: u32) -> RgbImage {
    imageops::resize(frame, size, size, FilterType::Nearest)
}

pub fn save_png(frame: &RgbImage, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    frame.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::tempdir;

    #[test]
    fn upscale_keeps_cells_solid() {
        let mut frame = RgbImage::new(2, 2);
        frame.put_pixel(1, 0, Rgb([255, 0, 0]));
        let big = upscale(&frame, 10);
        assert_eq!(big.dimensions(), (10, 10));
        assert_eq!(*big.get_pixel(9, 0), Rgb([255, 0, 0]));
        assert_eq!(*big.get_pixel(5, 4), Rgb([255, 0, 0]));
        assert_eq!(*big.get_pixel(4, 4), Rgb([0, 0, 0]));
    }

    #[test]
    fn png_preview_is_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/tmp.png");
        save_png(&RgbImage::new(4, 4), &path).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!(loaded.width(), 4);
    }
}
