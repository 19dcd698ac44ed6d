use crate::error::{Result, StyleMateError};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// A single RGB image handed to the classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::new(image.into_rgb8())
    }

    /// Uniform test pattern; useful where the pixels do not matter.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Decodes an uploaded image file.
pub fn decode_upload(path: &Path) -> Result<Frame> {
    let image = image::open(path).map_err(|source| StyleMateError::UploadDecodeFailure {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded upload");
    Ok(Frame::from_dynamic(image))
}

fn is_image(path: &Path) -> bool {
    path.is_file() && ImageFormat::from_path(path).is_ok()
}

/// Image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(rd) => {
            let mut paths: Vec<PathBuf> = rd
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| is_image(p))
                .collect();
            paths.sort();
            if paths.is_empty() {
                error!("no images found in {}", dir.display());
            }
            paths
        }
        Err(e) => {
            error!("failed to read {}: {e}", dir.display());
            Vec::new()
        }
    }
}

/// Expands a CLI path argument into the images it names.
pub fn collect_images(path: &Path) -> Vec<PathBuf> {
    if path.is_dir() {
        list_images(path)
    } else {
        vec![path.to_path_buf()]
    }
}
