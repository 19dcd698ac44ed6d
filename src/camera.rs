use crate::error::InferenceError;
use crate::frame::Frame;
use image::imageops::{self, FilterType};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    Camera,
};
use tracing::{debug, warn};

/// Webcam capture device: acquired on demand, released on source switch.
pub trait WebcamDevice {
    fn acquire(&mut self, width: u32, height: u32, mirror: bool) -> Result<(), InferenceError>;
    fn is_ready(&self) -> bool;
    fn current_frame(&mut self) -> Result<Frame, InferenceError>;
    fn release(&mut self);
}

struct Stream {
    camera: Camera,
    width: u32,
    height: u32,
    mirror: bool,
}

/// Native webcam backed by nokhwa.
pub struct NokhwaWebcam {
    index: u32,
    stream: Option<Stream>,
}

impl NokhwaWebcam {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            stream: None,
        }
    }

    fn open(&self, width: u32, height: u32) -> Result<Camera, InferenceError> {
        for fmt in [FrameFormat::RAWRGB, FrameFormat::MJPEG, FrameFormat::YUYV] {
            let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new_from(width, height, fmt, 30),
            ));
            match Camera::new(CameraIndex::Index(self.index), req) {
                Ok(c) => return Ok(c),
                Err(e) => debug!(?fmt, "camera format rejected: {e}"),
            }
        }
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        Camera::new(CameraIndex::Index(self.index), req)
            .map_err(|e| InferenceError::Camera(e.to_string()))
    }
}

impl WebcamDevice for NokhwaWebcam {
    fn acquire(&mut self, width: u32, height: u32, mirror: bool) -> Result<(), InferenceError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let mut camera = self.open(width, height)?;
        camera
            .open_stream()
            .map_err(|e| InferenceError::Camera(e.to_string()))?;
        debug!(index = self.index, format = ?camera.camera_format(), "camera stream opened");
        self.stream = Some(Stream {
            camera,
            width,
            height,
            mirror,
        });
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.stream.is_some()
    }

    fn current_frame(&mut self) -> Result<Frame, InferenceError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| InferenceError::Camera("camera not acquired".into()))?;
        let buffer = stream
            .camera
            .frame()
            .map_err(|e| InferenceError::Camera(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| InferenceError::Camera(e.to_string()))?;
        let mut image = imageops::resize(&decoded, stream.width, stream.height, FilterType::Triangle);
        if stream.mirror {
            imageops::flip_horizontal_in_place(&mut image);
        }
        Ok(Frame::new(image))
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.camera.stop_stream() {
                warn!("failed to stop camera stream: {e}");
            }
            debug!(index = self.index, "camera released");
        }
    }
}

impl Drop for NokhwaWebcam {
    fn drop(&mut self) {
        self.release();
    }
}
