//! Checks applied before a classification is shown.
//!
//! The face gates run before the classifier and can reject the frame
//! outright. The confidence gate runs afterwards and only attaches an
//! advisory banner.

use crate::config::GatingConfig;
use crate::inference::{ClassificationResult, FaceBox};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    NoFace,
    FaceTooSmall { width: f32, height: f32 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoFace => f.write_str(
                "No face detected. Make sure the face is visible from the front, well lit and not covered.",
            ),
            Rejection::FaceTooSmall { width, height } => write!(
                f,
                "Face too small ({width:.0}x{height:.0}px). Move closer to the camera or use a photo where the face is larger.",
            ),
        }
    }
}

/// Banner shown when the winning class is below the confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowConfidence {
    pub top_probability: f32,
    pub threshold: f32,
}

impl fmt::Display for LowConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Low confidence: top prediction {:.1}% is below {:.0}%. Try again or use a clearer image.",
            self.top_probability * 100.0,
            self.threshold * 100.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gates {
    face_presence: Option<f32>,
    min_face_size: Option<f32>,
    min_confidence: Option<f32>,
}

impl Gates {
    /// All gates disabled.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &GatingConfig) -> Self {
        let faces = cfg.face_detector.is_some();
        Self {
            face_presence: cfg.face_confidence.filter(|_| faces),
            min_face_size: cfg.min_face_size.filter(|_| faces).map(|s| s as f32),
            min_confidence: cfg.min_confidence,
        }
    }

    pub fn with_face_presence(mut self, threshold: f32) -> Self {
        self.face_presence = Some(threshold);
        self
    }

    pub fn with_min_face_size(mut self, pixels: u32) -> Self {
        self.min_face_size = Some(pixels as f32);
        self
    }

    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence = Some(threshold);
        self
    }

    pub fn needs_faces(&self) -> bool {
        self.face_presence.is_some() || self.min_face_size.is_some()
    }

    /// Confidence passed to the detector.
    pub fn detection_threshold(&self) -> f32 {
        self.face_presence.unwrap_or(0.0)
    }

    /// `faces` are expected largest first.
    pub fn check_faces(&self, faces: &[FaceBox]) -> Result<(), Rejection> {
        if let Some(threshold) = self.face_presence {
            if !faces.iter().any(|f| f.confidence >= threshold) {
                return Err(Rejection::NoFace);
            }
        }
        if let (Some(min), Some(face)) = (self.min_face_size, faces.first()) {
            if face.width() < min || face.height() < min {
                return Err(Rejection::FaceTooSmall {
                    width: face.width(),
                    height: face.height(),
                });
            }
        }
        Ok(())
    }

    pub fn low_confidence(&self, result: &ClassificationResult) -> Option<LowConfidence> {
        let threshold = self.min_confidence?;
        let top = result.top().probability;
        (top < threshold).then_some(LowConfidence {
            top_probability: top,
            threshold,
        })
    }
}
