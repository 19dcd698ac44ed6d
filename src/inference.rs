//! Inference boundary: classifiers, face detectors and the provider that
//! loads them, plus the ranked result type the controller renders.

use crate::error::InferenceError;
use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a model lives: a local directory, optionally backed by a Hugging
/// Face repository holding the same file names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelLocator {
    pub dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hf_repo: Option<String>,
}

impl ModelLocator {
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            hf_repo: None,
        }
    }
}

impl fmt::Display for ModelLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hf_repo {
            Some(repo) => write!(f, "{} ({repo})", self.dir.display()),
            None => write!(f, "{}", self.dir.display()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Class probabilities for one frame, sorted by descending probability and
/// normalised to sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    ranked: Vec<Prediction>,
}

impl ClassificationResult {
    /// Validates raw classifier output against the reported class count.
    pub fn from_predictions(
        predictions: Vec<Prediction>,
        class_count: usize,
    ) -> Result<Self, InferenceError> {
        if class_count == 0 || predictions.len() != class_count {
            return Err(InferenceError::ClassCount {
                expected: class_count,
                got: predictions.len(),
            });
        }
        if let Some(bad) = predictions
            .iter()
            .find(|p| !p.probability.is_finite() || p.probability < 0.0)
        {
            return Err(InferenceError::Probability {
                label: bad.label.clone(),
                value: bad.probability,
            });
        }
        let total: f64 = predictions.iter().map(|p| p.probability as f64).sum();
        if total <= 0.0 {
            return Err(InferenceError::Probability {
                label: predictions[0].label.clone(),
                value: 0.0,
            });
        }
        let mut ranked: Vec<Prediction> = predictions
            .into_iter()
            .map(|p| Prediction {
                probability: (p.probability as f64 / total) as f32,
                label: p.label,
            })
            .collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Ok(Self { ranked })
    }

    /// Winning class.
    pub fn top(&self) -> &Prediction {
        &self.ranked[0]
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Axis-aligned face bounding box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

pub trait Classifier: Send + Sync {
    fn class_count(&self) -> usize;
    fn classify(&self, frame: &Frame) -> Result<Vec<Prediction>, InferenceError>;
}

pub trait FaceDetector: Send + Sync {
    /// Faces scoring at least `min_confidence`, largest first.
    fn detect(&self, frame: &Frame, min_confidence: f32) -> Result<Vec<FaceBox>, InferenceError>;
}

pub trait InferenceProvider: Send + Sync {
    fn load_classifier(&self, locator: &ModelLocator)
        -> Result<Arc<dyn Classifier>, InferenceError>;
    fn load_face_detector(
        &self,
        locator: &ModelLocator,
    ) -> Result<Arc<dyn FaceDetector>, InferenceError>;
}
