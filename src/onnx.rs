use crate::error::InferenceError;
use crate::frame::Frame;
use crate::inference::{
    Classifier, FaceBox, FaceDetector, InferenceProvider, ModelLocator, Prediction,
};
use candle_core::{DType, Device, Tensor};
use candle_onnx::{onnx, read_file, simple_eval};
use hf_hub::api::sync::Api;
use image::imageops::{self, FilterType};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

const MODEL_FILE: &str = "model.onnx";
const METADATA_FILE: &str = "metadata.json";
const DEFAULT_CLASSIFIER_SIZE: u32 = 224;
const DEFAULT_DETECTOR_SIZE: u32 = 128;

#[derive(Deserialize)]
struct Metadata {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(rename = "imageSize")]
    image_size: Option<u32>,
}

fn resolve(locator: &ModelLocator, file: &str) -> Result<PathBuf, InferenceError> {
    let local = locator.dir.join(file);
    if local.exists() {
        return Ok(local);
    }
    let Some(repo) = &locator.hf_repo else {
        return Err(InferenceError::MissingModel(local));
    };
    debug!(repo = %repo, file, "fetching model file from hub");
    Api::new()
        .and_then(|api| api.model(repo.clone()).get(file))
        .map_err(|e| InferenceError::Download {
            repo: repo.clone(),
            file: file.to_string(),
            reason: e.to_string(),
        })
}

fn read_metadata(locator: &ModelLocator) -> Result<Metadata, InferenceError> {
    let path = resolve(locator, METADATA_FILE)?;
    let data = std::fs::read(&path).map_err(|source| InferenceError::Io { path, source })?;
    Ok(serde_json::from_slice(&data)?)
}

/// Loaded graph with its first input and output names.
struct Graph {
    model: onnx::ModelProto,
    input: String,
    output: String,
}

impl Graph {
    fn load(locator: &ModelLocator) -> Result<Self, InferenceError> {
        let path = resolve(locator, MODEL_FILE)?;
        let model = read_file(&path)?;
        let graph = model.graph.as_ref().ok_or(InferenceError::MissingGraph)?;
        let input = graph
            .input
            .first()
            .map(|i| i.name.clone())
            .ok_or(InferenceError::MissingGraph)?;
        let output = graph
            .output
            .first()
            .map(|o| o.name.clone())
            .ok_or(InferenceError::MissingGraph)?;
        debug!(path = %path.display(), %input, %output, "onnx graph loaded");
        Ok(Self {
            model,
            input,
            output,
        })
    }

    fn run(&self, input: Tensor) -> Result<Tensor, InferenceError> {
        let mut inputs = HashMap::new();
        inputs.insert(self.input.clone(), input);
        let mut outputs = simple_eval(&self.model, inputs)?;
        outputs
            .remove(&self.output)
            .ok_or_else(|| InferenceError::MissingOutput(self.output.clone()))
    }
}

/// Square NCHW f32 tensor with `pixel * scale + offset` applied.
fn to_tensor(frame: &Frame, size: u32, scale: f64, offset: f64) -> candle_core::Result<Tensor> {
    let resized = imageops::resize(frame.image(), size, size, FilterType::CatmullRom);
    let side = size as usize;
    Tensor::from_vec(resized.into_raw(), (side, side, 3), &Device::Cpu)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(scale, offset)?
        .unsqueeze(0)
}

/// Raw scores become a distribution unless they already are one.
fn to_distribution(scores: Vec<f32>) -> Vec<f32> {
    let total: f32 = scores.iter().sum();
    if scores.iter().all(|s| (0.0..=1.0).contains(s)) && (total - 1.0).abs() < 1e-3 {
        return scores;
    }
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

pub struct OnnxClassifier {
    graph: Graph,
    labels: Vec<String>,
    image_size: u32,
}

impl Classifier for OnnxClassifier {
    fn class_count(&self) -> usize {
        self.labels.len()
    }

    fn classify(&self, frame: &Frame) -> Result<Vec<Prediction>, InferenceError> {
        let input = to_tensor(frame, self.image_size, 1.0 / 127.5, -1.0)?;
        let output = self.graph.run(input)?;
        let scores = output.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        if scores.len() != self.labels.len() {
            return Err(InferenceError::ClassCount {
                expected: self.labels.len(),
                got: scores.len(),
            });
        }
        let probs = to_distribution(scores);
        trace!(?probs, "classifier scores");
        Ok(self
            .labels
            .iter()
            .zip(probs)
            .map(|(label, p)| Prediction::new(label.clone(), p))
            .collect())
    }
}

pub struct OnnxFaceDetector {
    graph: Graph,
    image_size: u32,
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&self, frame: &Frame, min_confidence: f32) -> Result<Vec<FaceBox>, InferenceError> {
        let input = to_tensor(frame, self.image_size, 1.0 / 255.0, 0.0)?;
        let output = self.graph.run(input)?;
        let dims = output.dims().to_vec();
        let Some(width) = dims.last().copied().filter(|&w| w >= 5) else {
            return Err(InferenceError::OutputShape(dims));
        };
        let values = output.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        let (fw, fh) = (frame.width() as f32, frame.height() as f32);
        let mut faces: Vec<FaceBox> = values
            .chunks_exact(width)
            .map(|row| FaceBox {
                left: row[0] * fw,
                top: row[1] * fh,
                right: row[2] * fw,
                bottom: row[3] * fh,
                confidence: row[4],
            })
            .filter(|f| f.confidence >= min_confidence)
            .collect();
        faces.sort_by(|a, b| b.area().total_cmp(&a.area()));
        trace!(count = faces.len(), "faces detected");
        Ok(faces)
    }
}

/// Loads models exported as ONNX with a Teachable Machine style
/// `metadata.json` next to them.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxProvider;

impl InferenceProvider for OnnxProvider {
    fn load_classifier(
        &self,
        locator: &ModelLocator,
    ) -> Result<Arc<dyn Classifier>, InferenceError> {
        let metadata = read_metadata(locator)?;
        if metadata.labels.is_empty() {
            return Err(InferenceError::ClassCount {
                expected: 1,
                got: 0,
            });
        }
        let graph = Graph::load(locator)?;
        Ok(Arc::new(OnnxClassifier {
            graph,
            labels: metadata.labels,
            image_size: metadata.image_size.unwrap_or(DEFAULT_CLASSIFIER_SIZE),
        }))
    }

    fn load_face_detector(
        &self,
        locator: &ModelLocator,
    ) -> Result<Arc<dyn FaceDetector>, InferenceError> {
        let image_size = match read_metadata(locator) {
            Ok(m) => m.image_size,
            Err(InferenceError::MissingModel(_)) => None,
            Err(e) => return Err(e),
        };
        let graph = Graph::load(locator)?;
        Ok(Arc::new(OnnxFaceDetector {
            graph,
            image_size: image_size.unwrap_or(DEFAULT_DETECTOR_SIZE),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_passes_through_probabilities() {
        let probs = to_distribution(vec![0.7, 0.2, 0.1]);
        assert_eq!(probs, vec![0.7, 0.2, 0.1]);
    }

    #[test]
    fn distribution_softmaxes_logits() {
        let probs = to_distribution(vec![2.0, 1.0, -1.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn missing_model_without_repo_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ModelLocator::local(dir.path());
        match OnnxProvider.load_classifier(&locator) {
            Err(InferenceError::MissingModel(path)) => {
                assert_eq!(path, dir.path().join(METADATA_FILE))
            }
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("load should fail"),
        }
    }
}
