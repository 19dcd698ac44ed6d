#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stylemate::camera::WebcamDevice;
use stylemate::config::Config;
use stylemate::inference::{
    Classifier, FaceBox, FaceDetector, InferenceProvider, ModelLocator, Prediction,
};
use stylemate::schedule::Schedule;
use stylemate::{Frame, InferenceError, SessionController};

pub const SETTLE: Duration = Duration::from_secs(5);

pub fn predictions(rows: &[(&str, f32)]) -> Vec<Prediction> {
    rows.iter().map(|(l, p)| Prediction::new(*l, *p)).collect()
}

pub fn face_shapes(top: f32) -> Vec<Prediction> {
    let rest = (1.0 - top) / 4.0;
    predictions(&[
        ("Oval", top),
        ("Round", rest),
        ("Square", rest),
        ("Heart", rest),
        ("Oblong", rest),
    ])
}

/// Classifier whose output can be swapped between calls.
pub struct ScriptedClassifier {
    output: Mutex<Vec<Prediction>>,
    class_count: usize,
    pub calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(output: Vec<Prediction>) -> Arc<Self> {
        Arc::new(Self {
            class_count: output.len(),
            output: Mutex::new(output),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_output(&self, output: Vec<Prediction>) {
        *self.output.lock().unwrap() = output;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn class_count(&self) -> usize {
        self.class_count
    }

    fn classify(&self, _frame: &Frame) -> Result<Vec<Prediction>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.lock().unwrap().clone())
    }
}

pub struct ScriptedDetector {
    faces: Mutex<Vec<FaceBox>>,
}

impl ScriptedDetector {
    pub fn new(faces: Vec<FaceBox>) -> Arc<Self> {
        Arc::new(Self {
            faces: Mutex::new(faces),
        })
    }

    pub fn set_faces(&self, faces: Vec<FaceBox>) {
        *self.faces.lock().unwrap() = faces;
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&self, _frame: &Frame, min_confidence: f32) -> Result<Vec<FaceBox>, InferenceError> {
        Ok(self
            .faces
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|f| f.confidence >= min_confidence)
            .collect())
    }
}

pub fn face(size: f32, confidence: f32) -> FaceBox {
    FaceBox {
        left: 10.0,
        top: 10.0,
        right: 10.0 + size,
        bottom: 10.0 + size,
        confidence,
    }
}

/// Provider keyed by locator directory; unknown locators fail to load.
#[derive(Default)]
pub struct ScriptedProvider {
    classifiers: HashMap<String, Arc<ScriptedClassifier>>,
    detector: Option<Arc<ScriptedDetector>>,
    pub loads: AtomicUsize,
    pub detector_loads: AtomicUsize,
}

impl ScriptedProvider {
    pub fn with_classifier(mut self, dir: &str, classifier: Arc<ScriptedClassifier>) -> Self {
        self.classifiers.insert(dir.to_string(), classifier);
        self
    }

    pub fn with_detector(mut self, detector: Arc<ScriptedDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl InferenceProvider for ScriptedProvider {
    fn load_classifier(
        &self,
        locator: &ModelLocator,
    ) -> Result<Arc<dyn Classifier>, InferenceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let key = locator.dir.to_string_lossy().to_string();
        match self.classifiers.get(&key) {
            Some(c) => Ok(c.clone() as Arc<dyn Classifier>),
            None => Err(InferenceError::MissingModel(locator.dir.clone())),
        }
    }

    fn load_face_detector(
        &self,
        locator: &ModelLocator,
    ) -> Result<Arc<dyn FaceDetector>, InferenceError> {
        self.detector_loads.fetch_add(1, Ordering::SeqCst);
        match &self.detector {
            Some(d) => Ok(d.clone() as Arc<dyn FaceDetector>),
            None => Err(InferenceError::MissingModel(locator.dir.clone())),
        }
    }
}

#[derive(Default)]
pub struct WebcamProbe {
    pub fail: AtomicBool,
    pub frames_fail: AtomicBool,
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
    pub ready: AtomicBool,
}

impl WebcamProbe {
    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

pub struct FakeWebcam {
    probe: Arc<WebcamProbe>,
    size: (u32, u32),
}

impl FakeWebcam {
    pub fn new(probe: Arc<WebcamProbe>) -> Self {
        Self {
            probe,
            size: (0, 0),
        }
    }
}

impl WebcamDevice for FakeWebcam {
    fn acquire(&mut self, width: u32, height: u32, _mirror: bool) -> Result<(), InferenceError> {
        self.probe.acquires.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(InferenceError::Camera("permission denied".into()));
        }
        self.size = (width, height);
        self.probe.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.probe.is_ready()
    }

    fn current_frame(&mut self) -> Result<Frame, InferenceError> {
        if !self.probe.is_ready() {
            return Err(InferenceError::Camera("camera not acquired".into()));
        }
        if self.probe.frames_fail.load(Ordering::SeqCst) {
            return Err(InferenceError::Camera("device disconnected".into()));
        }
        Ok(Frame::blank(self.size.0, self.size.1))
    }

    fn release(&mut self) {
        if self.probe.ready.swap(false, Ordering::SeqCst) {
            self.probe.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct Harness {
    pub controller: SessionController,
    pub provider: Arc<ScriptedProvider>,
    pub webcam: Arc<WebcamProbe>,
    pub face_shape: Arc<ScriptedClassifier>,
    pub tone: Arc<ScriptedClassifier>,
}

pub fn config() -> Config {
    let mut cfg = Config::default();
    cfg.face_shape_model = ModelLocator::local("face");
    cfg.personal_tone_model = ModelLocator::local("tone");
    cfg
}

pub fn harness_with(cfg: Config, provider: ScriptedProvider) -> Harness {
    let face_shape = ScriptedClassifier::new(face_shapes(0.82));
    let tone = ScriptedClassifier::new(predictions(&[("Cool", 0.7), ("Warm", 0.3)]));
    let provider = Arc::new(
        provider
            .with_classifier("face", face_shape.clone())
            .with_classifier("tone", tone.clone()),
    );
    let webcam = Arc::new(WebcamProbe::default());
    let controller = SessionController::new(
        cfg,
        provider.clone(),
        Box::new(FakeWebcam::new(webcam.clone())),
    )
    .with_schedule(Schedule::Manual);
    Harness {
        controller,
        provider,
        webcam,
        face_shape,
        tone,
    }
}

pub fn harness() -> Harness {
    harness_with(config(), ScriptedProvider::default())
}

impl Harness {
    pub fn settle(&mut self) {
        assert!(self.controller.settle(SETTLE), "controller did not settle");
    }
}
