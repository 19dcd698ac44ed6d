use crate::command::UserCommand;
use crate::error::{InferenceError, StyleMateError};
use crate::gate::Rejection;
use crate::inference::{Classifier, ClassificationResult, FaceDetector};
use crate::session::ModelSlot;
use std::fmt;
use std::sync::Arc;

/// Tag attached to a dispatched classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: u64,
    pub generation: u64,
    pub slot: ModelSlot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(ClassificationResult),
    Rejected(Rejection),
}

pub struct LoadedModel {
    pub classifier: Arc<dyn Classifier>,
    pub detector: Option<Arc<dyn FaceDetector>>,
    pub detector_error: Option<InferenceError>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("class_count", &self.classifier.class_count())
            .field("detector", &self.detector.is_some())
            .field("detector_error", &self.detector_error)
            .finish()
    }
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Event {
    Tick {
        generation: u64,
    },
    ModelLoaded {
        slot: ModelSlot,
        generation: u64,
        result: Result<LoadedModel, StyleMateError>,
    },
    Classified {
        ticket: Ticket,
        verdict: Result<Verdict, InferenceError>,
    },
    User(UserCommand),
    Shutdown,
}
