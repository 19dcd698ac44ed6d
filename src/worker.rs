use crate::error::{InferenceError, StyleMateError};
use crate::event::{Event, LoadedModel, Ticket, Verdict};
use crate::frame::Frame;
use crate::gate::Gates;
use crate::inference::{
    Classifier, ClassificationResult, FaceDetector, InferenceProvider, ModelLocator,
};
use crate::session::ModelSlot;
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, warn};

pub(crate) enum Job {
    Load {
        slot: ModelSlot,
        generation: u64,
        locator: ModelLocator,
        detector: Option<ModelLocator>,
    },
    Classify {
        ticket: Ticket,
        classifier: Arc<dyn Classifier>,
        detector: Option<Arc<dyn FaceDetector>>,
        frame: Arc<Frame>,
        gates: Gates,
    },
}

/// Background thread running jobs one at a time and reporting completions
/// on the controller's event channel.
pub(crate) struct InferenceWorker {
    jobs: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
    pub(crate) fn spawn(provider: Arc<dyn InferenceProvider>, events: Sender<Event>) -> Self {
        let (tx, rx) = channel::<Job>();
        let handle = std::thread::Builder::new()
            .name("stylemate-inference".into())
            .spawn(move || {
                debug!("inference worker started");
                for job in rx {
                    let event = run_job(provider.as_ref(), job);
                    if events.send(event).is_err() {
                        break;
                    }
                }
                debug!("inference worker stopped");
            });
        match handle {
            Ok(handle) => Self {
                jobs: Some(tx),
                handle: Some(handle),
            },
            Err(e) => {
                error!("failed to spawn inference worker: {e}");
                Self {
                    jobs: None,
                    handle: None,
                }
            }
        }
    }

    pub(crate) fn submit(&self, job: Job) -> Result<(), StyleMateError> {
        self.jobs
            .as_ref()
            .ok_or(StyleMateError::WorkerUnavailable)?
            .send(job)
            .map_err(|_| StyleMateError::WorkerUnavailable)
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_job(provider: &dyn InferenceProvider, job: Job) -> Event {
    match job {
        Job::Load {
            slot,
            generation,
            locator,
            detector,
        } => {
            let started = Instant::now();
            let result = load(provider, &locator, detector.as_ref())
                .map_err(|source| StyleMateError::ModelLoadFailure { slot, source });
            debug!(%slot, ok = result.is_ok(), elapsed = ?started.elapsed(), "model load finished");
            Event::ModelLoaded {
                slot,
                generation,
                result,
            }
        }
        Job::Classify {
            ticket,
            classifier,
            detector,
            frame,
            gates,
        } => Event::Classified {
            ticket,
            verdict: classify(classifier.as_ref(), detector.as_deref(), &frame, &gates),
        },
    }
}

/// A detector failure does not fail the slot; the classifier is still
/// returned and the error travels alongside it.
fn load(
    provider: &dyn InferenceProvider,
    locator: &ModelLocator,
    detector: Option<&ModelLocator>,
) -> Result<LoadedModel, InferenceError> {
    let classifier = provider.load_classifier(locator)?;
    let (detector, detector_error) = match detector.map(|d| provider.load_face_detector(d)) {
        Some(Ok(detector)) => (Some(detector), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    Ok(LoadedModel {
        classifier,
        detector,
        detector_error,
    })
}

fn classify(
    classifier: &dyn Classifier,
    detector: Option<&dyn FaceDetector>,
    frame: &Frame,
    gates: &Gates,
) -> Result<Verdict, InferenceError> {
    if gates.needs_faces() {
        match detector {
            Some(detector) => {
                let faces = detector.detect(frame, gates.detection_threshold())?;
                if let Err(rejection) = gates.check_faces(&faces) {
                    debug!(?rejection, faces = faces.len(), "frame rejected");
                    return Ok(Verdict::Rejected(rejection));
                }
            }
            None => warn!("face gates enabled without a face detector"),
        }
    }
    let predictions = classifier.classify(frame)?;
    let result = ClassificationResult::from_predictions(predictions, classifier.class_count())?;
    Ok(Verdict::Accepted(result))
}
