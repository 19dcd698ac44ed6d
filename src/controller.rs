use crate::camera::WebcamDevice;
use crate::command::UserCommand;
use crate::config::Config;
use crate::error::{InferenceError, Result, StyleMateError};
use crate::event::{Event, LoadedModel, Ticket, Verdict};
use crate::frame::{decode_upload, Frame};
use crate::gate::Gates;
use crate::inference::{Classifier, FaceDetector, InferenceProvider, ModelLocator};
use crate::recommendation::{browse, GuideEntry};
use crate::schedule::{LoopHandle, Schedule};
use crate::session::{InputSource, ModelSlot, RunState, Session, SlotBehavior};
use crate::view::{
    Advisory, LabelPanel, RankedList, RecommendationPanel, View, IMAGE_UPLOADED, SELECT_MODEL,
    WAITING,
};
use crate::worker::{InferenceWorker, Job};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{channel, Receiver, Sender},
    Arc,
};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const HAIRSTYLE_PROMPT: &str = "Run an analysis to see hairstyle recommendations.";

/// Owns the session and mediates every transition between input source,
/// model slot and run state.
///
/// All state lives on the thread that owns the controller. Model loads and
/// classifications run on a worker thread and come back as [`Event`]s, which
/// the owner feeds to [`SessionController::handle`].
pub struct SessionController {
    session: Session,
    view: View,
    config: Config,
    gates: Gates,
    webcam: Box<dyn WebcamDevice>,
    upload: Option<Arc<Frame>>,
    models: HashMap<ModelSlot, Arc<dyn Classifier>>,
    detector: Option<Arc<dyn FaceDetector>>,
    pending_load: Option<(ModelSlot, u64)>,
    in_flight: Option<Ticket>,
    rerun: bool,
    next_ticket: u64,
    rendered: u64,
    schedule: Schedule,
    frame_loop: Option<LoopHandle>,
    tick_pending: Arc<AtomicBool>,
    worker: InferenceWorker,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
}

impl SessionController {
    pub fn new(
        config: Config,
        provider: Arc<dyn InferenceProvider>,
        webcam: Box<dyn WebcamDevice>,
    ) -> Self {
        let (events_tx, events_rx) = channel();
        let worker = InferenceWorker::spawn(provider, events_tx.clone());
        Self {
            session: Session::new(config.initial_source),
            view: View::default(),
            gates: Gates::from_config(&config.gating),
            schedule: Schedule::from_fps(config.loop_fps),
            config,
            webcam,
            upload: None,
            models: HashMap::new(),
            detector: None,
            pending_load: None,
            in_flight: None,
            rerun: false,
            next_ticket: 0,
            rendered: 0,
            frame_loop: None,
            tick_pending: Arc::new(AtomicBool::new(false)),
            worker,
            events_tx,
            events_rx,
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_gates(mut self, gates: Gates) -> Self {
        self.gates = gates;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Number of classification outcomes rendered so far.
    pub fn rendered_results(&self) -> u64 {
        self.rendered
    }

    /// Sender for injecting events, e.g. user commands from another thread.
    pub fn events(&self) -> Sender<Event> {
        self.events_tx.clone()
    }

    /// True while a model load or a classification is outstanding.
    pub fn is_busy(&self) -> bool {
        self.pending_load.is_some() || self.in_flight.is_some()
    }

    pub fn select_input_source(&mut self, source: InputSource) {
        let previous = self.session.input_source();
        if previous == source {
            return;
        }
        if self.session.run_state() == RunState::Running {
            self.pause();
        }
        if previous == InputSource::Webcam && self.webcam.is_ready() {
            self.webcam.release();
        }
        self.session.bump_generation();
        self.rerun = false;
        self.session.set_input_source(source);
        if self.session.run_state() == RunState::Error {
            self.session.transition(RunState::Idle);
        }
        let placeholder = self.recommendation_placeholder();
        self.view.reset(WAITING, placeholder);
        info!(%source, "input source selected");
    }

    pub fn select_model_slot(&mut self, slot: ModelSlot) -> Result<()> {
        if let Some((pending, _)) = self.pending_load {
            if pending == slot {
                debug!(%slot, "model already loading");
                return Ok(());
            }
        }
        if self.session.active_slot() == Some(slot) {
            if self.pending_load.take().is_some() {
                debug!(%slot, "pending load abandoned");
                self.session.bump_generation();
                self.session.transition(RunState::Idle);
            } else if self.session.run_state() == RunState::Error {
                self.session.transition(RunState::Idle);
                self.view.clear_advisory();
            }
            return Ok(());
        }
        if self.session.run_state() == RunState::Running {
            self.pause();
        }
        let generation = self.session.bump_generation();
        self.session.transition(RunState::Loading);

        let detector = self.detector_to_load();
        if self.models.contains_key(&slot) && detector.is_none() {
            debug!(%slot, "model cached");
            self.activate(slot);
            return Ok(());
        }
        let job = Job::Load {
            slot,
            generation,
            locator: self.config.locator(slot).clone(),
            detector,
        };
        if let Err(e) = self.worker.submit(job) {
            self.session.transition(RunState::Error);
            return Err(self.advise(e));
        }
        self.pending_load = Some((slot, generation));
        info!(%slot, locator = %self.config.locator(slot), "loading model");
        Ok(())
    }

    /// Starts analysis, or pauses it when already running.
    pub fn start_or_resume(&mut self) -> Result<RunState> {
        if self.session.active_slot().is_none() {
            return Err(self.advise(StyleMateError::NoModelSelected));
        }
        match self.session.run_state() {
            RunState::Running => {
                self.pause();
                info!("analysis paused");
                return Ok(RunState::Paused);
            }
            RunState::Loading => {
                debug!("start ignored while loading");
                return Ok(RunState::Loading);
            }
            _ => {}
        }
        match self.session.input_source() {
            InputSource::Webcam => {
                if !self.webcam.is_ready() {
                    let cam = &self.config.webcam;
                    if let Err(e) = self.webcam.acquire(cam.width, cam.height, cam.mirror) {
                        self.session.transition(RunState::Error);
                        return Err(self.advise(StyleMateError::FrameSourceAcquisitionFailure(e)));
                    }
                }
                self.session.transition(RunState::Running);
                self.view.clear_advisory();
                self.start_loop();
            }
            InputSource::Upload => {
                let Some(frame) = self.upload.clone() else {
                    return Err(self.advise(StyleMateError::NoFrameAvailable));
                };
                self.session.transition(RunState::Running);
                self.view.clear_advisory();
                self.classify_once(frame);
            }
        }
        info!(source = %self.session.input_source(), "analysis running");
        Ok(self.session.run_state())
    }

    pub fn upload_image(&mut self, path: &Path) -> Result<()> {
        match decode_upload(path) {
            Ok(frame) => {
                self.upload_frame(frame);
                Ok(())
            }
            Err(e) => Err(self.advise(e)),
        }
    }

    pub fn upload_frame(&mut self, frame: Frame) {
        self.upload = Some(Arc::new(frame));
        if self.session.input_source() == InputSource::Upload {
            self.view
                .set_labels(LabelPanel::Placeholder(IMAGE_UPLOADED.into()));
            self.view.clear_advisory();
        }
    }

    /// Manual "process image" trigger for the uploaded frame.
    pub fn process_upload(&mut self) -> Result<()> {
        if self.session.active_slot().is_none() {
            return Err(self.advise(StyleMateError::NoModelSelected));
        }
        let frame = match (self.session.input_source(), &self.upload) {
            (InputSource::Upload, Some(frame)) => frame.clone(),
            _ => return Err(self.advise(StyleMateError::NoFrameAvailable)),
        };
        if self.session.run_state() == RunState::Loading {
            debug!("processing ignored while loading");
            return Ok(());
        }
        self.view.clear_advisory();
        self.classify_once(frame);
        Ok(())
    }

    /// Shows the active slot's guide entry for `label`.
    pub fn browse_guide(&mut self, label: &str) -> Result<GuideEntry> {
        let Some(slot) = self.session.active_slot() else {
            return Err(self.advise(StyleMateError::NoModelSelected));
        };
        let entry = browse(slot, label);
        self.view.set_recommendation(RecommendationPanel::Guide {
            label: label.to_string(),
            entry,
        });
        Ok(entry)
    }

    /// One iteration of the classification loop.
    pub fn tick(&mut self) {
        if self.session.run_state() != RunState::Running
            || self.session.input_source() != InputSource::Webcam
        {
            trace!("tick ignored");
            return;
        }
        if self.in_flight.is_some() {
            trace!("classification in flight, tick dropped");
            return;
        }
        match self.webcam.current_frame() {
            Ok(frame) => self.classify_once(Arc::new(frame)),
            Err(e) => {
                // A camera that stops delivering frames has to be acquired again.
                self.stop_loop();
                self.webcam.release();
                self.session.transition(RunState::Error);
                self.advise(StyleMateError::FrameSourceAcquisitionFailure(e));
            }
        }
    }

    /// Applies an event. Returns false once the session should stop.
    pub fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Tick { generation } => {
                self.tick_pending.store(false, Ordering::Release);
                if generation == self.session.generation() {
                    self.tick();
                }
            }
            Event::ModelLoaded {
                slot,
                generation,
                result,
            } => self.on_model_loaded(slot, generation, result),
            Event::Classified { ticket, verdict } => self.on_classified(ticket, verdict),
            Event::User(command) => return self.apply(command),
            Event::Shutdown => return false,
        }
        true
    }

    pub fn apply(&mut self, command: UserCommand) -> bool {
        debug!(?command, "user command");
        match command {
            UserCommand::SelectSource(source) => self.select_input_source(source),
            UserCommand::SelectModel(slot) => {
                let _ = self.select_model_slot(slot);
            }
            UserCommand::Toggle => {
                let _ = self.start_or_resume();
            }
            UserCommand::Open(path) => {
                let _ = self.upload_image(&path);
            }
            UserCommand::Process => {
                let _ = self.process_upload();
            }
            UserCommand::Guide(label) => {
                let _ = self.browse_guide(&label);
            }
            UserCommand::Show => {}
            UserCommand::Quit => return false,
        }
        true
    }

    pub fn next_event(&self, timeout: Option<Duration>) -> Option<Event> {
        match timeout {
            Some(t) => self.events_rx.recv_timeout(t).ok(),
            None => self.events_rx.recv().ok(),
        }
    }

    /// Handles events until no load or classification is outstanding.
    /// Returns false if `timeout` elapsed between two events first.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        while self.is_busy() {
            match self.next_event(Some(timeout)) {
                Some(event) => {
                    if !self.handle(event) {
                        break;
                    }
                }
                None => return false,
            }
        }
        !self.is_busy()
    }

    /// Event loop for interactive use. `redraw` runs whenever the view
    /// changes or a `Show` command arrives.
    pub fn run(&mut self, mut redraw: impl FnMut(&Self)) {
        let mut seen = self.view.revision();
        while let Some(event) = self.next_event(None) {
            let show = matches!(event, Event::User(UserCommand::Show));
            if !self.handle(event) {
                break;
            }
            if show || self.view.revision() != seen {
                seen = self.view.revision();
                redraw(self);
            }
        }
    }

    fn pause(&mut self) {
        self.stop_loop();
        self.session.transition(RunState::Paused);
        self.session.bump_generation();
        self.rerun = false;
    }

    fn start_loop(&mut self) {
        self.stop_loop();
        if let Schedule::Interval(interval) = self.schedule {
            self.frame_loop = Some(LoopHandle::start(
                self.events_tx.clone(),
                interval,
                self.session.generation(),
                self.tick_pending.clone(),
            ));
        }
    }

    fn stop_loop(&mut self) {
        if let Some(mut handle) = self.frame_loop.take() {
            handle.cancel();
        }
        self.tick_pending.store(false, Ordering::Release);
    }

    fn detector_to_load(&self) -> Option<ModelLocator> {
        if self.detector.is_some() || !self.gates.needs_faces() {
            return None;
        }
        self.config.gating.face_detector.clone()
    }

    fn recommendation_placeholder(&self) -> RecommendationPanel {
        match self.session.active_slot().map(ModelSlot::behavior) {
            None => RecommendationPanel::Placeholder(SELECT_MODEL.into()),
            Some(SlotBehavior::Recommending(_)) => {
                RecommendationPanel::Placeholder(HAIRSTYLE_PROMPT.into())
            }
            Some(SlotBehavior::ReportOnly) => RecommendationPanel::Hidden,
        }
    }

    fn activate(&mut self, slot: ModelSlot) {
        self.session.activate(slot);
        self.session.transition(RunState::Idle);
        let placeholder = self.recommendation_placeholder();
        self.view.reset(WAITING, placeholder);
        info!(%slot, "model active");
        if let Some(frame) = self.available_frame() {
            self.classify_once(frame);
        }
    }

    fn available_frame(&mut self) -> Option<Arc<Frame>> {
        match self.session.input_source() {
            InputSource::Upload => self.upload.clone(),
            InputSource::Webcam if self.webcam.is_ready() => match self.webcam.current_frame() {
                Ok(frame) => Some(Arc::new(frame)),
                Err(e) => {
                    self.webcam.release();
                    self.advise(StyleMateError::FrameSourceAcquisitionFailure(e));
                    None
                }
            },
            InputSource::Webcam => None,
        }
    }

    /// Sends `frame` to the worker, or queues one re-run if a classification
    /// is already in flight.
    fn classify_once(&mut self, frame: Arc<Frame>) {
        if self.in_flight.is_some() {
            trace!("classification in flight, re-run queued");
            self.rerun = true;
            return;
        }
        let Some(slot) = self.session.active_slot() else {
            return;
        };
        let Some(classifier) = self.models.get(&slot).cloned() else {
            warn!(%slot, "active model has no loaded handle");
            return;
        };
        self.next_ticket += 1;
        let ticket = Ticket {
            id: self.next_ticket,
            generation: self.session.generation(),
            slot,
        };
        let job = Job::Classify {
            ticket,
            classifier,
            detector: self.detector.clone(),
            frame,
            gates: self.gates,
        };
        match self.worker.submit(job) {
            Ok(()) => self.in_flight = Some(ticket),
            Err(e) => {
                self.advise(e);
            }
        }
    }

    fn on_model_loaded(
        &mut self,
        slot: ModelSlot,
        generation: u64,
        result: Result<LoadedModel, StyleMateError>,
    ) {
        let current = self.pending_load == Some((slot, generation));
        match result {
            Ok(model) => {
                if self.detector.is_none() {
                    self.detector = model.detector;
                }
                self.models.entry(slot).or_insert(model.classifier);
                if current {
                    self.pending_load = None;
                    self.activate(slot);
                    if let Some(err) = model.detector_error {
                        self.advise(StyleMateError::DetectorLoadFailure(err));
                    }
                } else {
                    debug!(%slot, "abandoned load cached");
                }
            }
            Err(err) => {
                if current {
                    self.pending_load = None;
                    self.session.transition(RunState::Error);
                    self.advise(err);
                } else {
                    warn!(%slot, "abandoned load failed: {err}");
                }
            }
        }
    }

    fn on_classified(
        &mut self,
        ticket: Ticket,
        verdict: Result<Verdict, InferenceError>,
    ) {
        if self.in_flight.map(|t| t.id) == Some(ticket.id) {
            self.in_flight = None;
        }
        let current = ticket.generation == self.session.generation()
            && Some(ticket.slot) == self.session.active_slot();
        if current {
            self.render(ticket.slot, verdict);
        } else {
            debug!(id = ticket.id, "stale classification discarded");
        }
        if self.rerun && self.in_flight.is_none() {
            self.rerun = false;
            if let Some(frame) = self.available_frame() {
                self.classify_once(frame);
            }
        }
    }

    fn render(
        &mut self,
        slot: ModelSlot,
        verdict: Result<Verdict, InferenceError>,
    ) {
        match verdict {
            Err(e) => {
                self.advise(StyleMateError::InferenceFailure(e));
            }
            Ok(Verdict::Rejected(rejection)) => {
                let recommendation = match slot.behavior() {
                    SlotBehavior::Recommending(_) => RecommendationPanel::Suppressed(rejection),
                    SlotBehavior::ReportOnly => RecommendationPanel::Hidden,
                };
                self.view.set_labels(LabelPanel::Warning(rejection));
                self.view.set_recommendation(recommendation);
                self.view.clear_advisory();
                self.rendered += 1;
            }
            Ok(Verdict::Accepted(result)) => {
                let banner = self.gates.low_confidence(&result);
                let recommendation = match slot.behavior().recommendations() {
                    Some(table) => {
                        let label = result.top().label.clone();
                        let lookup = table.lookup(&label);
                        if !lookup.found {
                            debug!(%label, "no recommendation entry, using fallback");
                        }
                        RecommendationPanel::Entry { label, lookup }
                    }
                    None => RecommendationPanel::Hidden,
                };
                debug!(
                    %slot,
                    top = %result.top().label,
                    probability = result.top().probability,
                    low_confidence = banner.is_some(),
                    "classification rendered"
                );
                self.view
                    .set_labels(LabelPanel::Ranked(RankedList::new(slot, &result, banner)));
                self.view.set_recommendation(recommendation);
                self.view.clear_advisory();
                self.rendered += 1;
            }
        }
    }

    fn advise(&mut self, err: StyleMateError) -> StyleMateError {
        warn!("{err}");
        self.view.set_advisory(Advisory::from(&err));
        err
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop_loop();
        self.webcam.release();
    }
}
