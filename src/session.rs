use crate::recommendation::{RecommendationTable, FACE_SHAPE_TABLE};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Where the classifier gets its frames from.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    #[default]
    Webcam,
    Upload,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Webcam => f.write_str("webcam"),
            InputSource::Upload => f.write_str("upload"),
        }
    }
}

/// One of the two configured classifiers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelSlot {
    #[value(alias = "1")]
    FaceShape,
    #[value(alias = "2")]
    PersonalTone,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 2] = [ModelSlot::FaceShape, ModelSlot::PersonalTone];

    pub fn index(self) -> usize {
        match self {
            ModelSlot::FaceShape => 1,
            ModelSlot::PersonalTone => 2,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelSlot::FaceShape => "Face Type Analysis",
            ModelSlot::PersonalTone => "Personal Tone Analysis",
        }
    }

    pub fn behavior(self) -> SlotBehavior {
        match self {
            ModelSlot::FaceShape => SlotBehavior::Recommending(&FACE_SHAPE_TABLE),
            ModelSlot::PersonalTone => SlotBehavior::ReportOnly,
        }
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What a slot does with a classification once the ranked list is shown.
#[derive(Debug, Clone, Copy)]
pub enum SlotBehavior {
    /// Look the winning label up in the table and render the entry.
    Recommending(&'static RecommendationTable),
    /// Ranked list only.
    ReportOnly,
}

impl SlotBehavior {
    pub fn recommendations(self) -> Option<&'static RecommendationTable> {
        match self {
            SlotBehavior::Recommending(table) => Some(table),
            SlotBehavior::ReportOnly => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Loading,
    Running,
    Paused,
    Error,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (_, Error) => true,
            (Idle, Loading) | (Idle, Running) => true,
            (Loading, Idle) => true,
            (Running, Paused) => true,
            (Paused, Running) | (Paused, Loading) => true,
            (Error, Loading) | (Error, Idle) | (Error, Running) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Loading => "loading",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Session state owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    input_source: InputSource,
    active_slot: Option<ModelSlot>,
    run_state: RunState,
    generation: u64,
}

impl Session {
    pub fn new(input_source: InputSource) -> Self {
        Self {
            input_source,
            active_slot: None,
            run_state: RunState::Idle,
            generation: 0,
        }
    }

    pub fn input_source(&self) -> InputSource {
        self.input_source
    }

    pub fn active_slot(&self) -> Option<ModelSlot> {
        self.active_slot
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Epoch counter; results dispatched under an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_input_source(&mut self, source: InputSource) {
        self.input_source = source;
    }

    pub(crate) fn activate(&mut self, slot: ModelSlot) {
        self.active_slot = Some(slot);
    }

    pub(crate) fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Applies `next` if the run-state machine allows it. Returns whether the
    /// state changed.
    pub(crate) fn transition(&mut self, next: RunState) -> bool {
        if self.run_state == next {
            return false;
        }
        if !self.run_state.can_transition_to(next) {
            warn!(from = %self.run_state, to = %next, "illegal run state transition");
            return false;
        }
        debug!(from = %self.run_state, to = %next, "run state transition");
        self.run_state = next;
        true
    }
}
