//! Rendered state of the output panels, independent of any markup.

use crate::error::StyleMateError;
use crate::gate::{LowConfidence, Rejection};
use crate::inference::{ClassificationResult, Prediction};
use crate::recommendation::{GuideEntry, Lookup, RecommendationEntry};
use crate::session::ModelSlot;
use std::fmt;

pub const WAITING: &str = "Waiting for analysis...";
pub const SELECT_MODEL: &str = "Select a model to begin the analysis or selection.";
pub const IMAGE_UPLOADED: &str = "Image uploaded. Process the image to analyze.";

#[derive(Debug, Clone, PartialEq)]
pub struct RankedList {
    pub model_name: &'static str,
    pub low_confidence: Option<LowConfidence>,
    pub rows: Vec<Prediction>,
}

impl RankedList {
    pub fn new(
        slot: ModelSlot,
        result: &ClassificationResult,
        low_confidence: Option<LowConfidence>,
    ) -> Self {
        Self {
            model_name: slot.display_name(),
            low_confidence,
            rows: result.predictions().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelPanel {
    Placeholder(String),
    Ranked(RankedList),
    Warning(Rejection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationPanel {
    Placeholder(String),
    /// Recommendation for the winning label of a classification.
    Entry {
        label: String,
        lookup: Lookup<RecommendationEntry>,
    },
    /// Guide entry picked by hand.
    Guide { label: String, entry: GuideEntry },
    Suppressed(Rejection),
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryKind {
    ModelLoadFailure,
    DetectorLoadFailure,
    FrameSourceAcquisitionFailure,
    NoModelSelected,
    NoFrameAvailable,
    UploadDecodeFailure,
    InferenceFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

impl From<&StyleMateError> for Advisory {
    fn from(err: &StyleMateError) -> Self {
        let kind = match err {
            StyleMateError::ModelLoadFailure { .. } => AdvisoryKind::ModelLoadFailure,
            StyleMateError::DetectorLoadFailure(_) => AdvisoryKind::DetectorLoadFailure,
            StyleMateError::FrameSourceAcquisitionFailure(_) => {
                AdvisoryKind::FrameSourceAcquisitionFailure
            }
            StyleMateError::NoModelSelected => AdvisoryKind::NoModelSelected,
            StyleMateError::NoFrameAvailable => AdvisoryKind::NoFrameAvailable,
            StyleMateError::UploadDecodeFailure { .. } => AdvisoryKind::UploadDecodeFailure,
            StyleMateError::InferenceFailure(_) | StyleMateError::WorkerUnavailable => {
                AdvisoryKind::InferenceFailure
            }
        };
        let message = match err {
            StyleMateError::NoModelSelected => "Select a model first.".to_string(),
            StyleMateError::NoFrameAvailable => "Upload an image first.".to_string(),
            other => other.to_string(),
        };
        Self { kind, message }
    }
}

/// Every mutation bumps `revision` so callers can tell when to redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    labels: LabelPanel,
    recommendation: RecommendationPanel,
    advisory: Option<Advisory>,
    revision: u64,
}

impl Default for View {
    fn default() -> Self {
        Self {
            labels: LabelPanel::Placeholder(WAITING.into()),
            recommendation: RecommendationPanel::Placeholder(SELECT_MODEL.into()),
            advisory: None,
            revision: 0,
        }
    }
}

impl View {
    pub fn labels(&self) -> &LabelPanel {
        &self.labels
    }

    pub fn recommendation(&self) -> &RecommendationPanel {
        &self.recommendation
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn ranked(&self) -> Option<&RankedList> {
        match &self.labels {
            LabelPanel::Ranked(list) => Some(list),
            _ => None,
        }
    }

    pub(crate) fn set_labels(&mut self, labels: LabelPanel) {
        self.labels = labels;
        self.revision += 1;
    }

    pub(crate) fn set_recommendation(&mut self, panel: RecommendationPanel) {
        self.recommendation = panel;
        self.revision += 1;
    }

    pub(crate) fn set_advisory(&mut self, advisory: Advisory) {
        self.advisory = Some(advisory);
        self.revision += 1;
    }

    pub(crate) fn clear_advisory(&mut self) {
        if self.advisory.take().is_some() {
            self.revision += 1;
        }
    }

    pub(crate) fn reset(&mut self, labels: &str, recommendation: RecommendationPanel) {
        self.set_labels(LabelPanel::Placeholder(labels.into()));
        self.set_recommendation(recommendation);
        self.clear_advisory();
    }
}

fn write_hairstyle(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    lookup: &Lookup<RecommendationEntry>,
) -> fmt::Result {
    let entry = lookup.entry;
    if lookup.found {
        writeln!(f, "Hairstyle guide for {label} face shape")?;
    } else {
        writeln!(f, "No recommendation data found for {label}")?;
    }
    writeln!(f, "  {}", entry.summary)?;
    writeln!(f, "  Short hair: {}", entry.short_style)?;
    write!(f, "  Long hair: {}", entry.long_style)?;
    for image in entry.images {
        write!(f, "\n  [{image}]")?;
    }
    Ok(())
}

impl fmt::Display for LabelPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelPanel::Placeholder(text) => f.write_str(text),
            LabelPanel::Warning(rejection) => write!(f, "Warning: {rejection}"),
            LabelPanel::Ranked(list) => {
                write!(f, "{} results:", list.model_name)?;
                if let Some(banner) = &list.low_confidence {
                    write!(f, "\n  ! {banner}")?;
                }
                for row in &list.rows {
                    write!(f, "\n  {}: {:.1}%", row.label, row.probability * 100.0)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RecommendationPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationPanel::Placeholder(text) => f.write_str(text),
            RecommendationPanel::Hidden => Ok(()),
            RecommendationPanel::Suppressed(rejection) => match rejection {
                Rejection::NoFace => f.write_str("Face recognition failed: no clear face detected."),
                Rejection::FaceTooSmall { .. } => {
                    f.write_str("Face recognition failed: the face is too small.")
                }
            },
            RecommendationPanel::Entry { label, lookup } => write_hairstyle(f, label, lookup),
            RecommendationPanel::Guide { label, entry } => match entry {
                GuideEntry::Hairstyle(lookup) => write_hairstyle(f, label, lookup),
                GuideEntry::Palette(lookup) => {
                    let tone = lookup.entry;
                    if lookup.found {
                        writeln!(f, "Personal colour guide for {label} tone")?;
                    } else {
                        writeln!(f, "No palette data found for {label}")?;
                    }
                    writeln!(f, "  {}", tone.summary)?;
                    writeln!(f, "  Hair colours: {}", tone.hair)?;
                    writeln!(f, "  Clothing colours: {}", tone.clothing)?;
                    write!(f, "  Makeup colours: {}", tone.makeup)?;
                    if !tone.image.is_empty() {
                        write!(f, "\n  [{}]", tone.image)?;
                    }
                    Ok(())
                }
            },
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(advisory) = &self.advisory {
            writeln!(f, "! {}", advisory.message)?;
        }
        write!(f, "{}", self.labels)?;
        if !matches!(self.recommendation, RecommendationPanel::Hidden) {
            write!(f, "\n\n{}", self.recommendation)?;
        }
        Ok(())
    }
}
