mod common;

use common::*;
use proptest::prelude::*;
use stylemate::inference::{ClassificationResult, Prediction};
use stylemate::{Frame, InputSource, ModelSlot, RunState};

#[derive(Debug, Clone)]
enum Op {
    Source(InputSource),
    Model(ModelSlot),
    Toggle,
    Upload,
    Process,
    Tick,
    Settle,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop_oneof![Just(InputSource::Webcam), Just(InputSource::Upload)].prop_map(Op::Source),
        prop_oneof![Just(ModelSlot::FaceShape), Just(ModelSlot::PersonalTone)].prop_map(Op::Model),
        Just(Op::Toggle),
        Just(Op::Upload),
        Just(Op::Process),
        Just(Op::Tick),
        Just(Op::Settle),
    ]
}

fn raw_predictions() -> impl Strategy<Value = Vec<Prediction>> {
    prop::collection::vec(0.001f32..10.0, 1..8).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, p)| Prediction::new(format!("class{i}"), p))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn session_invariants_hold(ops in prop::collection::vec(op(), 1..24)) {
        let mut h = harness();
        for op in ops {
            match op {
                Op::Source(source) => {
                    let was = h.controller.session().input_source();
                    h.controller.select_input_source(source);
                    if was != source {
                        prop_assert_ne!(h.controller.session().run_state(), RunState::Running);
                    }
                }
                Op::Model(slot) => {
                    let _ = h.controller.select_model_slot(slot);
                }
                Op::Toggle => {
                    let _ = h.controller.start_or_resume();
                }
                Op::Upload => h.controller.upload_frame(Frame::blank(32, 32)),
                Op::Process => {
                    let _ = h.controller.process_upload();
                }
                Op::Tick => h.controller.tick(),
                Op::Settle => h.settle(),
            }
            let session = h.controller.session();
            if session.run_state() == RunState::Running {
                prop_assert!(session.active_slot().is_some());
            }
            if let Some(list) = h.controller.view().ranked() {
                let sum: f64 = list.rows.iter().map(|r| r.probability as f64).sum();
                prop_assert!((sum - 1.0).abs() < 1e-6);
                let expected = match list.model_name {
                    "Face Type Analysis" => 5,
                    _ => 2,
                };
                prop_assert_eq!(list.rows.len(), expected);
            }
        }
        h.settle();
        prop_assert!(!h.controller.is_busy());
    }

    #[test]
    fn results_are_normalised_and_sorted(raw in raw_predictions()) {
        let count = raw.len();
        let result = ClassificationResult::from_predictions(raw, count).unwrap();
        prop_assert_eq!(result.len(), count);
        let sum: f64 = result.predictions().iter().map(|p| p.probability as f64).sum();
        prop_assert!((sum - 1.0).abs() < 1e-6);
        for pair in result.predictions().windows(2) {
            prop_assert!(pair[0].probability >= pair[1].probability);
        }
        prop_assert_eq!(&result.predictions()[0], result.top());
    }

    #[test]
    fn class_count_mismatch_is_rejected(raw in raw_predictions(), extra in 1usize..4) {
        let count = raw.len() + extra;
        prop_assert!(ClassificationResult::from_predictions(raw, count).is_err());
    }
}

#[test]
fn negative_probability_is_rejected() {
    let raw = vec![Prediction::new("Warm", 0.5), Prediction::new("Cool", -0.1)];
    assert!(ClassificationResult::from_predictions(raw, 2).is_err());
}

#[test]
fn all_zero_probabilities_are_rejected() {
    let raw = vec![Prediction::new("Warm", 0.0), Prediction::new("Cool", 0.0)];
    assert!(ClassificationResult::from_predictions(raw, 2).is_err());
}
