//! Orchestrator behaviour with deterministic tracker and classifier fakes.
//!
//! The fakes replay scripted outputs and record what they were given, so each test can check
//! both the reduction result and the collaborator inputs.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;

use fall_sentinel::{
    BoundingBox, CentroidObservation, Detection, FallOrchestrator, FallenSet, IdentityTracker,
    KeypointIndex, PersonId, Point, PostureClassifier, SharedOrchestrator, TrackedPerson,
    TrackedPersons,
};

#[derive(Default)]
struct ScriptedTracker {
    script: VecDeque<TrackedPersons>,
    seen: Vec<Vec<CentroidObservation>>,
    fps_seen: Vec<f32>,
    fail: bool,
}

impl IdentityTracker for ScriptedTracker {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn update(
        &mut self,
        observations: &[CentroidObservation],
        fps: f32,
    ) -> Result<TrackedPersons> {
        if self.fail {
            return Err(anyhow!("tracker exploded"));
        }
        self.seen.push(observations.to_vec());
        self.fps_seen.push(fps);
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[derive(Default)]
struct ScriptedClassifier {
    script: VecDeque<FallenSet>,
    frames_seen: Vec<u64>,
    persons_seen: Vec<Vec<PersonId>>,
    fail_on_frame: Option<u64>,
}

impl PostureClassifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn update(
        &mut self,
        persons: &TrackedPersons,
        frame_count: u64,
        _fps: f32,
    ) -> Result<FallenSet> {
        if self.fail_on_frame == Some(frame_count) {
            return Err(anyhow!("classifier exploded"));
        }
        self.frames_seen.push(frame_count);
        self.persons_seen.push(persons.keys().copied().collect());
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

fn keypoints(left: [f32; 2], right: [f32; 2]) -> Vec<[f32; 2]> {
    let mut raw = vec![[0.0, 0.0]; KeypointIndex::COUNT];
    raw[KeypointIndex::LeftShoulder as usize] = left;
    raw[KeypointIndex::RightShoulder as usize] = right;
    raw
}

fn detection(left: [f32; 2], right: [f32; 2], bbox: [f32; 4]) -> Detection {
    Detection::new(BoundingBox::from(bbox), keypoints(left, right))
}

fn tracked(id: PersonId) -> TrackedPersons {
    let mut persons = TrackedPersons::new();
    persons.insert(
        id,
        TrackedPerson {
            centroid: Point::new(10.0, 20.0),
            bbox: BoundingBox::new(5.0, 5.0, 20.0, 40.0),
        },
    );
    persons
}

fn fallen(ids: &[PersonId]) -> FallenSet {
    ids.iter()
        .map(|&id| (id, BoundingBox::new(5.0, 5.0, 20.0, 40.0)))
        .collect()
}

#[test]
fn five_frame_fall_recover_fall_scenario() {
    let tracker = ScriptedTracker {
        script: (0..5).map(|_| tracked(1)).collect(),
        ..Default::default()
    };
    let classifier = ScriptedClassifier {
        script: VecDeque::from(vec![
            fallen(&[]),
            fallen(&[1]),
            fallen(&[1]),
            fallen(&[]),
            fallen(&[1]),
        ]),
        ..Default::default()
    };
    let mut orch = FallOrchestrator::new(tracker, classifier);
    let frame = vec![detection([10.0, 20.0], [0.0, 0.0], [5.0, 5.0, 20.0, 40.0])];

    let (count, set) = orch.process_detections(&frame, 30.0).unwrap();
    assert_eq!(count, 0);
    assert!(set.is_empty());
    assert_eq!(orch.tracker().seen[0][0].centroid, Point::new(10.0, 20.0));

    let (count, set) = orch.process_detections(&frame, 30.0).unwrap();
    assert_eq!(count, 1);
    assert_eq!(set, fallen(&[1]));

    let (count, set) = orch.process_detections(&frame, 30.0).unwrap();
    assert_eq!(count, 1);
    assert_eq!(set, fallen(&[1]));

    let (count, set) = orch.process_detections(&frame, 30.0).unwrap();
    assert_eq!(count, 1);
    assert!(set.is_empty());

    let (count, set) = orch.process_detections(&frame, 30.0).unwrap();
    assert_eq!(count, 2);
    assert_eq!(set.get(&1), Some(&BoundingBox::new(5.0, 5.0, 20.0, 40.0)));

    let events = orch.take_events();
    assert_eq!(events.len(), 2);
    assert_eq!((events[0].id, events[0].total, events[0].frame), (1, 1, 1));
    assert_eq!((events[1].id, events[1].total, events[1].frame), (1, 2, 4));
    assert!(orch.take_events().is_empty());
}

#[test]
fn observations_keep_input_order_and_skip_undetermined() {
    let mut orch =
        FallOrchestrator::new(ScriptedTracker::default(), ScriptedClassifier::default());
    let frame = vec![
        detection([30.0, 40.0], [50.0, 60.0], [1.0, 1.0, 10.0, 10.0]),
        detection([0.0, 0.0], [0.0, 0.0], [2.0, 2.0, 10.0, 10.0]),
        detection([0.0, 0.0], [7.0, 9.0], [3.0, 3.0, 10.0, 10.0]),
        detection([12.0, 0.0], [0.0, 0.0], [4.0, 4.0, 10.0, 10.0]),
    ];
    orch.process_detections(&frame, 12.0).unwrap();

    let seen = &orch.tracker().seen[0];
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].centroid, Point::new(40.0, 50.0));
    assert_eq!(seen[0].bbox, BoundingBox::new(1.0, 1.0, 10.0, 10.0));
    assert_eq!(seen[1].centroid, Point::new(7.0, 9.0));
    assert_eq!(seen[1].bbox, BoundingBox::new(3.0, 3.0, 10.0, 10.0));
    assert_eq!(orch.tracker().fps_seen, vec![12.0]);
}

#[test]
fn frame_count_advances_regardless_of_content() {
    let tracker = ScriptedTracker {
        script: VecDeque::from(vec![tracked(4), TrackedPersons::new(), tracked(4)]),
        ..Default::default()
    };
    let mut orch = FallOrchestrator::new(tracker, ScriptedClassifier::default());
    let empty: Vec<Detection> = Vec::new();
    let busy = vec![detection([10.0, 20.0], [14.0, 22.0], [0.0, 0.0, 5.0, 5.0])];

    for i in 0..7 {
        let frame = if i % 2 == 0 { &empty } else { &busy };
        let (count, _) = orch.process_detections(frame, 25.0).unwrap();
        assert_eq!(count, 0);
    }
    assert_eq!(orch.frame_count(), 7);
    assert_eq!(orch.classifier().frames_seen, vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(orch.classifier().persons_seen[0], vec![4]);
    assert!(orch.tracker().seen[0].is_empty());
}

#[test]
fn fall_count_never_decreases() {
    let classifier = ScriptedClassifier {
        script: VecDeque::from(vec![
            fallen(&[1, 2]),
            fallen(&[2]),
            fallen(&[]),
            fallen(&[3, 2]),
            fallen(&[3, 2]),
            fallen(&[1]),
        ]),
        ..Default::default()
    };
    let mut orch = FallOrchestrator::new(ScriptedTracker::default(), classifier);
    let empty: Vec<Detection> = Vec::new();

    let mut counts = Vec::new();
    for _ in 0..6 {
        counts.push(orch.process_detections(&empty, 25.0).unwrap().0);
    }
    assert_eq!(counts, vec![2, 2, 2, 4, 4, 5]);
    assert_eq!(orch.counter().previous_fallen(), &fallen(&[1]));
}

#[test]
fn collaborator_failures_propagate_and_leave_counters_alone() {
    let tracker = ScriptedTracker {
        fail: true,
        ..Default::default()
    };
    let mut orch = FallOrchestrator::new(tracker, ScriptedClassifier::default());
    let empty: Vec<Detection> = Vec::new();
    let err = orch.process_detections(&empty, 25.0).unwrap_err();
    assert_eq!(err.to_string(), "tracker exploded");
    assert_eq!(orch.frame_count(), 0);

    let classifier = ScriptedClassifier {
        script: VecDeque::from(vec![fallen(&[8])]),
        fail_on_frame: Some(1),
        ..Default::default()
    };
    let mut orch = FallOrchestrator::new(ScriptedTracker::default(), classifier);
    assert_eq!(orch.process_detections(&empty, 25.0).unwrap().0, 1);
    let err = orch.process_detections(&empty, 25.0).unwrap_err();
    assert_eq!(err.to_string(), "classifier exploded");
    assert_eq!(orch.frame_count(), 1);
    assert_eq!(orch.fall_count(), 1);
    assert_eq!(orch.counter().previous_fallen(), &fallen(&[8]));
}

#[test]
fn malformed_keypoints_fail_the_whole_frame() {
    let mut orch =
        FallOrchestrator::new(ScriptedTracker::default(), ScriptedClassifier::default());
    let frame = vec![
        detection([10.0, 20.0], [0.0, 0.0], [0.0, 0.0, 5.0, 5.0]),
        Detection::new(BoundingBox::new(0.0, 0.0, 5.0, 5.0), vec![[1.0, 1.0]; 3]),
    ];
    let err = orch.process_detections(&frame, 25.0).unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("detection 1"));
    assert!(msg.contains("malformed keypoints"));
    assert!(orch.tracker().seen.is_empty());
    assert_eq!(orch.frame_count(), 0);
}

#[test]
fn boxed_strategies_are_interchangeable() {
    let tracker: Box<dyn IdentityTracker> = Box::new(ScriptedTracker::default());
    let classifier: Box<dyn PostureClassifier> = Box::new(ScriptedClassifier {
        script: VecDeque::from(vec![fallen(&[5])]),
        ..Default::default()
    });
    let mut orch = FallOrchestrator::new(tracker, classifier);
    let empty: Vec<Detection> = Vec::new();
    assert_eq!(orch.process_detections(&empty, 25.0).unwrap().0, 1);
}

#[test]
fn shared_handle_serializes_frames_across_threads() {
    let orch: FallOrchestrator = FallOrchestrator::default();
    let shared = SharedOrchestrator::new(orch);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                let empty: Vec<Detection> = Vec::new();
                for _ in 0..10 {
                    shared.process_detections(&empty, 25.0).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(shared.frame_count().unwrap(), 40);
    assert_eq!(shared.fall_count().unwrap(), 0);
    assert!(shared.take_events().unwrap().is_empty());
}

#[test]
fn undrained_event_queue_keeps_only_the_newest() {
    let classifier = ScriptedClassifier {
        script: VecDeque::from(vec![
            fallen(&[1]),
            fallen(&[]),
            fallen(&[1]),
            fallen(&[]),
            fallen(&[1]),
        ]),
        ..Default::default()
    };
    let mut orch =
        FallOrchestrator::new(ScriptedTracker::default(), classifier).with_event_capacity(2);
    let empty: Vec<Detection> = Vec::new();
    for _ in 0..5 {
        orch.process_detections(&empty, 25.0).unwrap();
    }

    assert_eq!(orch.fall_count(), 3);
    let events = orch.take_events();
    assert_eq!(
        events.iter().map(|ev| (ev.total, ev.frame)).collect::<Vec<_>>(),
        vec![(2, 2), (3, 4)]
    );
}

#[test]
fn shoulder_axes_resolve_independently() {
    let mut orch =
        FallOrchestrator::new(ScriptedTracker::default(), ScriptedClassifier::default());
    let frame = vec![
        detection([10.0, 0.0], [0.0, 20.0], [1.0, 1.0, 10.0, 10.0]),
        detection([10.0, 0.0], [30.0, 20.0], [2.0, 2.0, 10.0, 10.0]),
    ];
    orch.process_detections(&frame, 25.0).unwrap();

    let seen = &orch.tracker().seen[0];
    assert_eq!(seen[0].centroid, Point::new(10.0, 20.0));
    assert_eq!(seen[1].centroid, Point::new(20.0, 20.0));
}
