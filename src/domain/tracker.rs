//! Frame-over-frame motion tracking for vehicle tracks.
//!
//! The tracker keeps the last known box center of every vehicle track seen in
//! the previous processed frame and flags tracks whose horizontal displacement
//! exceeds the policy threshold. Tracks that miss a single frame lose their
//! baseline.

use std::collections::{HashMap, HashSet};

use super::detection::Detection;
use super::model::HazardPolicy;

/// Last known center per live track id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackState {
    centers: HashMap<i64, (f32, f32)>,
}

impl TrackState {
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn contains(&self, track_id: i64) -> bool {
        self.centers.contains_key(&track_id)
    }

    pub fn last_center(&self, track_id: i64) -> Option<(f32, f32)> {
        self.centers.get(&track_id).copied()
    }
}

/// A vehicle whose center moved further than the threshold since the last
/// processed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RashSignal {
    pub track_id: i64,
    pub movement: f32,
}

#[derive(Debug, Clone)]
pub struct MotionTracker {
    policy: HazardPolicy,
    state: TrackState,
}

impl MotionTracker {
    pub fn new(policy: &HazardPolicy) -> Self {
        Self {
            policy: policy.clone(),
            state: TrackState::default(),
        }
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    /// Feed one processed frame's detections; returns the tracks flagged in
    /// this frame in detection order.
    ///
    /// This is a level detector: a track that keeps moving fast is flagged on
    /// every processed frame.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<RashSignal> {
        let mut signals = Vec::new();
        let mut seen = HashSet::new();

        for det in detections {
            if !self.policy.is_vehicle(det.class_id) {
                continue;
            }
            let center = det.center();
            seen.insert(det.track_id);

            if let Some((last_x, _)) = self.state.centers.get(&det.track_id) {
                // vertical motion ignored
                let movement = (center.0 - last_x).abs();
                if movement > self.policy.movement_threshold {
                    signals.push(RashSignal { track_id: det.track_id, movement });
                }
            }
            self.state.centers.insert(det.track_id, center);
        }

        self.state.centers.retain(|id, _| seen.contains(id));
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR: u32 = 2;
    const PERSON: u32 = 0;
    const DOG: u32 = 16;

    fn car_at(track_id: i64, center_x: f32) -> Detection {
        Detection::new(center_x - 20.0, 100.0, center_x + 20.0, 140.0, track_id, CAR)
    }

    fn tracker() -> MotionTracker {
        MotionTracker::new(&HazardPolicy::default())
    }

    #[test]
    fn non_vehicle_detections_produce_no_signals_or_state() {
        let mut t = tracker();
        let frame = vec![
            Detection::new(0.0, 0.0, 10.0, 10.0, 1, PERSON),
            Detection::new(500.0, 0.0, 510.0, 10.0, 2, DOG),
        ];
        assert!(t.update(&frame).is_empty());
        assert_eq!(t.state().len(), 0);
        assert!(t.update(&frame).is_empty());
        assert_eq!(t.state().len(), 0);
    }

    #[test]
    fn vehicle_membership_follows_the_policy() {
        let policy = HazardPolicy { vehicle_classes: vec![DOG], ..HazardPolicy::default() };
        let mut t = MotionTracker::new(&policy);
        let dog_at = |x: f32| Detection::new(x - 5.0, 0.0, x + 5.0, 10.0, 4, DOG);

        t.update(&[dog_at(100.0), car_at(7, 100.0)]);
        let signals = t.update(&[dog_at(300.0), car_at(7, 300.0)]);

        assert_eq!(signals, vec![RashSignal { track_id: 4, movement: 200.0 }]);
        assert!(!t.state().contains(7));
        assert_eq!(policy.is_vehicle(DOG), t.state().contains(4));
    }

    #[test]
    fn large_horizontal_jump_is_flagged() {
        let mut t = tracker();
        assert!(t.update(&[car_at(7, 100.0)]).is_empty());
        let signals = t.update(&[car_at(7, 200.0)]);
        assert_eq!(signals, vec![RashSignal { track_id: 7, movement: 100.0 }]);
    }

    #[test]
    fn small_jump_is_not_flagged() {
        let mut t = tracker();
        t.update(&[car_at(7, 100.0)]);
        assert!(t.update(&[car_at(7, 120.0)]).is_empty());
        assert_eq!(t.state().last_center(7), Some((120.0, 120.0)));
    }

    #[test]
    fn movement_exactly_at_threshold_is_not_flagged() {
        let mut t = tracker();
        t.update(&[car_at(1, 100.0)]);
        assert!(t.update(&[car_at(1, 150.0)]).is_empty());
    }

    #[test]
    fn vertical_motion_is_ignored() {
        let mut t = tracker();
        t.update(&[Detection::new(80.0, 0.0, 120.0, 40.0, 3, CAR)]);
        let signals = t.update(&[Detection::new(80.0, 400.0, 120.0, 440.0, 3, CAR)]);
        assert!(signals.is_empty());
    }

    #[test]
    fn movement_is_frame_over_frame_not_cumulative() {
        let mut t = tracker();
        t.update(&[car_at(1, 100.0)]);
        assert!(t.update(&[car_at(1, 140.0)]).is_empty());
        assert!(t.update(&[car_at(1, 180.0)]).is_empty());
    }

    #[test]
    fn fast_track_refires_every_frame() {
        let mut t = tracker();
        t.update(&[car_at(1, 0.0)]);
        assert_eq!(t.update(&[car_at(1, 100.0)]).len(), 1);
        assert_eq!(t.update(&[car_at(1, 200.0)]).len(), 1);
        assert_eq!(t.update(&[car_at(1, 300.0)]).len(), 1);
    }

    #[test]
    fn absent_track_is_dropped_and_loses_baseline() {
        let mut t = tracker();
        for x in [100.0, 110.0, 120.0] {
            t.update(&[car_at(1, x), car_at(2, 500.0)]);
        }
        assert!(t.state().contains(1));

        t.update(&[car_at(2, 500.0)]);
        assert!(!t.state().contains(1));
        assert!(t.state().contains(2));

        // reappearing far away starts a fresh baseline
        assert!(t.update(&[car_at(1, 900.0), car_at(2, 500.0)]).is_empty());
    }

    #[test]
    fn frame_without_vehicles_clears_live_tracks() {
        let mut t = tracker();
        t.update(&[car_at(1, 100.0), car_at(2, 300.0)]);
        assert_eq!(t.state().len(), 2);
        t.update(&[Detection::new(0.0, 0.0, 10.0, 10.0, 9, PERSON)]);
        assert!(t.state().is_empty());
    }

    #[test]
    fn signals_follow_detection_order() {
        let mut t = tracker();
        t.update(&[car_at(5, 0.0), car_at(3, 0.0)]);
        let signals = t.update(&[car_at(5, 300.0), car_at(3, 100.0)]);
        let ids: Vec<i64> = signals.iter().map(|s| s.track_id).collect();
        assert_eq!(ids, vec![5, 3]);
    }
}
