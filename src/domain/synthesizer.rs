use super::detection::Detection;
use super::hazard::HazardEvent;
use super::model::HazardPolicy;
use super::tracker::RashSignal;

/// Builds the hazard events of one processed frame.
///
/// At most one pothole event is produced per frame, whatever the number of
/// pothole boxes, and it always comes before the rash driving events.
pub fn synthesize(
    frame_id: u64,
    detections: &[Detection],
    signals: &[RashSignal],
    policy: &HazardPolicy,
) -> Vec<HazardEvent> {
    let mut events = Vec::with_capacity(signals.len() + 1);

    if detections.iter().any(|d| d.class_id == policy.pothole_class) {
        events.push(HazardEvent::pothole(frame_id, policy.pothole_severity));
    }

    for signal in signals {
        events.push(HazardEvent::rash_driving(
            frame_id,
            signal.track_id,
            rash_severity(signal.movement),
        ));
    }

    events
}

/// Movement in pixels divided by ten, truncated.
pub fn rash_severity(movement: f32) -> u8 {
    (movement / 10.0).trunc().clamp(0.0, u8::MAX as f32) as u8
}
