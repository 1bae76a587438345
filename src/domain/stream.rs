use std::collections::BTreeMap;

use super::detection::Detection;
use super::hazard::{HazardEvent, HazardReport};

/// Message fanned out to every consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Encoded (JPEG) annotated frame, sent as a binary message.
    Frame(Vec<u8>),
    /// Serialized hazard, sent as a text message.
    Hazard(String),
    /// The producing pipeline has drained; consumers get a close frame.
    EndOfStream,
}

impl StreamMessage {
    pub fn event(ev: &HazardEvent) -> serde_json::Result<Self> {
        Ok(StreamMessage::Hazard(ev.to_json()?))
    }

    pub fn report(report: &HazardReport) -> serde_json::Result<Self> {
        Ok(StreamMessage::Hazard(serde_json::to_string(report)?))
    }
}

/// What a consumer sent us, classified at the receive boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Frame(Vec<u8>),
    Hazard(HazardReport),
    /// Text that is not a hazard object; dropped without error.
    Ignored,
    Close,
}

impl InboundMessage {
    pub fn from_text(text: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
            return InboundMessage::Ignored;
        };
        if value.get("type").is_none() {
            return InboundMessage::Ignored;
        }
        match serde_json::from_value::<HazardReport>(value) {
            Ok(report) => InboundMessage::Hazard(report),
            Err(_) => InboundMessage::Ignored,
        }
    }
}

/// Compact "count class" summary for log lines, e.g. `"2 cls2, 1 cls0"`.
pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.class_id).or_insert(0usize) += 1;
    }
    counts
        .iter()
        .map(|(class_id, count)| format!("{} cls{}", count, class_id))
        .collect::<Vec<_>>()
        .join(", ")
}
