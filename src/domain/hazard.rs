use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    Pothole,
    #[serde(rename = "Rash Driving")]
    RashDriving,
}

impl HazardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::Pothole => "Pothole",
            HazardKind::RashDriving => "Rash Driving",
        }
    }
}

/// A hazard derived from one processed frame. Serializes to the text message
/// sent to consumers, e.g. `{"type":"Rash Driving","severity":10,"frame_id":6,"track_id":4}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardEvent {
    #[serde(rename = "type")]
    pub kind: HazardKind,
    pub severity: u8,
    pub frame_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<i64>,
}

impl HazardEvent {
    pub fn pothole(frame_id: u64, severity: u8) -> Self {
        Self { kind: HazardKind::Pothole, severity, frame_id, track_id: None }
    }

    pub fn rash_driving(frame_id: u64, track_id: i64, severity: u8) -> Self {
        Self { kind: HazardKind::RashDriving, severity, frame_id, track_id: Some(track_id) }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Hazard text as accepted from any party on the channel. Only `type` and
/// `severity` are mandatory; the type string is not restricted to known kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardReport {
    #[serde(rename = "type")]
    pub hazard_type: String,
    pub severity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<i64>,
}

impl From<&HazardEvent> for HazardReport {
    fn from(ev: &HazardEvent) -> Self {
        Self {
            hazard_type: ev.kind.as_str().to_string(),
            severity: ev.severity as i64,
            frame_id: Some(ev.frame_id),
            track_id: ev.track_id,
        }
    }
}

/// Record handed to the hazard store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHazard {
    pub hazard_type: String,
    pub location_data: String,
    pub severity: i64,
}

impl From<HazardReport> for NewHazard {
    fn from(r: HazardReport) -> Self {
        let location_data = match r.frame_id {
            Some(id) => format!("Frame {id}"),
            None => "Frame N/A".to_string(),
        };
        Self { hazard_type: r.hazard_type, location_data, severity: r.severity }
    }
}

/// Durable hazard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedHazard {
    pub id: i64,
    pub hazard_type: String,
    /// Creation time, seconds since the unix epoch.
    pub timestamp: i64,
    pub location_data: String,
    pub severity: i64,
}
