use serde::{Deserialize, Serialize};

/// Identity of the track the transport reports as current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
}

impl TrackRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            artist: String::new(),
        }
    }
}

/// One authoritative position/play-state update.
///
/// Push state-change events and poll-fallback results share this shape on
/// purpose: both are authoritative, neither is privileged, and the engine
/// applies them last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateReport {
    pub is_playing: bool,
    pub position_ms: u64,
    pub track: Option<TrackRef>,
}

impl PlayerStateReport {
    pub fn position_seconds(&self) -> f32 {
        self.position_ms as f32 / 1000.0
    }
}

/// Poll-fallback interface onto the player transport. The owning loop calls
/// [`PlayerTransport::poll_state`] on a fixed cadence and forwards any report
/// to the engine; push events arrive through the same report type without
/// going through this trait.
pub trait PlayerTransport {
    /// Returns the transport's current state, or `None` when no player is
    /// available (a skipped poll, not an error).
    fn poll_state(&mut self) -> Option<PlayerStateReport>;
}
