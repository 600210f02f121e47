use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-tick signal output delivered to the rendering layer. Ephemeral:
/// recomputed every tick, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub volume: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub beat_detected: bool,
    pub beat_intensity: f32,
}

impl Default for SignalFrame {
    fn default() -> Self {
        Self {
            volume: 0.5,
            bass: 0.5,
            mid: 0.5,
            treble: 0.5,
            beat_detected: false,
            beat_intensity: 0.0,
        }
    }
}

/// Discrete, debounced beat notification, delivered at most once per
/// debounce window alongside the continuous signal stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatPulse {
    /// Animation time at which the pulse was emitted, in seconds.
    pub time: f32,
    pub intensity: f32,
    pub confidence: f32,
}

/// Handle returned by [`Subscribers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Typed subscription registry. Each engine instance owns its registries, so
/// isolated instances never share subscribers through ambient state.
pub struct Subscribers<T> {
    entries: Vec<(SubscriptionId, Box<dyn FnMut(&T)>)>,
    next_id: u64,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscriber. Idempotent: returns `false` when the id is
    /// unknown or already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Dispatches `value` to every subscriber in subscription order.
    pub fn emit(&mut self, value: &T) {
        for (_, callback) in &mut self.entries {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.entries.len())
            .finish()
    }
}
