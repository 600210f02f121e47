use serde::{Deserialize, Serialize};

use crate::{Result, VisualiserError};

/// Number of timbre coefficients the analysis provider emits per segment.
pub const TIMBRE_LEN: usize = 12;

/// Span assigned to zero-duration events when testing whether they are
/// active, so an instantaneous marker is observable for at least one frame.
const MIN_EVENT_SPAN: f32 = 1e-3;

/// Number of events the cursor will walk forward before treating the move as
/// a seek and re-synchronising with a binary search instead.
const MAX_INCREMENTAL_STEPS: usize = 8;

/// Common view over the provider's timed analysis events.
pub trait Timed {
    fn start(&self) -> f32;
    fn duration(&self) -> f32;
}

macro_rules! impl_timed {
    ($ty:ty) => {
        impl Timed for $ty {
            fn start(&self) -> f32 {
                self.start
            }

            fn duration(&self) -> f32 {
                self.duration
            }
        }
    };
}

/// A beat or tatum marker. The provider models both as bare intervals with an
/// optional confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: f32,
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// A short slice of roughly constant sound. Timbre and loudness drive the
/// per-frame band signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f32,
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Twelve signed coefficients, empirically bounded to roughly
    /// [-100, 100]. Missing or short vectors are treated as zeros.
    #[serde(default)]
    pub timbre: Vec<f32>,
    #[serde(default)]
    pub loudness_start: Option<f32>,
    #[serde(default)]
    pub loudness_max: Option<f32>,
}

/// A coarse structural region of the track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub start: f32,
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub loudness: Option<f32>,
    #[serde(default)]
    pub tempo: Option<f32>,
}

impl_timed!(TimeInterval);
impl_timed!(Segment);
impl_timed!(Section);

/// Track-level scalar features from the analysis provider. All values have
/// documented defaults so a failed or partial fetch still yields a usable
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(default = "default_feature")]
    pub energy: f32,
    #[serde(default = "default_feature")]
    pub danceability: f32,
    #[serde(default = "default_feature")]
    pub valence: f32,
    #[serde(default = "default_tempo")]
    pub tempo: f32,
}

fn default_feature() -> f32 {
    0.5
}

fn default_tempo() -> f32 {
    120.0
}

impl Default for AudioFeatures {
    fn default() -> Self {
        Self {
            energy: default_feature(),
            danceability: default_feature(),
            valence: default_feature(),
            tempo: default_tempo(),
        }
    }
}

impl AudioFeatures {
    /// Parses a features payload. Missing fields take their defaults and
    /// unknown fields are ignored.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Everything the provider knows about one track's timeline. Replaced
/// wholesale when a new track begins playing; never partially updated, so a
/// consumer can never observe one track's beats mixed with another's tempo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackAnalysis {
    /// Supplied by the caller; the provider payload itself does not carry
    /// it.
    #[serde(default)]
    pub track_id: String,
    #[serde(default)]
    pub beats: Vec<TimeInterval>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub tatums: Vec<TimeInterval>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl TrackAnalysis {
    /// Parses an analysis payload as delivered by the provider. The payload
    /// itself does not carry the track id, so the caller supplies it.
    pub fn from_json(track_id: &str, payload: &str) -> Result<Self> {
        if track_id.trim().is_empty() {
            return Err(VisualiserError::InvalidInput("track id must not be empty"));
        }

        let mut analysis: TrackAnalysis = serde_json::from_str(payload)?;
        analysis.track_id = track_id.to_string();
        analysis.sort_events();
        Ok(analysis)
    }

    /// Restores the start-ascending ordering the index relies on. Well-formed
    /// payloads arrive sorted already; unsorted input is tolerated rather
    /// than rejected.
    pub fn sort_events(&mut self) {
        fn by_start<T: Timed>(events: &mut [T]) {
            events.sort_by(|a, b| a.start().total_cmp(&b.start()));
        }

        by_start(&mut self.beats);
        by_start(&mut self.segments);
        by_start(&mut self.tatums);
        by_start(&mut self.sections);
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
            && self.segments.is_empty()
            && self.tatums.is_empty()
            && self.sections.is_empty()
    }
}

/// Monotone lookup cursor over one event sequence.
///
/// In steady playback the queried position only creeps forward, so the
/// cursor advances incrementally in amortised O(1). Any discontinuous move,
/// a seek, a track change, or an authoritative correction, falls outside the
/// current event window and triggers a binary re-seek over the starts.
#[derive(Debug, Clone, Copy, Default)]
struct EventCursor {
    index: usize,
}

impl EventCursor {
    fn active<'a, T: Timed>(&mut self, events: &'a [T], position: f32) -> Option<&'a T> {
        if events.is_empty() || !position.is_finite() {
            return None;
        }

        self.index = self.index.min(events.len() - 1);
        if position < events[self.index].start() {
            self.reseek(events, position);
        } else {
            let mut steps = 0;
            while self.index + 1 < events.len() && events[self.index + 1].start() <= position {
                self.index += 1;
                steps += 1;
                if steps > MAX_INCREMENTAL_STEPS {
                    self.reseek(events, position);
                    break;
                }
            }
        }

        // Improperly overlapping input: prefer the first match in stored
        // order. One comparison in the well-formed case.
        while self.index > 0 && contains(&events[self.index - 1], position) {
            self.index -= 1;
        }

        let event = &events[self.index];
        contains(event, position).then_some(event)
    }

    /// Repositions onto the last event whose start is at or before
    /// `position`.
    fn reseek<T: Timed>(&mut self, events: &[T], position: f32) {
        let upper = events.partition_point(|e| e.start() <= position);
        self.index = upper.saturating_sub(1);
    }
}

fn contains<T: Timed>(event: &T, position: f32) -> bool {
    let span = event.duration().max(MIN_EVENT_SPAN);
    position >= event.start() && position < event.start() + span
}

fn fraction<T: Timed>(event: &T, position: f32) -> f32 {
    if event.duration() <= 0.0 {
        return 0.0;
    }
    ((position - event.start()) / event.duration()).clamp(0.0, 1.0)
}

/// Owns the loaded [`TrackAnalysis`] and answers "what is active at time T"
/// queries with one independent cursor per event kind.
#[derive(Debug, Clone)]
pub struct AnalysisIndex {
    analysis: TrackAnalysis,
    beats: EventCursor,
    segments: EventCursor,
    tatums: EventCursor,
    sections: EventCursor,
}

impl AnalysisIndex {
    /// Builds an index over the given analysis with all cursors at the
    /// start. Events are re-sorted defensively.
    pub fn new(mut analysis: TrackAnalysis) -> Self {
        analysis.sort_events();
        Self {
            analysis,
            beats: EventCursor::default(),
            segments: EventCursor::default(),
            tatums: EventCursor::default(),
            sections: EventCursor::default(),
        }
    }

    pub fn track_id(&self) -> &str {
        &self.analysis.track_id
    }

    pub fn analysis(&self) -> &TrackAnalysis {
        &self.analysis
    }

    pub fn active_beat(&mut self, position: f32) -> Option<&TimeInterval> {
        self.beats.active(&self.analysis.beats, position)
    }

    pub fn active_segment(&mut self, position: f32) -> Option<&Segment> {
        self.segments.active(&self.analysis.segments, position)
    }

    pub fn active_tatum(&mut self, position: f32) -> Option<&TimeInterval> {
        self.tatums.active(&self.analysis.tatums, position)
    }

    pub fn active_section(&mut self, position: f32) -> Option<&Section> {
        self.sections.active(&self.analysis.sections, position)
    }

    /// Interpolation fraction within the active beat, clamped to [0, 1].
    /// Zero when no beat is active or the beat has zero duration.
    pub fn beat_fraction(&mut self, position: f32) -> f32 {
        self.beats
            .active(&self.analysis.beats, position)
            .map_or(0.0, |e| fraction(e, position))
    }

    pub fn segment_fraction(&mut self, position: f32) -> f32 {
        self.segments
            .active(&self.analysis.segments, position)
            .map_or(0.0, |e| fraction(e, position))
    }

    pub fn tatum_fraction(&mut self, position: f32) -> f32 {
        self.tatums
            .active(&self.analysis.tatums, position)
            .map_or(0.0, |e| fraction(e, position))
    }

    pub fn section_fraction(&mut self, position: f32) -> f32 {
        self.sections
            .active(&self.analysis.sections, position)
            .map_or(0.0, |e| fraction(e, position))
    }
}
