use tracing::{debug, warn};

use crate::analysis::AnalysisIndex;
use crate::config::AppConfig;
use crate::events::{BeatPulse, SignalFrame, Subscribers, SubscriptionId};
use crate::synth::FeatureSynthesizer;
use crate::timeline::PlaybackClock;
use crate::transport::{PlayerStateReport, TrackRef};
use crate::{AudioFeatures, TrackAnalysis};

/// Which signal source the engine is currently running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthMode {
    /// Event-level analysis is loaded for the current track.
    Analysis,
    /// No analysis available; signals come from the synthetic generator.
    Synthetic,
}

/// Owns the clock, the analysis index and the feature synthesizer, and wires
/// authoritative transport reports through to per-frame signal output.
///
/// The engine is a plain owned value driven through `&mut self`; the single
/// owner replaces the original's single-threaded event loop as the
/// serialisation mechanism, so no locking is needed anywhere in the
/// per-frame path. A multi-threaded embedding should keep one engine inside
/// one task and feed it messages.
#[derive(Debug)]
pub struct VisualiserEngine {
    clock: PlaybackClock,
    synth: FeatureSynthesizer,
    index: Option<AnalysisIndex>,
    signal_subscribers: Subscribers<SignalFrame>,
    beat_subscribers: Subscribers<BeatPulse>,
    current_track: Option<TrackRef>,
    /// Track id the engine wants analysis for. A load for any other id is a
    /// superseded fetch and gets discarded.
    desired_track_id: Option<String>,
    last_frame: SignalFrame,
}

impl VisualiserEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            clock: PlaybackClock::new(),
            synth: FeatureSynthesizer::new(config.tuning),
            index: None,
            signal_subscribers: Subscribers::new(),
            beat_subscribers: Subscribers::new(),
            current_track: None,
            desired_track_id: None,
            last_frame: SignalFrame::default(),
        }
    }

    /// Applies one authoritative report, from either the push stream or the
    /// poll fallback; last write wins. Returns the track the report switched
    /// to, if any, so the owning loop can start fetching its analysis.
    pub fn handle_report(&mut self, report: &PlayerStateReport) -> Option<TrackRef> {
        self.clock
            .report_authoritative(report.position_seconds(), report.is_playing);

        let changed = match (&report.track, &self.current_track) {
            (Some(incoming), Some(current)) if incoming.id == current.id => None,
            (Some(incoming), _) => Some(incoming.clone()),
            (None, _) => None,
        };

        if let Some(track) = &changed {
            debug!(track_id = %track.id, "track changed, awaiting analysis");
            self.desired_track_id = Some(track.id.clone());
            self.current_track = Some(track.clone());
        }

        changed
    }

    /// Paused override without an accompanying position report.
    pub fn set_paused(&mut self, paused: bool) {
        self.clock.set_paused(paused);
    }

    /// Commits a fetched analysis and its features.
    ///
    /// The swap is atomic from the synthesizer's perspective: the index is
    /// rebuilt with fresh cursors before it becomes visible to the next
    /// tick. A result for a track that is no longer desired is a superseded
    /// fetch and is silently dropped; returns whether the load was
    /// committed.
    pub fn load_track(&mut self, analysis: TrackAnalysis, features: AudioFeatures) -> bool {
        match &self.desired_track_id {
            Some(want) if *want != analysis.track_id => {
                warn!(
                    fetched = %analysis.track_id,
                    desired = %want,
                    "discarding superseded analysis fetch"
                );
                return false;
            }
            _ => {}
        }

        debug!(
            track_id = %analysis.track_id,
            beats = analysis.beats.len(),
            segments = analysis.segments.len(),
            sections = analysis.sections.len(),
            "track analysis committed"
        );
        self.desired_track_id = Some(analysis.track_id.clone());
        self.index = Some(AnalysisIndex::new(analysis));
        self.synth.set_features(features);
        true
    }

    /// Fetch-failure fallback: keeps the visual alive in synthetic mode with
    /// the supplied features, or defaults when the features fetch failed
    /// too. Never an error; the worst case is a degraded visual.
    pub fn analysis_failed(&mut self, track_id: &str, features: Option<AudioFeatures>) {
        if self.desired_track_id.as_deref() != Some(track_id) {
            return;
        }

        warn!(%track_id, "analysis unavailable, falling back to synthetic signals");
        self.index = None;
        self.synth.set_features(features.unwrap_or_default());
    }

    /// Advances the clock and produces this frame's signal output,
    /// dispatching it to all subscribers.
    pub fn tick(&mut self, delta_seconds: f32) -> SignalFrame {
        self.clock.tick(delta_seconds);

        let (frame, pulse) = self.synth.on_tick(
            delta_seconds,
            !self.clock.is_playing(),
            self.clock.position_seconds(),
            self.index.as_mut(),
        );

        self.last_frame = frame;
        self.signal_subscribers.emit(&frame);
        if let Some(pulse) = pulse {
            self.beat_subscribers.emit(&pulse);
        }

        frame
    }

    pub fn subscribe_signal(
        &mut self,
        callback: impl FnMut(&SignalFrame) + 'static,
    ) -> SubscriptionId {
        self.signal_subscribers.subscribe(callback)
    }

    pub fn unsubscribe_signal(&mut self, id: SubscriptionId) -> bool {
        self.signal_subscribers.unsubscribe(id)
    }

    pub fn subscribe_beat(
        &mut self,
        callback: impl FnMut(&BeatPulse) + 'static,
    ) -> SubscriptionId {
        self.beat_subscribers.subscribe(callback)
    }

    pub fn unsubscribe_beat(&mut self, id: SubscriptionId) -> bool {
        self.beat_subscribers.unsubscribe(id)
    }

    pub fn mode(&self) -> SynthMode {
        if self.index.is_some() {
            SynthMode::Analysis
        } else {
            SynthMode::Synthetic
        }
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn position_seconds(&self) -> f32 {
        self.clock.position_seconds()
    }

    pub fn current_track(&self) -> Option<&TrackRef> {
        self.current_track.as_ref()
    }

    pub fn features(&self) -> &AudioFeatures {
        self.synth.features()
    }

    /// The most recent frame, for consumers that sample instead of
    /// subscribing.
    pub fn last_frame(&self) -> SignalFrame {
        self.last_frame
    }

    /// Wall-clock age of the last transport report, for staleness
    /// diagnostics.
    pub fn seconds_since_report(&self) -> Option<f32> {
        self.clock.seconds_since_report()
    }
}
