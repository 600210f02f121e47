use crate::analysis::AnalysisIndex;
use crate::config::SynthTuning;
use crate::events::{BeatPulse, SignalFrame};
use crate::AudioFeatures;

/// Maps sparse analysis events into smoothly varying per-frame signals.
///
/// Runs in one of two modes each tick: analysis-driven when an
/// [`AnalysisIndex`] is loaded, synthetic otherwise. The synthetic generator
/// derives all signals from accumulated animation time and the track-level
/// features, so the visual is never static even before analysis data arrives
/// or after a failed fetch.
#[derive(Debug)]
pub struct FeatureSynthesizer {
    tuning: SynthTuning,
    features: AudioFeatures,
    /// Elapsed animation time, accumulated from tick deltas. Drives the beat
    /// debounce and the synthetic generator; independent of track position.
    animation_time: f32,
    last_pulse_at: Option<f32>,
    /// Anchor of the most recent synthetic beat.
    synthetic_beat_at: f32,
    volume: f32,
    bass: f32,
    mid: f32,
    treble: f32,
    beat_detected: bool,
    beat_intensity: f32,
}

impl FeatureSynthesizer {
    pub fn new(tuning: SynthTuning) -> Self {
        Self {
            tuning,
            features: AudioFeatures::default(),
            animation_time: 0.0,
            last_pulse_at: None,
            synthetic_beat_at: 0.0,
            volume: 0.5,
            bass: 0.5,
            mid: 0.5,
            treble: 0.5,
            beat_detected: false,
            beat_intensity: 0.0,
        }
    }

    /// Replaces the track-level features. Called on track load and on the
    /// fetch-failure fallback path with defaults.
    pub fn set_features(&mut self, features: AudioFeatures) {
        self.features = features;
    }

    pub fn features(&self) -> &AudioFeatures {
        &self.features
    }

    /// Produces exactly one frame for this tick, plus a debounced beat pulse
    /// when a new beat fires.
    ///
    /// Called once per animation frame after the clock has been advanced;
    /// `position` is the clock's current estimate.
    pub fn on_tick(
        &mut self,
        delta_seconds: f32,
        paused: bool,
        position: f32,
        index: Option<&mut AnalysisIndex>,
    ) -> (SignalFrame, Option<BeatPulse>) {
        self.animation_time += delta_seconds.max(0.0);

        if paused {
            return (self.paused_frame(), None);
        }

        let pulse = match index {
            Some(index) => self.analysis_tick(position, index),
            None => self.synthetic_tick(),
        };

        (self.frame(), pulse)
    }

    /// Paused audio must visually read as at rest: every signal drops to a
    /// fixed low level and beat output is suppressed, regardless of mode.
    fn paused_frame(&mut self) -> SignalFrame {
        let level = self.tuning.paused_level;
        self.volume = level;
        self.bass = level;
        self.mid = level;
        self.treble = level;
        self.beat_detected = false;
        self.beat_intensity = 0.0;
        self.frame()
    }

    fn analysis_tick(&mut self, position: f32, index: &mut AnalysisIndex) -> Option<BeatPulse> {
        let tuning = &self.tuning;
        let mut pulse = None;

        match index.active_beat(position) {
            Some(beat) => {
                let confidence = beat.confidence.unwrap_or(tuning.default_beat_confidence);
                if self.debounce_elapsed() {
                    self.beat_detected = true;
                    self.beat_intensity = confidence;
                    self.last_pulse_at = Some(self.animation_time);
                    pulse = Some(BeatPulse {
                        time: self.animation_time,
                        intensity: confidence,
                        confidence,
                    });
                }
            }
            None => {
                self.beat_detected = false;
                self.beat_intensity = 0.0;
            }
        }

        if let Some(segment) = index.active_segment(position) {
            // The timbre vector is not literally frequency content, but its
            // leading coefficients track spectral brightness closely enough
            // to stand in for band energy.
            let coefficient = |i: usize| {
                let raw = segment.timbre.get(i).copied().unwrap_or(0.0);
                ((raw + tuning.timbre_offset) / tuning.timbre_scale).clamp(0.0, 1.0)
            };
            self.bass = (coefficient(0) + coefficient(1)) / 2.0;
            self.mid = (coefficient(2) + coefficient(3) + coefficient(4)) / 3.0;
            self.treble = (coefficient(5) + coefficient(6)) / 2.0;

            self.volume = match segment.loudness_max {
                Some(loudness) => {
                    ((loudness + tuning.loudness_floor_db) / tuning.loudness_floor_db)
                        .clamp(0.0, 1.0)
                }
                None => tuning.default_volume,
            };

            // Low-energy tracks should read as calmer even when a segment
            // momentarily spikes.
            let energy = self.features.energy;
            let band_scale = tuning.band_energy_base + energy * tuning.band_energy_span;
            self.volume *= tuning.volume_energy_base + energy * tuning.volume_energy_span;
            self.bass *= band_scale;
            self.mid *= band_scale;
            self.treble *= band_scale;
        }

        // Sections give a coarser, more stable loudness than segments and
        // damp segment-level jitter.
        if let Some(section) = index.active_section(position) {
            if let Some(loudness) = section.loudness {
                let section_volume = ((loudness + tuning.loudness_floor_db)
                    / tuning.loudness_floor_db)
                    .clamp(0.0, 1.0);
                let blend = tuning.section_blend;
                self.volume = self.volume * (1.0 - blend) + section_volume * blend;
            }
        }

        pulse
    }

    /// Pure function of animation time and track-level features: identical
    /// tick sequences always reproduce identical frames.
    fn synthetic_tick(&mut self) -> Option<BeatPulse> {
        let time = self.animation_time;
        let features = self.features;
        let beat_interval = 60.0 / features.tempo.max(1.0);
        let mut pulse = None;

        if time - self.synthetic_beat_at >= beat_interval && self.debounce_elapsed() {
            let intensity = 0.5 + features.energy * 0.5;
            self.beat_detected = true;
            self.beat_intensity = intensity;
            self.synthetic_beat_at = time;
            self.last_pulse_at = Some(time);
            pulse = Some(BeatPulse {
                time,
                intensity,
                confidence: intensity,
            });
        } else {
            self.beat_detected = false;
        }

        let energy_factor = features.energy * 0.8 + 0.2;
        let beat_progress = ((time - self.synthetic_beat_at) / beat_interval).min(1.0);

        self.volume = energy_factor * (0.6 + 0.4 * (1.0 - beat_progress));
        self.bass =
            energy_factor * (0.5 + 0.5 * (time * (1.0 + features.danceability)).sin().powi(2));
        self.mid = energy_factor * (0.3 + 0.7 * (time * 2.5 + 0.4).sin().powi(2));
        self.treble = energy_factor * (0.2 + 0.8 * (time * 4.2 + 0.8).sin().powi(2));

        pulse
    }

    fn debounce_elapsed(&self) -> bool {
        self.last_pulse_at
            .map_or(true, |at| self.animation_time - at >= self.tuning.beat_debounce_seconds)
    }

    fn frame(&self) -> SignalFrame {
        SignalFrame {
            volume: self.volume.clamp(0.0, 1.0),
            bass: self.bass.clamp(0.0, 1.0),
            mid: self.mid.clamp(0.0, 1.0),
            treble: self.treble.clamp(0.0, 1.0),
            beat_detected: self.beat_detected,
            beat_intensity: self.beat_intensity.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Section, Segment, TimeInterval, TrackAnalysis};

    fn synthesizer() -> FeatureSynthesizer {
        FeatureSynthesizer::new(SynthTuning::default())
    }

    fn analysis_with(
        beats: Vec<TimeInterval>,
        segments: Vec<Segment>,
        sections: Vec<Section>,
    ) -> AnalysisIndex {
        AnalysisIndex::new(TrackAnalysis {
            track_id: "track".to_string(),
            beats,
            segments,
            sections,
            ..Default::default()
        })
    }

    fn beat(start: f32, duration: f32, confidence: Option<f32>) -> TimeInterval {
        TimeInterval {
            start,
            duration,
            confidence,
        }
    }

    #[test]
    fn paused_override_forces_rest_levels() {
        let mut synth = synthesizer();
        let mut index = analysis_with(
            vec![beat(0.0, 1.0, Some(1.0))],
            vec![Segment {
                start: 0.0,
                duration: 10.0,
                loudness_max: Some(0.0),
                ..Default::default()
            }],
            vec![],
        );

        let (frame, pulse) = synth.on_tick(0.016, true, 0.5, Some(&mut index));
        assert_eq!(frame.volume, 0.1);
        assert_eq!(frame.bass, 0.1);
        assert_eq!(frame.mid, 0.1);
        assert_eq!(frame.treble, 0.1);
        assert!(!frame.beat_detected);
        assert_eq!(frame.beat_intensity, 0.0);
        assert!(pulse.is_none());
    }

    #[test]
    fn worked_loudness_example() {
        // Segment {start: 10, duration: 2, timbre: zeros, loudness_max: -30}
        // with energy = 1.0 at position 11.0 yields volume 0.5.
        let mut synth = synthesizer();
        synth.set_features(AudioFeatures {
            energy: 1.0,
            ..Default::default()
        });
        let mut index = analysis_with(
            vec![],
            vec![Segment {
                start: 10.0,
                duration: 2.0,
                timbre: vec![0.0; 12],
                loudness_max: Some(-30.0),
                ..Default::default()
            }],
            vec![],
        );

        let (frame, _) = synth.on_tick(0.016, false, 11.0, Some(&mut index));
        assert!((frame.volume - 0.5).abs() < 1e-5);
        // Zero timbre normalises to 0.5 per coefficient, scaled by energy.
        assert!((frame.bass - 0.5).abs() < 1e-5);
        assert!((frame.mid - 0.5).abs() < 1e-5);
        assert!((frame.treble - 0.5).abs() < 1e-5);
    }

    #[test]
    fn timbre_coefficients_map_to_bands() {
        let mut synth = synthesizer();
        synth.set_features(AudioFeatures {
            energy: 1.0,
            ..Default::default()
        });
        let mut timbre = vec![0.0; 12];
        timbre[0] = 100.0;
        timbre[1] = 100.0;
        timbre[5] = -100.0;
        timbre[6] = -100.0;
        let mut index = analysis_with(
            vec![],
            vec![Segment {
                start: 0.0,
                duration: 5.0,
                timbre,
                loudness_max: Some(-30.0),
                ..Default::default()
            }],
            vec![],
        );

        let (frame, _) = synth.on_tick(0.016, false, 1.0, Some(&mut index));
        assert!((frame.bass - 1.0).abs() < 1e-5);
        assert!((frame.mid - 0.5).abs() < 1e-5);
        assert!(frame.treble.abs() < 1e-5);
    }

    #[test]
    fn energy_scales_bands_down() {
        let mut synth = synthesizer();
        synth.set_features(AudioFeatures {
            energy: 0.0,
            ..Default::default()
        });
        let mut index = analysis_with(
            vec![],
            vec![Segment {
                start: 0.0,
                duration: 5.0,
                timbre: vec![0.0; 12],
                loudness_max: Some(0.0),
                ..Default::default()
            }],
            vec![],
        );

        let (frame, _) = synth.on_tick(0.016, false, 1.0, Some(&mut index));
        // volume = 1.0 * (0.5 + 0*0.5), bands = 0.5 * (0.4 + 0*0.6).
        assert!((frame.volume - 0.5).abs() < 1e-5);
        assert!((frame.bass - 0.2).abs() < 1e-5);
    }

    #[test]
    fn section_loudness_blends_into_volume() {
        let mut synth = synthesizer();
        synth.set_features(AudioFeatures {
            energy: 1.0,
            ..Default::default()
        });
        let mut index = analysis_with(
            vec![],
            vec![Segment {
                start: 0.0,
                duration: 10.0,
                timbre: vec![0.0; 12],
                loudness_max: Some(-30.0),
                ..Default::default()
            }],
            vec![Section {
                start: 0.0,
                duration: 10.0,
                loudness: Some(0.0),
                ..Default::default()
            }],
        );

        let (frame, _) = synth.on_tick(0.016, false, 1.0, Some(&mut index));
        // 0.5 * 0.7 + 1.0 * 0.3
        assert!((frame.volume - 0.65).abs() < 1e-5);
    }

    #[test]
    fn beat_pulses_are_debounced() {
        let mut synth = synthesizer();
        // Two beats 60 ms apart, then a third 300 ms in.
        let mut index = analysis_with(
            vec![
                beat(0.0, 0.04, Some(0.9)),
                beat(0.06, 0.02, Some(0.9)),
                beat(0.3, 0.05, Some(0.9)),
            ],
            vec![],
            vec![],
        );

        let mut pulses = 0;
        for step in 0..20 {
            let position = step as f32 * 0.02;
            let (_, pulse) = synth.on_tick(0.02, false, position, Some(&mut index));
            if pulse.is_some() {
                pulses += 1;
            }
        }

        // The 60 ms neighbour is swallowed, the later beat fires.
        assert_eq!(pulses, 2);
    }

    #[test]
    fn missing_confidence_defaults() {
        let mut synth = synthesizer();
        let mut index = analysis_with(vec![beat(0.0, 0.2, None)], vec![], vec![]);

        let (frame, pulse) = synth.on_tick(0.016, false, 0.1, Some(&mut index));
        assert!(frame.beat_detected);
        assert!((frame.beat_intensity - 0.8).abs() < 1e-5);
        let pulse = pulse.unwrap();
        assert!((pulse.intensity - 0.8).abs() < 1e-5);
        assert!((pulse.confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn no_active_beat_clears_detection() {
        let mut synth = synthesizer();
        let mut index = analysis_with(vec![beat(0.0, 0.1, Some(0.9))], vec![], vec![]);

        let (frame, _) = synth.on_tick(0.016, false, 0.05, Some(&mut index));
        assert!(frame.beat_detected);

        let (frame, _) = synth.on_tick(0.016, false, 0.5, Some(&mut index));
        assert!(!frame.beat_detected);
        assert_eq!(frame.beat_intensity, 0.0);
    }

    #[test]
    fn synthetic_mode_is_deterministic() {
        let features = AudioFeatures {
            energy: 0.7,
            danceability: 0.6,
            valence: 0.5,
            tempo: 100.0,
        };

        let run = || {
            let mut synth = synthesizer();
            synth.set_features(features);
            let mut frames = Vec::new();
            for _ in 0..120 {
                let (frame, _) = synth.on_tick(1.0 / 60.0, false, 0.0, None);
                frames.push(frame);
            }
            frames
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn synthetic_beats_follow_tempo() {
        let mut synth = synthesizer();
        synth.set_features(AudioFeatures {
            tempo: 120.0,
            ..Default::default()
        });

        // 120 BPM = one beat every 0.5 s; over 2 s that is four pulses. The
        // 1/64 s delta keeps the accumulated time exact in f32.
        let mut pulses = 0;
        for _ in 0..128 {
            let (_, pulse) = synth.on_tick(1.0 / 64.0, false, 0.0, None);
            if pulse.is_some() {
                pulses += 1;
            }
        }
        assert_eq!(pulses, 4);
    }

    #[test]
    fn synthetic_signals_stay_in_range() {
        let mut synth = synthesizer();
        synth.set_features(AudioFeatures {
            energy: 1.0,
            danceability: 1.0,
            valence: 1.0,
            tempo: 180.0,
        });

        for _ in 0..600 {
            let (frame, _) = synth.on_tick(1.0 / 60.0, false, 0.0, None);
            for value in [frame.volume, frame.bass, frame.mid, frame.treble] {
                assert!((0.0..=1.0).contains(&value));
            }
        }
    }
}
