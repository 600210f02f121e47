use serde::{Deserialize, Serialize};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub tuning: SynthTuning,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Configuration for the transport polling fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Cadence at which the owning loop polls the transport for a
    /// correctness backstop between push events.
    pub poll_interval_seconds: f32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 5.0,
        }
    }
}

/// Empirically tuned constants for the feature synthesizer.
///
/// These values come from the analysis provider's typical value ranges and
/// are perceptual tuning, not derived quantities; they are kept configurable
/// rather than re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthTuning {
    /// Minimum spacing between beat pulses, in seconds.
    pub beat_debounce_seconds: f32,
    /// Intensity assigned to a beat whose confidence is absent.
    pub default_beat_confidence: f32,
    /// Offset added to raw timbre coefficients before scaling. The
    /// provider's coefficients are roughly bounded to [-100, 100].
    pub timbre_offset: f32,
    /// Divisor mapping offset timbre coefficients into [0, 1].
    pub timbre_scale: f32,
    /// Loudness below `-loudness_floor_db` dBFS is treated as silence.
    pub loudness_floor_db: f32,
    /// Volume used when a segment carries no loudness.
    pub default_volume: f32,
    /// Volume scales by `base + energy * span`.
    pub volume_energy_base: f32,
    pub volume_energy_span: f32,
    /// Band signals scale by `base + energy * span`.
    pub band_energy_base: f32,
    pub band_energy_span: f32,
    /// Weight of section loudness when blending into segment volume.
    pub section_blend: f32,
    /// Level all signals rest at while playback is paused.
    pub paused_level: f32,
}

impl Default for SynthTuning {
    fn default() -> Self {
        Self {
            beat_debounce_seconds: 0.1,
            default_beat_confidence: 0.8,
            timbre_offset: 100.0,
            timbre_scale: 200.0,
            loudness_floor_db: 60.0,
            default_volume: 0.5,
            volume_energy_base: 0.5,
            volume_energy_span: 0.5,
            band_energy_base: 0.4,
            band_energy_span: 0.6,
            section_blend: 0.3,
            paused_level: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = AppConfig::default();
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: AppConfig = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.transport.poll_interval_seconds, 5.0);
        assert_eq!(decoded.tuning.beat_debounce_seconds, 0.1);
        assert_eq!(decoded.tuning.paused_level, 0.1);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let decoded: AppConfig = serde_json::from_str(r#"{"transport": {"poll_interval_seconds": 2.0}}"#).unwrap();
        assert_eq!(decoded.transport.poll_interval_seconds, 2.0);
        assert_eq!(decoded.tuning.default_beat_confidence, 0.8);
    }
}
