//! Core library for the Groove Visualiser application.
//!
//! The crate owns the playback-state synchronisation and audio-feature
//! mapping engine: it reconciles push state-change events, the low-frequency
//! poll fallback and per-frame extrapolation into one coherent playback
//! position, indexes the provider's pre-computed timed analysis events, and
//! synthesises smooth per-frame visual signals from them. Rendering, UI and
//! network plumbing live in the application layer and talk to this crate
//! through the [`engine::VisualiserEngine`] control surface.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod synth;
pub mod timeline;
pub mod transport;

pub use analysis::{
    AnalysisIndex, AudioFeatures, Section, Segment, TimeInterval, Timed, TrackAnalysis,
};
pub use config::{AppConfig, SynthTuning, TransportConfig};
pub use engine::{SynthMode, VisualiserEngine};
pub use error::{Result, VisualiserError};
pub use events::{BeatPulse, SignalFrame, Subscribers, SubscriptionId};
pub use synth::FeatureSynthesizer;
pub use timeline::PlaybackClock;
pub use transport::{PlayerStateReport, PlayerTransport, TrackRef};
