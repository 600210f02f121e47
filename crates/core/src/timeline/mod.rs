use std::time::Instant;

/// Authoritative estimate of the playback position.
///
/// The clock reconciles three independently timed inputs into one
/// continuously consistent position: push state-change events and the poll
/// fallback both land in [`PlaybackClock::report_authoritative`], and the
/// per-frame [`PlaybackClock::tick`] extrapolates linearly in between. The
/// most recent authoritative report always wins and overwrites accumulated
/// extrapolation drift outright; downstream event lookup tolerates the small
/// jumps a correction produces.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    position_seconds: f32,
    paused: bool,
    last_report: Option<Instant>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    /// Creates a clock at position zero, paused. This is the state before any
    /// transport report has arrived; it is not an error.
    pub fn new() -> Self {
        Self {
            position_seconds: 0.0,
            paused: true,
            last_report: None,
        }
    }

    /// Accepts a position/play-state update from an authoritative source,
    /// either a push event or a poll result. Never fails.
    pub fn report_authoritative(&mut self, seconds: f32, is_playing: bool) {
        self.position_seconds = seconds.max(0.0);
        self.paused = !is_playing;
        self.last_report = Some(Instant::now());
    }

    /// Advances the position estimate by one animation frame. No-op while
    /// paused.
    pub fn tick(&mut self, delta_seconds: f32) {
        if !self.paused {
            self.position_seconds += delta_seconds.max(0.0);
        }
    }

    /// Freezes or resumes the clock without an accompanying position report.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn position_seconds(&self) -> f32 {
        self.position_seconds
    }

    pub fn is_playing(&self) -> bool {
        !self.paused
    }

    /// Wall-clock age of the last authoritative report, `None` before the
    /// first one. Only used for staleness diagnostics.
    pub fn seconds_since_report(&self) -> Option<f32> {
        self.last_report.map(|at| at.elapsed().as_secs_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_paused() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.position_seconds(), 0.0);
        assert!(!clock.is_playing());
        assert!(clock.seconds_since_report().is_none());
    }

    #[test]
    fn tick_is_a_no_op_while_paused() {
        let mut clock = PlaybackClock::new();
        clock.tick(1.0);
        clock.tick(2.5);
        assert_eq!(clock.position_seconds(), 0.0);
    }

    #[test]
    fn report_then_tick_extrapolates() {
        let mut clock = PlaybackClock::new();
        clock.report_authoritative(10.0, true);
        clock.tick(0.5);
        assert!((clock.position_seconds() - 10.5).abs() < 1e-6);
        assert!(clock.seconds_since_report().is_some());
    }

    #[test]
    fn position_is_sum_of_deltas_since_last_report() {
        let mut clock = PlaybackClock::new();
        clock.report_authoritative(3.0, true);

        let deltas = [0.016, 0.017, 0.016, 0.033, 0.016];
        let mut expected = 3.0;
        for delta in deltas {
            clock.tick(delta);
            expected += delta;
            assert!((clock.position_seconds() - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn report_overwrites_extrapolation_without_smoothing() {
        let mut clock = PlaybackClock::new();
        clock.report_authoritative(50.0, true);
        clock.tick(0.4);

        // A backward correction wins immediately.
        clock.report_authoritative(5.0, true);
        assert_eq!(clock.position_seconds(), 5.0);
    }

    #[test]
    fn pause_report_freezes_the_position() {
        let mut clock = PlaybackClock::new();
        clock.report_authoritative(12.0, true);
        clock.report_authoritative(12.5, false);
        clock.tick(1.0);
        assert_eq!(clock.position_seconds(), 12.5);
        assert!(!clock.is_playing());
    }

    #[test]
    fn set_paused_toggles_without_moving_position() {
        let mut clock = PlaybackClock::new();
        clock.report_authoritative(8.0, true);
        clock.set_paused(true);
        clock.tick(0.5);
        assert_eq!(clock.position_seconds(), 8.0);

        clock.set_paused(false);
        clock.tick(0.5);
        assert!((clock.position_seconds() - 8.5).abs() < 1e-6);
    }

    #[test]
    fn negative_inputs_are_clamped() {
        let mut clock = PlaybackClock::new();
        clock.report_authoritative(-4.0, true);
        assert_eq!(clock.position_seconds(), 0.0);
        clock.tick(-1.0);
        assert_eq!(clock.position_seconds(), 0.0);
    }
}
