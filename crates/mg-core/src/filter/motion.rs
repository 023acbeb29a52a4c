//! Motion tracking and the clock it reads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mg_common::Sample;
use mg_config::recognizer::DEFAULT_MOTION_CHANGE_TIME;

use super::Filter;

/// Monotonic millisecond clock.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Clock advanced by hand. Clones share the same time.
///
/// Replays drive this from recorded timestamps.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Tracks whether the device is moving. Never drops or alters data.
///
/// Every call first clears the motion flag if no sample has arrived for at
/// least `motion_change_time` ms, then marks motion for a present sample.
/// A dropped (`None`) input still runs the timeout check.
pub struct MotionDetectFilter {
    motion_change_time: u64,
    in_motion: bool,
    motion_stamp: u64,
    clock: Arc<dyn Clock>,
}

impl MotionDetectFilter {
    pub fn new(motion_change_time: u64, clock: Arc<dyn Clock>) -> Self {
        let motion_stamp = clock.now_millis();
        Self {
            motion_change_time,
            in_motion: false,
            motion_stamp,
            clock,
        }
    }

    /// Default window on the wall clock.
    pub fn with_system_clock() -> Self {
        Self::new(DEFAULT_MOTION_CHANGE_TIME, Arc::new(SystemClock::new()))
    }

    pub fn motion_change_time(&self) -> u64 {
        self.motion_change_time
    }

    pub fn set_motion_change_time(&mut self, millis: u64) {
        self.motion_change_time = millis;
    }

    pub fn is_in_motion(&self) -> bool {
        self.in_motion
    }

    fn check_timeout(&mut self) {
        let now = self.clock.now_millis();
        if self.in_motion && now.saturating_sub(self.motion_stamp) >= self.motion_change_time {
            self.in_motion = false;
            tracing::trace!(target: "capture.motion", idle_ms = now.saturating_sub(self.motion_stamp), "motion stopped");
        }
    }
}

impl std::fmt::Debug for MotionDetectFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionDetectFilter")
            .field("motion_change_time", &self.motion_change_time)
            .field("in_motion", &self.in_motion)
            .field("motion_stamp", &self.motion_stamp)
            .finish()
    }
}

impl Filter for MotionDetectFilter {
    fn name(&self) -> &'static str {
        "motion_detect"
    }

    fn filter(&mut self, sample: Option<Sample>) -> Option<Sample> {
        self.check_timeout();
        sample.and_then(|s| self.filter_sample(s))
    }

    fn filter_sample(&mut self, sample: Sample) -> Option<Sample> {
        self.motion_stamp = self.clock.now_millis();
        if !self.in_motion {
            self.in_motion = true;
            tracing::trace!(target: "capture.motion", "motion started");
        }
        Some(sample)
    }

    fn reset(&mut self) {
        self.motion_stamp = self.clock.now_millis();
        self.in_motion = false;
    }

    fn motion_status(&self) -> Option<bool> {
        Some(self.in_motion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_at(clock: &ManualClock) -> MotionDetectFilter {
        MotionDetectFilter::new(190, Arc::new(clock.clone()))
    }

    #[test]
    fn system_clock_default_window() {
        let f = MotionDetectFilter::with_system_clock();
        assert_eq!(f.motion_change_time(), DEFAULT_MOTION_CHANGE_TIME);
        assert!(!f.is_in_motion());
    }

    #[test]
    fn sample_starts_motion_and_passes_through() {
        let clock = ManualClock::new(1_000);
        let mut f = filter_at(&clock);
        assert!(!f.is_in_motion());
        let s = Sample::new(1.0, 2.0, 3.0);
        assert_eq!(f.filter(Some(s)), Some(s));
        assert!(f.is_in_motion());
    }

    #[test]
    fn motion_clears_after_window() {
        let clock = ManualClock::new(0);
        let mut f = filter_at(&clock);
        f.filter(Some(Sample::new(1.0, 0.0, 0.0)));

        clock.advance(189);
        assert_eq!(f.filter(None), None);
        assert!(f.is_in_motion());

        clock.advance(1);
        f.filter(None);
        assert!(!f.is_in_motion());
    }

    #[test]
    fn timeout_checked_before_new_sample() {
        let clock = ManualClock::new(0);
        let mut f = filter_at(&clock);
        f.filter(Some(Sample::new(1.0, 0.0, 0.0)));
        clock.advance(500);
        // The flag clears and is then set again by the incoming sample.
        f.filter(Some(Sample::new(1.0, 0.0, 0.0)));
        assert!(f.is_in_motion());
        assert_eq!(f.motion_status(), Some(true));
    }

    #[test]
    fn reset_keeps_window_and_clears_flag() {
        let clock = ManualClock::new(0);
        let mut f = filter_at(&clock);
        f.set_motion_change_time(50);
        f.filter(Some(Sample::new(1.0, 0.0, 0.0)));
        f.reset();
        assert!(!f.is_in_motion());
        assert_eq!(f.motion_change_time(), 50);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new(5);
        let b = a.clone();
        a.advance(10);
        assert_eq!(b.now_millis(), 15);
        b.set(3);
        assert_eq!(a.now_millis(), 3);
    }
}
