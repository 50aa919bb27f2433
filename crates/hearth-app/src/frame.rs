//! Frame timing and FPS statistics.

use std::thread;
use std::time::{Duration, Instant};

/// Timing for the frame being produced.
#[derive(Debug, Clone, Copy)]
pub struct FrameTime {
    /// Delta time since last frame in seconds.
    pub dt: f32,
    /// Seconds since the timer started.
    pub elapsed: f32,
    /// Current frame number.
    pub frame_number: u64,
}

/// Min/max/average FPS over a run.
#[derive(Debug, Clone, Copy)]
pub struct FpsStats {
    min: f64,
    max: f64,
    sum: f64,
    samples: u64,
}

impl Default for FpsStats {
    fn default() -> Self {
        Self {
            min: f64::MAX,
            max: 0.0,
            sum: 0.0,
            samples: 0,
        }
    }
}

impl FpsStats {
    /// Record one frame that took `dt` seconds. Zero-length frames are skipped.
    pub fn record(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let fps = 1.0 / f64::from(dt);
        self.min = self.min.min(fps);
        self.max = self.max.max(fps);
        self.sum += fps;
        self.samples += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn min(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.max)
    }

    pub fn average(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / self.samples as f64)
    }

    /// Log the summary at info level.
    pub fn log_summary(&self, total_frames: u64) {
        if let (Some(min), Some(max), Some(avg)) = (self.min(), self.max(), self.average()) {
            tracing::info!("FPS Statistics:");
            tracing::info!("  Min: {:.1}", min);
            tracing::info!("  Max: {:.1}", max);
            tracing::info!("  Avg: {:.1}", avg);
            tracing::info!("  Total frames: {}", total_frames);
        }
    }
}

/// Measures frame deltas and optionally paces frames to a target rate.
#[derive(Debug)]
pub struct FrameTimer {
    start: Instant,
    last: Instant,
    frame_start: Instant,
    frame_count: u64,
    target_frame_time: Option<Duration>,
    stats: FpsStats,
}

impl FrameTimer {
    pub fn new(target_fps: Option<u32>) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_start: now,
            frame_count: 0,
            target_frame_time: target_frame_time(target_fps),
            stats: FpsStats::default(),
        }
    }

    /// Restart timing, keeping the target rate.
    pub fn reset(&mut self) {
        *self = Self {
            target_frame_time: self.target_frame_time,
            ..Self::new(None)
        };
    }

    /// Start a frame and return its timing.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        self.frame_start = now;
        self.stats.record(dt);

        let frame = FrameTime {
            dt,
            elapsed: now.duration_since(self.start).as_secs_f32(),
            frame_number: self.frame_count,
        };
        self.frame_count += 1;
        frame
    }

    /// Sleep out the remainder of the frame if a target rate is set.
    pub fn pace(&self) {
        if let Some(target) = self.target_frame_time {
            let elapsed = self.frame_start.elapsed();
            if elapsed < target {
                thread::sleep(target - elapsed);
            }
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn stats(&self) -> &FpsStats {
        &self.stats
    }
}

/// Frame budget for `target_fps`; `None` or zero means unlimited.
pub fn target_frame_time(target_fps: Option<u32>) -> Option<Duration> {
    target_fps
        .filter(|&fps| fps > 0)
        .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fps_stats_track_min_max_average() {
        let mut stats = FpsStats::default();
        assert_eq!(stats.average(), None);

        stats.record(0.5);
        stats.record(0.25);
        stats.record(0.0);

        assert_eq!(stats.samples(), 2);
        assert_relative_eq!(stats.min().unwrap(), 2.0);
        assert_relative_eq!(stats.max().unwrap(), 4.0);
        assert_relative_eq!(stats.average().unwrap(), 3.0);
    }

    #[test]
    fn frame_budget_from_target_fps() {
        assert_eq!(target_frame_time(None), None);
        assert_eq!(target_frame_time(Some(0)), None);
        assert_eq!(target_frame_time(Some(50)), Some(Duration::from_millis(20)));
    }

    #[test]
    fn ticks_number_frames() {
        let mut timer = FrameTimer::new(None);
        let first = timer.tick();
        let second = timer.tick();

        assert_eq!(first.frame_number, 0);
        assert_eq!(second.frame_number, 1);
        assert!(second.elapsed >= first.elapsed);
        assert_eq!(timer.frame_count(), 2);

        timer.reset();
        assert_eq!(timer.frame_count(), 0);
    }
}
