use std::time::{Duration, Instant};

/// How long frames are accumulated before an FPS value is reported.
const WINDOW: Duration = Duration::from_millis(250);

/// Frame-rate counter averaging over fixed windows. Time is injected by
/// the caller, so the counter can be driven (and tested) without a clock
/// of its own.
pub struct FpsCalculator {
    window_start: Instant,
    frames: u32,
}

impl FpsCalculator {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Record one finished frame. Returns the averaged FPS whenever the
    /// current window has elapsed, `None` otherwise.
    pub fn frame(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < WINDOW {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.window_start = now;
        self.frames = 0;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_report_inside_window() {
        let start = Instant::now();
        let mut fps = FpsCalculator::new(start);

        assert_eq!(fps.frame(start + Duration::from_millis(100)), None);
        assert_eq!(fps.frame(start + Duration::from_millis(200)), None);
    }

    #[test]
    fn test_reports_average_over_elapsed_window() {
        let start = Instant::now();
        let mut fps = FpsCalculator::new(start);

        for i in 1..10 {
            assert_eq!(fps.frame(start + Duration::from_millis(i * 25)), None);
        }
        // 10th frame lands exactly on the 250 ms boundary: 10 / 0.25 s.
        let reported = fps
            .frame(start + Duration::from_millis(250))
            .expect("window elapsed");
        assert!((reported - 40.0).abs() < 1e-3, "got {}", reported);
    }

    #[test]
    fn test_window_resets_after_report() {
        let start = Instant::now();
        let mut fps = FpsCalculator::new(start);

        fps.frame(start + Duration::from_millis(300)).expect("first window");
        // The next window starts from the report, not from construction.
        assert_eq!(fps.frame(start + Duration::from_millis(400)), None);
        let reported = fps
            .frame(start + Duration::from_millis(600))
            .expect("second window");
        assert!((reported - 2.0 / 0.3).abs() < 1e-3, "got {}", reported);
    }
}
