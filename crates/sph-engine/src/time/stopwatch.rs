use std::time::{Duration, Instant};

/// Wall-clock split of one frame.
///
/// `cpu` covers the host-side phase up to `mark_cpu` (input polling), `gpu` the
/// remainder (command recording, submission, present). `cpu + gpu == frame`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameTimings {
    pub frame: Duration,
    pub cpu: Duration,
    pub gpu: Duration,
}

impl FrameTimings {
    /// Instantaneous frames per second derived from `frame`.
    ///
    /// Returns `0.0` for a zero-length frame rather than infinity.
    pub fn fps(&self) -> f32 {
        let secs = self.frame.as_secs_f32();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

/// Measures a single frame.
///
/// Unlike a delta-time clock this does not clamp: the recorded duration is the
/// real elapsed wall time, used for reporting only.
#[derive(Debug, Clone)]
pub struct FrameStopwatch {
    start: Instant,
    cpu_end: Option<Instant>,
}

impl FrameStopwatch {
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start, cpu_end: None }
    }

    /// Marks the end of the host-side phase.
    ///
    /// Only the first mark counts.
    pub fn mark_cpu(&mut self) {
        self.mark_cpu_at(Instant::now());
    }

    pub fn mark_cpu_at(&mut self, at: Instant) {
        if self.cpu_end.is_none() {
            self.cpu_end = Some(at.max(self.start));
        }
    }

    pub fn finish(self) -> FrameTimings {
        self.finish_at(Instant::now())
    }

    /// Without a `mark_cpu` the whole frame is attributed to `cpu`.
    pub fn finish_at(self, end: Instant) -> FrameTimings {
        let end = end.max(self.start);
        let cpu_end = self.cpu_end.unwrap_or(end).min(end);
        FrameTimings {
            frame: end - self.start,
            cpu: cpu_end - self.start,
            gpu: end - cpu_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_adds_up() {
        let t0 = Instant::now();
        let mut sw = FrameStopwatch::starting_at(t0);
        sw.mark_cpu_at(t0 + Duration::from_millis(2));
        let t = sw.finish_at(t0 + Duration::from_millis(10));

        assert_eq!(t.frame, Duration::from_millis(10));
        assert_eq!(t.cpu, Duration::from_millis(2));
        assert_eq!(t.gpu, Duration::from_millis(8));
        assert!((t.fps() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn second_mark_is_ignored() {
        let t0 = Instant::now();
        let mut sw = FrameStopwatch::starting_at(t0);
        sw.mark_cpu_at(t0 + Duration::from_millis(1));
        sw.mark_cpu_at(t0 + Duration::from_millis(5));
        let t = sw.finish_at(t0 + Duration::from_millis(6));
        assert_eq!(t.cpu, Duration::from_millis(1));
    }

    #[test]
    fn unmarked_frame_is_all_cpu() {
        let t0 = Instant::now();
        let t = FrameStopwatch::starting_at(t0).finish_at(t0 + Duration::from_millis(4));
        assert_eq!(t.cpu, t.frame);
        assert_eq!(t.gpu, Duration::ZERO);
    }

    #[test]
    fn zero_frame_has_zero_fps() {
        assert_eq!(FrameTimings::default().fps(), 0.0);
    }
}
