//! Per-frame state machine.
//!
//! Each frame: drain control events, advance the simulation one step if
//! running, render, then record timings. Cancellation only happens at frame
//! boundaries, so a step that has started always completes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, TryRecvError};
use sph_engine::time::{FrameStopwatch, FrameTimings};

use crate::error::SimError;

/// Signals raised by the windowing layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControlEvent {
    PauseToggle,
    CloseRequest,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SchedulerState {
    #[default]
    Running,
    Paused,
    /// Terminal. The loop exits at the next frame boundary.
    Terminating,
}

impl SchedulerState {
    /// State after applying `event`. `Terminating` absorbs everything.
    pub fn apply(self, event: ControlEvent) -> Self {
        match (self, event) {
            (SchedulerState::Terminating, _) => SchedulerState::Terminating,
            (_, ControlEvent::CloseRequest) => SchedulerState::Terminating,
            (SchedulerState::Running, ControlEvent::PauseToggle) => SchedulerState::Paused,
            (SchedulerState::Paused, ControlEvent::PauseToggle) => SchedulerState::Running,
        }
    }
}

/// Number of executed simulation steps.
///
/// Shared with observer threads, which may only read it. Readers use relaxed
/// ordering: the value is advisory.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter(Arc<AtomicU64>);

impl FrameCounter {
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Snapshot published once per frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameStatus {
    pub frame: u64,
    /// Seconds of simulated time (`frame * time_step`).
    pub simulated_time: f64,
    pub particle_count: u32,
    pub timings: FrameTimings,
    pub state: SchedulerState,
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SPH | frame {} | t = {:.4}s | {} particles | {:.0} fps | frame {:.2}ms (cpu {:.2}ms, gpu {:.2}ms)",
            self.frame,
            self.simulated_time,
            self.particle_count,
            self.timings.fps(),
            self.timings.frame.as_secs_f64() * 1e3,
            self.timings.cpu.as_secs_f64() * 1e3,
            self.timings.gpu.as_secs_f64() * 1e3,
        )?;
        if self.state == SchedulerState::Paused {
            f.write_str(" | paused")?;
        }
        Ok(())
    }
}

/// What the scheduler drives each frame.
pub trait FrameTarget {
    /// Records and submits one simulation step. Must not return before the
    /// whole step is issued.
    fn step(&mut self) -> Result<(), SimError>;

    /// Draws the current positions and presents.
    fn render(&mut self) -> Result<(), SimError>;

    /// Receives the status of the finished frame.
    fn publish_status(&mut self, status: &FrameStatus) {
        let _ = status;
    }
}

pub struct FrameScheduler {
    state: SchedulerState,
    events: Receiver<ControlEvent>,
    counter: FrameCounter,
    time_step: f32,
    particle_count: u32,
    last_timings: FrameTimings,
}

impl FrameScheduler {
    pub fn new(events: Receiver<ControlEvent>, time_step: f32, particle_count: u32) -> Self {
        Self {
            state: SchedulerState::Running,
            events,
            counter: FrameCounter::default(),
            time_step,
            particle_count,
            last_timings: FrameTimings::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Executed steps so far.
    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.counter.get()
    }

    /// Read-only handle for observers on other threads.
    pub fn counter(&self) -> FrameCounter {
        self.counter.clone()
    }

    pub fn simulated_time(&self) -> f64 {
        self.frame_counter() as f64 * self.time_step as f64
    }

    /// Runs one frame and returns the state it ended in.
    ///
    /// Returns `Terminating` without stepping or rendering if a close request
    /// was pending. A target error is fatal: the scheduler moves to
    /// `Terminating` and the error is returned.
    pub fn frame<T>(&mut self, target: &mut T) -> Result<SchedulerState, SimError>
    where
        T: FrameTarget + ?Sized,
    {
        self.frame_from(Instant::now(), target)
    }

    /// Like [`frame`](Self::frame), for a frame whose input phase began at
    /// `started`.
    ///
    /// The reported cpu time runs from `started` to the end of the event
    /// drain, so it covers window-event polling done before this call. The
    /// gpu time covers step, render and present.
    pub fn frame_from<T>(&mut self, started: Instant, target: &mut T) -> Result<SchedulerState, SimError>
    where
        T: FrameTarget + ?Sized,
    {
        let mut watch = FrameStopwatch::starting_at(started);

        self.drain_events();
        if self.state == SchedulerState::Terminating {
            return Ok(self.state);
        }
        watch.mark_cpu();

        if let Err(err) = self.advance(target) {
            self.state = SchedulerState::Terminating;
            return Err(err);
        }

        self.last_timings = watch.finish();
        let status = self.status();
        log::trace!("{status}");
        target.publish_status(&status);

        Ok(self.state)
    }

    /// Runs frames until a close request is handled or a target fails.
    pub fn run<T>(&mut self, target: &mut T) -> Result<(), SimError>
    where
        T: FrameTarget + ?Sized,
    {
        while self.frame(target)? != SchedulerState::Terminating {}
        Ok(())
    }

    pub fn status(&self) -> FrameStatus {
        FrameStatus {
            frame: self.frame_counter(),
            simulated_time: self.simulated_time(),
            particle_count: self.particle_count,
            timings: self.last_timings,
            state: self.state,
        }
    }

    fn advance<T>(&mut self, target: &mut T) -> Result<(), SimError>
    where
        T: FrameTarget + ?Sized,
    {
        if self.state == SchedulerState::Running {
            target.step()?;
            self.counter.increment();
        }
        target.render()
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    let next = self.state.apply(event);
                    if next != self.state {
                        log::debug!("scheduler {:?} -> {:?} on {event:?}", self.state, next);
                    }
                    self.state = next;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // No producer left to ever resume or close us.
                    if self.state != SchedulerState::Terminating {
                        log::debug!("control channel closed; terminating");
                    }
                    self.state = SchedulerState::Terminating;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{unbounded, Sender};

    use super::*;
    use crate::params::TIME_STEP;

    #[derive(Default)]
    struct CountingTarget {
        steps: u64,
        renders: u64,
        statuses: Vec<FrameStatus>,
    }

    impl FrameTarget for CountingTarget {
        fn step(&mut self) -> Result<(), SimError> {
            self.steps += 1;
            Ok(())
        }

        fn render(&mut self) -> Result<(), SimError> {
            self.renders += 1;
            Ok(())
        }

        fn publish_status(&mut self, status: &FrameStatus) {
            self.statuses.push(*status);
        }
    }

    fn scheduler() -> (Sender<ControlEvent>, FrameScheduler) {
        let (tx, rx) = unbounded();
        (tx, FrameScheduler::new(rx, TIME_STEP, 100))
    }

    #[test]
    fn transitions() {
        use ControlEvent::*;
        use SchedulerState::*;

        assert_eq!(Running.apply(PauseToggle), Paused);
        assert_eq!(Paused.apply(PauseToggle), Running);
        assert_eq!(Running.apply(CloseRequest), Terminating);
        assert_eq!(Paused.apply(CloseRequest), Terminating);
        assert_eq!(Terminating.apply(PauseToggle), Terminating);
    }

    #[test]
    fn counter_tracks_running_frames_only() {
        let (tx, mut sched) = scheduler();
        let mut target = CountingTarget::default();
        let mut running_frames = 0;

        for i in 0..50u32 {
            if i % 7 == 3 {
                tx.send(ControlEvent::PauseToggle).unwrap();
            }
            if sched.frame(&mut target).unwrap() == SchedulerState::Running {
                running_frames += 1;
            }
        }

        assert_eq!(sched.frame_counter(), running_frames);
        assert_eq!(target.steps, running_frames);
        assert_eq!(target.renders, 50);
        assert!((sched.simulated_time() - running_frames as f64 * TIME_STEP as f64).abs() < 1e-12);
    }

    #[test]
    fn double_toggle_restores_running() {
        let (tx, mut sched) = scheduler();
        let mut target = CountingTarget::default();
        sched.frame(&mut target).unwrap();
        let before = sched.frame_counter();

        tx.send(ControlEvent::PauseToggle).unwrap();
        tx.send(ControlEvent::PauseToggle).unwrap();
        sched.drain_events();

        assert_eq!(sched.state(), SchedulerState::Running);
        assert_eq!(sched.frame_counter(), before);
    }

    #[test]
    fn paused_frames_still_render() {
        let (tx, mut sched) = scheduler();
        let mut target = CountingTarget::default();

        tx.send(ControlEvent::PauseToggle).unwrap();
        for _ in 0..3 {
            assert_eq!(sched.frame(&mut target).unwrap(), SchedulerState::Paused);
        }

        assert_eq!(target.steps, 0);
        assert_eq!(target.renders, 3);
        assert_eq!(sched.frame_counter(), 0);
        assert!(target.statuses.iter().all(|s| s.to_string().ends_with("| paused")));
    }

    #[test]
    fn close_request_skips_step_and_render() {
        let (tx, mut sched) = scheduler();
        let mut target = CountingTarget::default();

        tx.send(ControlEvent::CloseRequest).unwrap();
        assert_eq!(sched.frame(&mut target).unwrap(), SchedulerState::Terminating);
        assert_eq!((target.steps, target.renders), (0, 0));

        // Terminal: further events change nothing.
        tx.send(ControlEvent::PauseToggle).unwrap();
        assert_eq!(sched.frame(&mut target).unwrap(), SchedulerState::Terminating);
    }

    #[test]
    fn dropped_sender_terminates() {
        let (tx, mut sched) = scheduler();
        drop(tx);
        assert_eq!(
            sched.frame(&mut CountingTarget::default()).unwrap(),
            SchedulerState::Terminating
        );
    }

    struct FailingRender;

    impl FrameTarget for FailingRender {
        fn step(&mut self) -> Result<(), SimError> {
            Ok(())
        }

        fn render(&mut self) -> Result<(), SimError> {
            Err(SimError::Device("surface out of memory".into()))
        }
    }

    #[test]
    fn target_failure_is_terminal() {
        let (_tx, mut sched) = scheduler();
        let err = sched.run(&mut FailingRender).unwrap_err();

        assert!(matches!(err, SimError::Device(_)));
        assert_eq!(sched.state(), SchedulerState::Terminating);
        // The step before the failing render did execute.
        assert_eq!(sched.frame_counter(), 1);
    }

    #[test]
    fn cpu_time_includes_polling_before_the_frame() {
        let (_tx, mut sched) = scheduler();
        let mut target = CountingTarget::default();
        let polled_at = Instant::now() - std::time::Duration::from_millis(5);

        sched.frame_from(polled_at, &mut target).unwrap();

        let timings = target.statuses[0].timings;
        assert!(timings.cpu >= std::time::Duration::from_millis(5));
        assert_eq!(timings.cpu + timings.gpu, timings.frame);
    }

    #[test]
    fn status_string_reports_frame_and_population() {
        let (_tx, mut sched) = scheduler();
        let mut target = CountingTarget::default();
        sched.frame(&mut target).unwrap();
        sched.frame(&mut target).unwrap();

        let status = target.statuses.last().unwrap().to_string();
        assert!(status.starts_with("SPH | frame 2 | t = 0.0002s | 100 particles"));
        assert!(!status.contains("paused"));
    }
}
