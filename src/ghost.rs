use crate::clock::{Clock, TimerId};
use crate::metrics::CHARS_PER_WORD;
use std::time::Duration;

/// What the renderer needs to draw the ghost cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GhostRun {
    pub previous_wpm: Option<u32>,
    pub reveal_count: usize,
}

/// Replays a previous session's pace as a second cursor. Moves only while
/// the live session is running and restarts from zero each time.
#[derive(Debug, Default)]
pub struct GhostReplayer {
    previous_wpm: Option<u32>,
    reveal_count: usize,
    target_len: usize,
    timer: Option<TimerId>,
}

impl GhostReplayer {
    pub fn new(previous_wpm: Option<u32>) -> Self {
        Self {
            previous_wpm,
            ..Self::default()
        }
    }

    /// Carry a finished session's speed into the next run
    pub fn seed(&mut self, wpm: u32) {
        tracing::debug!("ghost seeded at {} wpm", wpm);
        self.previous_wpm = Some(wpm);
    }

    pub fn previous_wpm(&self) -> Option<u32> {
        self.previous_wpm
    }

    pub fn reveal_count(&self) -> usize {
        self.reveal_count
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn run(&self) -> GhostRun {
        GhostRun {
            previous_wpm: self.previous_wpm,
            reveal_count: self.reveal_count,
        }
    }

    /// Time between revealed characters at the previous pace. `None` when
    /// there is no usable previous run.
    pub fn interval(&self) -> Option<Duration> {
        match self.previous_wpm {
            Some(wpm) if wpm > 0 => {
                let chars_per_sec = wpm as f64 * CHARS_PER_WORD / 60.0;
                Some(Duration::from_secs_f64(1.0 / chars_per_sec))
            }
            _ => None,
        }
    }

    /// The live session entered Running with a target of `target_len` chars
    pub fn start(&mut self, target_len: usize, clock: &mut dyn Clock) {
        self.stop(clock);
        self.target_len = target_len;
        if let Some(interval) = self.interval() {
            tracing::debug!("ghost revealing every {:?}", interval);
            self.timer = Some(clock.schedule_repeating(interval));
        }
    }

    /// The live session left Running
    pub fn stop(&mut self, clock: &mut dyn Clock) {
        if let Some(id) = self.timer.take() {
            clock.cancel(id);
        }
        self.reveal_count = 0;
    }

    /// Route a fired timer. Returns true if it was the ghost's.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.timer != Some(id) {
            return false;
        }
        if self.reveal_count < self.target_len {
            self.reveal_count += 1;
        }
        true
    }
}
