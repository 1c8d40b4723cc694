use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Timers never call back. The owner drains them with `pop_due` and routes
/// each id to whoever scheduled it.
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    fn schedule_repeating(&mut self, period: Duration) -> TimerId;

    fn schedule_once(&mut self, delay: Duration) -> TimerId;

    /// Returns false if the timer had already fired (one-shot) or was cancelled
    fn cancel(&mut self, id: TimerId) -> bool;

    /// Next timer that is due, earliest deadline first. Repeating timers are
    /// re-armed one period after the deadline they fired for.
    fn pop_due(&mut self) -> Option<TimerId>;

    /// Deadline of the next pending timer, if any
    fn next_deadline(&self) -> Option<Duration>;
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    deadline: Duration,
    period: Option<Duration>,
    seq: u64,
}

/// Bookkeeping shared by the clock implementations
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_id: u64,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub fn insert(&mut self, deadline: Duration, period: Option<Duration>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let seq = self.seq();
        // a zero period would fire forever within a single drain
        let period = period.map(|p| p.max(Duration::from_millis(1)));
        self.timers.push(Timer {
            id,
            deadline,
            period,
            seq,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Remove (or re-arm) the earliest timer due at or before `horizon`,
    /// returning its id and the deadline it fired for.
    pub fn pop_due(&mut self, horizon: Duration) -> Option<(TimerId, Duration)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= horizon)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(idx, _)| idx)?;

        let fired = self.timers[idx].clone();
        match fired.period {
            Some(period) => {
                let seq = self.seq();
                let timer = &mut self.timers[idx];
                timer.deadline = fired.deadline + period;
                timer.seq = seq;
            }
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some((fired.id, fired.deadline))
    }
}

/// Virtual time for tests and headless drivers. [`ManualClock::advance`]
/// moves the horizon; while timers are drained `now()` steps to each fired
/// deadline and settles on the horizon once nothing else is due.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Duration,
    horizon: Duration,
    queue: TimerQueue,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.horizon = self.horizon.max(self.now) + by;
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.queue.contains(id)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        self.queue.insert(self.now + period, Some(period))
    }

    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        self.queue.insert(self.now + delay, None)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.queue.cancel(id)
    }

    fn pop_due(&mut self) -> Option<TimerId> {
        match self.queue.pop_due(self.horizon) {
            Some((id, deadline)) => {
                self.now = self.now.max(deadline);
                Some(id)
            }
            None => {
                self.now = self.now.max(self.horizon);
                None
            }
        }
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }
}

/// Wall-clock timers backed by [`Instant`]
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
    queue: TimerQueue,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            queue: TimerQueue::new(),
        }
    }

    /// How long the event loop may block before the next timer is due
    pub fn time_until_next(&self) -> Option<Duration> {
        self.queue
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(self.now()))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        let now = self.now();
        self.queue.insert(now + period, Some(period))
    }

    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        let now = self.now();
        self.queue.insert(now + delay, None)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.queue.cancel(id)
    }

    fn pop_due(&mut self) -> Option<TimerId> {
        let now = self.now();
        self.queue.pop_due(now).map(|(id, _)| id)
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }
}
