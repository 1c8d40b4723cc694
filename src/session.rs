use crate::clock::{Clock, TimerId};
use crate::config::{Config, Mode};
use crate::error::SessionError;
use crate::metrics::{self, Metrics, Stats};
use crate::results::SessionResult;
use crate::text::TextSource;
use chrono::Local;
use std::time::Duration;

/// Period of the countdown / elapsed counter
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Finished,
}

impl SessionState {
    /// The only legal transitions
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Running, Finished) | (Running, Idle) | (Finished, Idle)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    /// Any other named key (Tab, Enter, ArrowLeft...)
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// A key event as delivered by the host UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::NONE)
    }

    pub fn backspace() -> Self {
        Self::new(Key::Backspace, Modifiers::NONE)
    }

    pub fn named(name: &str) -> Self {
        Self::new(Key::Named(name.to_string()), Modifiers::NONE)
    }

    pub fn with_ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    fn edit(&self) -> Option<Edit> {
        if self.modifiers.any() {
            return None;
        }
        match self.key {
            Key::Char(c) if !c.is_control() => Some(Edit::Insert(c)),
            Key::Backspace => Some(Edit::Delete),
            _ => None,
        }
    }
}

enum Edit {
    Insert(char),
    Delete,
}

/// Read-only view handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot<'a> {
    pub mode: Mode,
    pub input: &'a str,
    pub target: &'a str,
    pub remaining_or_elapsed: u32,
    pub state: SessionState,
    pub stats: Stats,
}

/// One typing run. Idle until the first character, Running until the text
/// is done or the countdown ends, then Finished until reset.
pub struct TypingSession {
    config: Config,
    pending_config: Option<Config>,
    source: Box<dyn TextSource>,
    target: String,
    target_len: usize,
    input: String,
    input_len: usize,
    state: SessionState,
    started_at: Option<Duration>,
    remaining_or_elapsed: u32,
    metrics: Metrics,
    tick: Option<TimerId>,
    keystrokes_this_second: u32,
    per_second: Vec<u32>,
}

impl TypingSession {
    pub fn new(config: Config, mut source: Box<dyn TextSource>) -> Self {
        let config = config.validated(&Config::default());
        let target = source.generate(config.target_word_count());
        Self {
            target_len: target.chars().count(),
            target,
            config,
            pending_config: None,
            source,
            input: String::new(),
            input_len: 0,
            state: SessionState::Idle,
            started_at: None,
            remaining_or_elapsed: config.initial_counter(),
            metrics: Metrics::default(),
            tick: None,
            keystrokes_this_second: 0,
            per_second: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn stats(&self) -> Stats {
        self.metrics.stats
    }

    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    pub fn remaining_or_elapsed(&self) -> u32 {
        self.remaining_or_elapsed
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            mode: self.config.mode,
            input: &self.input,
            target: &self.target,
            remaining_or_elapsed: self.remaining_or_elapsed,
            state: self.state,
            stats: self.metrics.stats,
        }
    }

    /// Queue a config for the next reset. Only legal while idle.
    pub fn set_config(&mut self, config: Config) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::ConfigLocked { state: self.state });
        }
        self.pending_config = Some(config.validated(&self.config));
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!("session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Feed one key event. Returns the result if this keystroke finished the session.
    pub fn on_key(&mut self, key: &KeyInput, clock: &mut dyn Clock) -> Option<SessionResult> {
        if self.state == SessionState::Finished {
            return None;
        }
        let Some(edit) = key.edit() else {
            tracing::trace!("dropping key {:?}", key);
            return None;
        };

        match edit {
            Edit::Insert(c) => {
                if self.state == SessionState::Idle {
                    self.start(clock);
                }
                self.input.push(c);
                self.input_len += 1;
                self.keystrokes_this_second += 1;
            }
            Edit::Delete => {
                if self.state == SessionState::Idle {
                    return None;
                }
                if self.input.pop().is_some() {
                    self.input_len -= 1;
                }
            }
        }

        self.recompute(clock.now());
        self.finish_if_done(clock)
    }

    /// Route a fired timer. Ids that aren't this session's tick are ignored.
    pub fn on_timer(&mut self, id: TimerId, clock: &mut dyn Clock) -> Option<SessionResult> {
        if self.tick == Some(id) {
            self.on_tick(clock)
        } else {
            None
        }
    }

    /// Once-per-second bookkeeping while running
    pub fn on_tick(&mut self, clock: &mut dyn Clock) -> Option<SessionResult> {
        if self.state != SessionState::Running {
            return None;
        }
        self.per_second.push(self.keystrokes_this_second);
        self.keystrokes_this_second = 0;

        match self.config.mode {
            Mode::Time => self.remaining_or_elapsed = self.remaining_or_elapsed.saturating_sub(1),
            Mode::Words => self.remaining_or_elapsed += 1,
        }

        self.recompute(clock.now());
        self.finish_if_done(clock)
    }

    /// End the session. A no-op unless running.
    pub fn finish(&mut self, clock: &mut dyn Clock) -> Option<SessionResult> {
        if self.state != SessionState::Running {
            return None;
        }
        self.cancel_tick(clock);
        self.transition(SessionState::Finished);

        let now = clock.now();
        self.recompute(now);

        let elapsed = self
            .started_at
            .map(|start| now.saturating_sub(start))
            .unwrap_or_default();
        let stats = self.metrics.stats;
        let result = SessionResult {
            mode: self.config.mode,
            duration: (self.config.mode == Mode::Time).then_some(self.config.duration),
            word_count: (self.config.mode == Mode::Words).then_some(self.config.word_count),
            wpm: stats.wpm,
            raw_wpm: stats.raw_wpm,
            accuracy: stats.accuracy,
            consistency: metrics::consistency(&self.per_second),
            correct_chars: self.metrics.correct_chars,
            incorrect_chars: self.metrics.incorrect_chars,
            elapsed_secs: elapsed.as_secs_f64(),
            timestamp: Local::now(),
        };
        tracing::info!(
            "{} session finished: {} wpm, {} raw, {}% acc",
            result.mode,
            result.wpm,
            result.raw_wpm,
            result.accuracy
        );
        Some(result)
    }

    /// Back to Idle with a fresh target and neutral stats
    pub fn reset(&mut self, clock: &mut dyn Clock) {
        self.cancel_tick(clock);
        if let Some(config) = self.pending_config.take() {
            self.config = config;
        }
        self.target = self.source.generate(self.config.target_word_count());
        self.target_len = self.target.chars().count();
        self.input.clear();
        self.input_len = 0;
        self.started_at = None;
        self.remaining_or_elapsed = self.config.initial_counter();
        self.metrics = Metrics::default();
        self.keystrokes_this_second = 0;
        self.per_second.clear();
        self.transition(SessionState::Idle);
    }

    fn start(&mut self, clock: &mut dyn Clock) {
        self.transition(SessionState::Running);
        self.started_at = Some(clock.now());
        self.tick = Some(clock.schedule_repeating(TICK_INTERVAL));
    }

    fn cancel_tick(&mut self, clock: &mut dyn Clock) {
        if let Some(id) = self.tick.take() {
            clock.cancel(id);
        }
    }

    fn recompute(&mut self, now: Duration) {
        if let Some(start) = self.started_at {
            let elapsed_minutes = now.saturating_sub(start).as_secs_f64() / 60.0;
            self.metrics = metrics::compute(self.metrics, &self.target, &self.input, elapsed_minutes);
        }
    }

    fn finish_if_done(&mut self, clock: &mut dyn Clock) -> Option<SessionResult> {
        if self.state != SessionState::Running {
            return None;
        }
        let text_done = self.target_len > 0 && self.input_len >= self.target_len;
        let time_up = self.config.mode == Mode::Time && self.remaining_or_elapsed == 0;
        if text_done || time_up {
            self.finish(clock)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for TypingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingSession")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("target", &self.target)
            .field("input", &self.input)
            .field("remaining_or_elapsed", &self.remaining_or_elapsed)
            .field("stats", &self.metrics.stats)
            .finish()
    }
}
