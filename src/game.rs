use crate::clock::{Clock, ManualClock};
use crate::config::Config;
use crate::error::SessionError;
use crate::ghost::{GhostReplayer, GhostRun};
use crate::results::{ResultSink, SessionResult};
use crate::session::{KeyInput, SessionState, Snapshot, TypingSession};
use crate::text::TextSource;
use std::time::Duration;

/// Owns one session, its ghost, the clock driving both and the sink that
/// archives finished runs. The host feeds it keys and drains its timers.
pub struct Game<C: Clock> {
    session: TypingSession,
    ghost: GhostReplayer,
    clock: C,
    sink: Box<dyn ResultSink>,
    last_result: Option<SessionResult>,
}

impl<C: Clock> Game<C> {
    pub fn new(
        config: Config,
        source: Box<dyn TextSource>,
        clock: C,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            session: TypingSession::new(config, source),
            ghost: GhostReplayer::new(None),
            clock,
            sink,
            last_result: None,
        }
    }

    /// Start with a ghost of an earlier run, e.g. the last stored result
    pub fn with_previous_wpm(mut self, wpm: Option<u32>) -> Self {
        self.ghost = GhostReplayer::new(wpm);
        self
    }

    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        self.session.snapshot()
    }

    pub fn ghost(&self) -> GhostRun {
        self.ghost.run()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn last_result(&self) -> Option<&SessionResult> {
        self.last_result.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn handle_key(&mut self, key: &KeyInput) {
        let before = self.session.state();
        let result = self.session.on_key(key, &mut self.clock);
        self.after_event(before, result);
    }

    /// Dispatch every timer that is due, in deadline order
    pub fn pump(&mut self) {
        while let Some(id) = self.clock.pop_due() {
            if self.ghost.on_timer(id) {
                continue;
            }
            let before = self.session.state();
            let result = self.session.on_timer(id, &mut self.clock);
            self.after_event(before, result);
        }
    }

    pub fn finish(&mut self) {
        let before = self.session.state();
        let result = self.session.finish(&mut self.clock);
        self.after_event(before, result);
    }

    pub fn reset(&mut self) {
        let before = self.session.state();
        self.session.reset(&mut self.clock);
        self.after_event(before, None);
    }

    /// Change the config and regenerate the text. Only legal while idle.
    pub fn set_config(&mut self, config: Config) -> Result<(), SessionError> {
        self.session.set_config(config)?;
        self.reset();
        Ok(())
    }

    fn after_event(&mut self, before: SessionState, result: Option<SessionResult>) {
        let after = self.session.state();
        if before != SessionState::Running && after == SessionState::Running {
            let target_len = self.session.target().chars().count();
            self.ghost.start(target_len, &mut self.clock);
        } else if before == SessionState::Running && after != SessionState::Running {
            self.ghost.stop(&mut self.clock);
        }

        if let Some(result) = result {
            self.ghost.seed(result.wpm);
            self.submit(&result);
            self.last_result = Some(result);
        }
    }

    fn submit(&mut self, result: &SessionResult) {
        if let Err(e) = self.sink.submit(result) {
            tracing::warn!("could not save result: {}", e);
        }
    }
}

impl Game<ManualClock> {
    /// Move virtual time forward and run whatever fell due
    pub fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.pump();
    }
}
