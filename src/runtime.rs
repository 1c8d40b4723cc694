use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::session::{Key, KeyInput, Modifiers};

/// Longest the event loop blocks when no timer is pending
pub const MAX_POLL: Duration = Duration::from_millis(250);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum FlowEvent {
    Key(KeyEvent),
    Resize,
    /// Nothing arrived before the timeout; time to drain the clock
    Wake,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait FlowEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<FlowEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<FlowEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(FlowEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(FlowEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("terminal input failed: {}", e);
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FlowEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source fed from a channel
pub struct TestEventSource {
    rx: Receiver<FlowEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<FlowEvent>) -> Self {
        Self { rx }
    }
}

impl FlowEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FlowEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: FlowEventSource> {
    event_source: E,
}

impl<E: FlowEventSource> Runner<E> {
    pub fn new(event_source: E) -> Self {
        Self { event_source }
    }

    /// Blocks until an event arrives or the next timer is due (capped at
    /// [`MAX_POLL`]); returns Wake on timeout
    pub fn step(&self, until_next_timer: Option<Duration>) -> FlowEvent {
        let timeout = until_next_timer.map_or(MAX_POLL, |t| t.min(MAX_POLL));
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => FlowEvent::Wake,
        }
    }
}

/// Translate a terminal key event into the engine's key model. Key
/// releases come back as `None`.
pub fn to_key_input(key: &KeyEvent) -> Option<KeyInput> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let modifiers = Modifiers {
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
        meta: key.modifiers.contains(KeyModifiers::SUPER) || key.modifiers.contains(KeyModifiers::META),
    };
    let key = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        other => Key::Named(format!("{other:?}")),
    };
    Some(KeyInput::new(key, modifiers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_wakes_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx));

        match runner.step(Some(Duration::from_millis(1))) {
            FlowEvent::Wake => {}
            _ => panic!("expected Wake on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(FlowEvent::Resize).unwrap();
        let runner = Runner::new(TestEventSource::new(rx));

        match runner.step(None) {
            FlowEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn converts_plain_chars() {
        let input = to_key_input(&KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE)).unwrap();
        assert_eq!(input, KeyInput::char('a'));

        let shifted = to_key_input(&KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)).unwrap();
        assert_eq!(shifted, KeyInput::char('A'));
    }

    #[test]
    fn converts_modifiers_and_named_keys() {
        let ctrl = to_key_input(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)).unwrap();
        assert!(ctrl.modifiers.ctrl);

        let bs = to_key_input(&KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)).unwrap();
        assert_eq!(bs, KeyInput::backspace());

        let tab = to_key_input(&KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)).unwrap();
        assert_eq!(tab.key, Key::Named("Tab".to_string()));
    }

    #[test]
    fn drops_key_releases() {
        let mut release = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(to_key_input(&release).is_none());
    }
}
