use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use flowtype::runtime::{to_key_input, FlowEvent, Runner, TestEventSource};
use flowtype::text::CustomPrompt;
use flowtype::{Config, Game, ManualClock, Mode, SessionState};

fn key(c: char) -> FlowEvent {
    FlowEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Headless integration using the runtime + Game without a TTY.
// Verifies that a typing flow completes via Runner/TestEventSource.
#[test]
fn headless_typing_flow_completes() {
    let config = Config {
        mode: Mode::Words,
        duration: 30,
        word_count: 1,
    };
    let mut game = Game::new(
        config,
        Box::new(CustomPrompt("hi".to_string())),
        ManualClock::new(),
        Box::new(flowtype::results::NullSink),
    );

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx));

    tx.send(key('h')).unwrap();
    tx.send(key('i')).unwrap();

    for _ in 0..100u32 {
        game.advance(Duration::from_millis(150));
        match runner.step(Some(Duration::from_millis(1))) {
            FlowEvent::Key(k) => {
                if let Some(input) = to_key_input(&k) {
                    game.handle_key(&input);
                }
            }
            FlowEvent::Resize | FlowEvent::Wake => {}
        }
        if game.state() == SessionState::Finished {
            break;
        }
    }

    assert_eq!(game.state(), SessionState::Finished);
    let result = game.last_result().expect("finished run has a result");
    assert_eq!(result.accuracy, 100);
    assert!(result.wpm > 0);
    assert!(result.wpm <= result.raw_wpm);
}

#[test]
fn headless_modifier_combos_are_ignored() {
    let mut game = Game::new(
        Config::default(),
        Box::new(CustomPrompt("abc".to_string())),
        ManualClock::new(),
        Box::new(flowtype::results::NullSink),
    );

    let ctrl_a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL);
    let alt_a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::ALT);
    let left = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
    for k in [ctrl_a, alt_a, left] {
        game.handle_key(&to_key_input(&k).unwrap());
    }

    assert_eq!(game.state(), SessionState::Idle);
    assert_eq!(game.snapshot().input, "");
}

#[test]
fn headless_timed_session_finishes_by_time() {
    let config = Config {
        mode: Mode::Time,
        duration: 5,
        word_count: 25,
    };
    let mut game = Game::new(
        config,
        Box::new(CustomPrompt("hello there".to_string())),
        ManualClock::new(),
        Box::new(flowtype::results::NullSink),
    );

    game.handle_key(&to_key_input(&KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE)).unwrap());
    for second in 1..=5u32 {
        assert_eq!(game.state(), SessionState::Running);
        game.advance(Duration::from_secs(1));
        assert_eq!(game.snapshot().remaining_or_elapsed, 5 - second);
    }

    assert_eq!(game.state(), SessionState::Finished, "timed session should finish by timeout");
    assert_eq!(game.snapshot().input, "h");
}
