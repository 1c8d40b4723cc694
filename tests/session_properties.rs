use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use flowtype::error::ResultError;
use flowtype::results::{BackgroundSubmitter, ResultStore};
use flowtype::session::Key;
use flowtype::text::{Corpus, CustomPrompt, TextGenerator};
use flowtype::{
    Config, Game, KeyInput, ManualClock, Mode, ResultSink, SessionResult, SessionState, Stats,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<SessionResult>>>);

impl ResultSink for Recorder {
    fn submit(&mut self, result: &SessionResult) -> Result<(), ResultError> {
        self.0.borrow_mut().push(result.clone());
        Ok(())
    }
}

fn words_game(word_count: u32, seed: u64, sink: Recorder) -> Game<ManualClock> {
    let config = Config {
        mode: Mode::Words,
        duration: 30,
        word_count,
    };
    let generator = TextGenerator::seeded(Corpus::english().unwrap(), seed);
    Game::new(config, Box::new(generator), ManualClock::new(), Box::new(sink))
}

/// A sloppy typist: mostly right, sometimes wrong, sometimes backspacing
fn random_key(rng: &mut StdRng, expected: Option<char>) -> KeyInput {
    match rng.gen_range(0..10) {
        0 => KeyInput::backspace(),
        1 => KeyInput::char(rng.gen_range('a'..='z')),
        2 => KeyInput::char('x').with_ctrl(),
        _ => KeyInput::char(expected.unwrap_or(' ')),
    }
}

#[test]
fn finished_results_respect_invariants() {
    for seed in 0..20u64 {
        let recorder = Recorder::default();
        let mut game = words_game(10, seed, recorder.clone());
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..2000 {
            if game.state() == SessionState::Finished {
                break;
            }
            let snap = game.snapshot();
            let expected = snap.target.chars().nth(snap.input.chars().count());
            let key = random_key(&mut rng, expected);
            game.advance(Duration::from_millis(rng.gen_range(20..400)));
            game.handle_key(&key);
        }

        assert_eq!(game.state(), SessionState::Finished, "seed {seed}");
        let results = recorder.0.borrow();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(result.wpm <= result.raw_wpm, "seed {seed}");
        assert!(result.accuracy <= 100, "seed {seed}");
        assert!(result.validate().is_ok());
    }
}

#[test]
fn words_mode_finishes_exactly_at_target_length() {
    let mut game = words_game(5, 3, Recorder::default());
    let target: Vec<char> = game.snapshot().target.chars().collect();

    for (i, &c) in target.iter().enumerate() {
        assert_ne!(game.state(), SessionState::Finished, "finished early at {i}");
        game.advance(Duration::from_millis(120));
        game.handle_key(&KeyInput::char(c));
    }

    assert_eq!(game.state(), SessionState::Finished);
    assert_eq!(game.snapshot().input.chars().count(), target.len());
    assert_eq!(game.snapshot().stats.accuracy, 100);
}

#[test]
fn time_mode_ignores_input_length() {
    let config = Config {
        mode: Mode::Time,
        duration: 15,
        word_count: 10,
    };
    let generator = TextGenerator::seeded(Corpus::english().unwrap(), 9);
    let mut game = Game::new(config, Box::new(generator), ManualClock::new(), Box::new(Recorder::default()));
    assert!(game.snapshot().target.split(' ').count() >= 100);

    game.handle_key(&KeyInput::char('q'));
    game.advance(Duration::from_millis(14_999));
    assert_eq!(game.state(), SessionState::Running);
    assert_eq!(game.snapshot().remaining_or_elapsed, 1);

    game.advance(Duration::from_millis(1));
    assert_eq!(game.state(), SessionState::Finished);
    assert_eq!(game.snapshot().remaining_or_elapsed, 0);
}

#[test]
fn reset_is_idempotent() {
    let mut game = words_game(10, 1, Recorder::default());
    for c in "xyz".chars() {
        game.advance(Duration::from_millis(200));
        game.handle_key(&KeyInput::char(c));
    }

    for _ in 0..3 {
        game.reset();
        let snap = game.snapshot();
        assert_eq!(snap.state, SessionState::Idle);
        assert_eq!(snap.input, "");
        assert_eq!(snap.stats, Stats::NEUTRAL);
        assert_eq!(snap.remaining_or_elapsed, 0);
        assert_eq!(game.clock().pending(), 0);
    }
}

#[test]
fn reset_draws_fresh_text() {
    let mut game = words_game(25, 11, Recorder::default());
    let first = game.snapshot().target.to_string();

    game.reset();
    assert_ne!(game.snapshot().target, first);
}

#[test]
fn ghost_is_monotonic_and_resets_off_running() {
    let config = Config {
        mode: Mode::Time,
        duration: 3,
        word_count: 10,
    };
    let mut game = Game::new(
        config,
        Box::new(CustomPrompt("the ghost has twenty chars".to_string())),
        ManualClock::new(),
        Box::new(Recorder::default()),
    )
    .with_previous_wpm(Some(72));

    game.handle_key(&KeyInput::char('t'));
    let mut last = 0;
    while game.state() == SessionState::Running {
        game.advance(Duration::from_millis(50));
        let ghost = game.ghost();
        if game.state() == SessionState::Running {
            assert!(ghost.reveal_count >= last);
            assert!(ghost.reveal_count <= game.snapshot().target.chars().count());
            last = ghost.reveal_count;
        } else {
            assert_eq!(ghost.reveal_count, 0);
        }
    }
    assert!(last > 0);

    // the finished run becomes the next ghost
    let finished_wpm = game.last_result().unwrap().wpm;
    assert_eq!(game.ghost().previous_wpm, Some(finished_wpm));
}

#[test]
fn named_keys_never_reach_the_buffer() {
    let mut game = words_game(5, 5, Recorder::default());
    for name in ["Enter", "Shift", "ArrowUp", "F5"] {
        game.handle_key(&KeyInput::new(Key::Named(name.to_string()), Default::default()));
    }
    assert_eq!(game.state(), SessionState::Idle);
}

#[test]
fn finished_runs_land_in_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.db");

    {
        let submitter = BackgroundSubmitter::spawn(ResultStore::open(&path).unwrap());
        let config = Config {
            mode: Mode::Words,
            duration: 30,
            word_count: 2,
        };
        let mut game = Game::new(
            config,
            Box::new(CustomPrompt("go now".to_string())),
            ManualClock::new(),
            Box::new(submitter),
        );
        for c in "go now".chars() {
            game.advance(Duration::from_millis(100));
            game.handle_key(&KeyInput::char(c));
        }
        assert_eq!(game.state(), SessionState::Finished);
        // dropping the game joins the submission worker
    }

    let store = ResultStore::open(&path).unwrap();
    let recent = store.recent(5).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].mode, "words");
    assert_eq!(recent[0].word_count, Some(2));
    assert_eq!(recent[0].accuracy, 100.0);
    assert_eq!(store.last_wpm().unwrap(), Some(recent[0].wpm));
}
