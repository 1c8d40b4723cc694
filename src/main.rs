mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use flowtype::{
    app_dirs::AppDirs,
    config::{ConfigStore, FileConfigStore},
    results::{BackgroundSubmitter, CsvResultLog, FanOut, NullSink, ResultSink, ResultStore},
    runtime::{to_key_input, CrosstermEventSource, FlowEvent, Runner},
    text::{Corpus, CustomPrompt, TextGenerator, TextSource},
    Config, Game, Mode, SessionState, SystemClock,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

/// timed typing practice with a ghost of your previous run
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed typing practice with live speed and accuracy, racing a ghost cursor that replays the pace of your previous run."
)]
pub struct Cli {
    /// practice mode (defaults to the saved setting)
    #[clap(short = 'm', long, value_enum)]
    mode: Option<Mode>,

    /// number of seconds to run a timed test
    #[clap(short = 's', long)]
    duration: Option<u32>,

    /// number of words in a words test
    #[clap(short = 'w', long = "words")]
    word_count: Option<u32>,

    /// custom prompt to use instead of random words
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// results database (defaults to the state directory)
    #[clap(long)]
    db: Option<PathBuf>,

    /// also append results to this csv file
    #[clap(long)]
    csv: Option<PathBuf>,

    /// don't save results
    #[clap(long)]
    no_save: bool,
}

impl Cli {
    /// Overlay the command line on the saved config
    fn apply(&self, stored: Config) -> Config {
        let cfg = Config {
            mode: self.mode.unwrap_or(stored.mode),
            duration: self.duration.unwrap_or(stored.duration),
            word_count: self.word_count.unwrap_or(stored.word_count),
        };
        cfg.validated(&stored)
    }

    fn text_source(&self) -> Result<Box<dyn TextSource>, Box<dyn Error>> {
        Ok(match &self.prompt {
            // an empty target could never be completed
            Some(prompt) if prompt.trim().is_empty() => return Err("prompt must not be empty".into()),
            Some(prompt) => Box::new(CustomPrompt(prompt.clone())),
            None => Box::new(TextGenerator::new(Corpus::english()?)),
        })
    }

    /// Where results go, plus the last stored WPM to seed the ghost with
    fn result_sink(&self) -> (Box<dyn ResultSink>, Option<u32>) {
        if self.no_save {
            return (Box::new(NullSink), None);
        }

        let mut sinks = FanOut::new();
        let mut previous_wpm = None;

        let db_path = self
            .db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("flowtype_results.db"));
        match ResultStore::open(&db_path) {
            Ok(store) => {
                previous_wpm = store.last_wpm().unwrap_or_else(|e| {
                    tracing::warn!("could not read previous result: {}", e);
                    None
                });
                sinks = sinks.with(store);
            }
            Err(e) => tracing::warn!("results won't be stored in {}: {}", db_path.display(), e),
        }

        if let Some(csv) = &self.csv {
            sinks = sinks.with(CsvResultLog::new(csv));
        }

        if sinks.is_empty() {
            return (Box::new(NullSink), previous_wpm);
        }
        (Box::new(BackgroundSubmitter::spawn(sinks)), previous_wpm)
    }
}

pub struct App {
    pub game: Game<SystemClock>,
    config_store: FileConfigStore,
}

impl App {
    fn change_config(&mut self, f: impl FnOnce(Config) -> Config) {
        if self.game.state() == SessionState::Running {
            return;
        }
        if self.game.state() == SessionState::Finished {
            self.game.reset();
        }
        let config = f(*self.game.session().config());
        match self.game.set_config(config) {
            Ok(()) => {
                if let Err(e) = self.config_store.save(self.game.session().config()) {
                    tracing::warn!("could not save config: {}", e);
                }
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

fn init_logging(path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FLOWTYPE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| -> Box<dyn Error> { e })?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(AppDirs::log_path())?;

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());
    if let Err(e) = config_store.save(&config) {
        tracing::warn!("could not save config: {}", e);
    }

    let (sink, previous_wpm) = cli.result_sink();
    let game = Game::new(config, cli.text_source()?, SystemClock::new(), sink)
        .with_previous_wpm(previous_wpm);
    let mut app = App { game, config_store };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

#[derive(Debug, PartialEq)]
enum Control {
    Continue,
    Quit,
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new());

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let event = runner.step(app.game.clock().time_until_next());
        // timers that fell due before this event go first
        app.game.pump();

        match event {
            FlowEvent::Key(key) => {
                if handle_key(app, key) == Control::Quit {
                    break;
                }
            }
            FlowEvent::Resize | FlowEvent::Wake => {}
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Control {
    // some terminals report releases too; shortcuts act on the press only
    if key.kind == KeyEventKind::Release {
        return Control::Continue;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Control::Quit;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Esc => app.game.reset(),
        KeyCode::Enter if app.game.state() == SessionState::Finished => app.game.reset(),
        KeyCode::F(2) => app.change_config(Config::toggle_mode),
        KeyCode::F(3) => app.change_config(Config::next_preset),
        _ => {
            if let Some(input) = to_key_input(&key) {
                app.game.handle_key(&input);
            }
        }
    }
    Control::Continue
}
