use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Durations offered by the config bar, in seconds
pub const DURATION_PRESETS: [u32; 3] = [15, 30, 60];
/// Word counts offered by the config bar
pub const WORD_COUNT_PRESETS: [u32; 4] = [10, 25, 50, 100];

/// Lower bound on the words generated for a timed session
pub const TIME_MODE_MIN_WORDS: usize = 100;
/// Speed the timed text is sized for, so the countdown runs out first
pub const TIME_MODE_CEILING_WPM: u32 = 250;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Type as much as possible before the countdown ends
    Time,
    /// Type a fixed number of words as fast as possible
    Words,
}

/// Settings for one session. Read when the session is (re)generated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    /// Countdown length in seconds, Time mode only
    pub duration: u32,
    /// Words to type, Words mode only
    pub word_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Time,
            duration: 30,
            word_count: 25,
        }
    }
}

impl Config {
    /// Replace non-positive values with the ones from `fallback`
    pub fn validated(self, fallback: &Config) -> Config {
        let mut cfg = self;
        if cfg.duration == 0 {
            tracing::warn!(
                "invalid duration 0, keeping {}s",
                fallback.duration
            );
            cfg.duration = fallback.duration;
        }
        if cfg.word_count == 0 {
            tracing::warn!(
                "invalid word count 0, keeping {}",
                fallback.word_count
            );
            cfg.word_count = fallback.word_count;
        }
        cfg
    }

    /// How many words to generate for a session with this config
    pub fn target_word_count(&self) -> usize {
        match self.mode {
            Mode::Words => self.word_count as usize,
            Mode::Time => {
                let needed = (self.duration as usize * TIME_MODE_CEILING_WPM as usize).div_ceil(60);
                needed.max(TIME_MODE_MIN_WORDS)
            }
        }
    }

    /// Value the countdown / elapsed counter starts from
    pub fn initial_counter(&self) -> u32 {
        match self.mode {
            Mode::Time => self.duration,
            Mode::Words => 0,
        }
    }

    pub fn toggle_mode(self) -> Config {
        let mode = match self.mode {
            Mode::Time => Mode::Words,
            Mode::Words => Mode::Time,
        };
        Config { mode, ..self }
    }

    /// Step to the next preset for the active mode, wrapping around
    pub fn next_preset(self) -> Config {
        fn next(presets: &[u32], current: u32) -> u32 {
            presets
                .iter()
                .copied()
                .find(|&p| p > current)
                .unwrap_or(presets[0])
        }
        match self.mode {
            Mode::Time => Config {
                duration: next(&DURATION_PRESETS, self.duration),
                ..self
            },
            Mode::Words => Config {
                word_count: next(&WORD_COUNT_PRESETS, self.word_count),
                ..self
            },
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "flowtype") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("flowtype_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let cfg = match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("ignoring malformed config {}: {}", self.path.display(), e);
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        };
        cfg.validated(&Config::default())
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
