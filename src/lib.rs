// Library surface for the typing engine; the terminal host lives in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod game;
pub mod ghost;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod session;
pub mod text;

pub use clock::{Clock, ManualClock, SystemClock, TimerId};
pub use config::{Config, Mode};
pub use game::Game;
pub use ghost::{GhostReplayer, GhostRun};
pub use metrics::Stats;
pub use results::{ResultSink, SessionResult};
pub use session::{KeyInput, SessionState, Snapshot, TypingSession};
