// Library surface for the drill binary and the integration tests.
pub mod app_dirs;
pub mod assignment;
pub mod config;
pub mod error;
pub mod generator;
pub mod problem;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod ui;
pub mod util;

pub use error::{DrillError, Result};
pub use generator::ProblemGenerator;
pub use problem::{Problem, Range};
pub use scheduler::PromptScheduler;
pub use session::{GameSession, LoopControl, SessionConfig, SessionState};
pub use stats::{ResultStats, StatsDb};
