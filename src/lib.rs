// Library surface for the game engine, shared by the binary and integration tests.
// Rendering and terminal plumbing stay in main.rs.
pub mod app_dirs;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod queue;
pub mod runtime;
pub mod session;
pub mod snapshot;
pub mod timing;

pub use session::{InputEvent, Outcome, Phase, Session, SessionEvent, TickReport};
pub use snapshot::SessionSnapshot;
