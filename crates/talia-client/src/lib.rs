// Library root: the runtime half of the game client. Configuration,
// transports, the HTTP collaborator client, the connection manager and the
// per-session event loop.

pub mod api;
pub mod config;
pub mod connection;
pub mod logging;
pub mod session;
pub mod transport;
pub mod ui;

pub use session::{GameSession, SessionHandle};
