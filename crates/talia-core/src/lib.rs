// Library root: I/O-free session logic shared by the runtime crate and its
// tests.

pub mod backoff;
pub mod consensus;
pub mod dispatch;
pub mod ephemeral;
pub mod game;
pub mod protocol;
