//! The terminal front-end: wires `kestrel-terminal`'s raw input, `kestrel-keys`'s decoding, and
//! `kestrel-render`'s differential painter around an `AgentSession`.

pub mod app;
pub mod commands;
pub mod error;
pub mod keymap;
pub mod overlays;
pub mod transcript;

pub use app::App;
pub use error::{Result, TuiError};
