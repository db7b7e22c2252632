//! Raw-mode terminal acquisition, capability probing, and restoration
//! . Built directly on `crossterm`'s low-level primitives rather than a higher-level terminal
//! abstraction, so `kestrel-render`'s differential patches can be written straight to stdout.

pub mod capabilities;
pub mod driver;
pub mod error;
pub mod guard;

pub use driver::{TerminalDriver, TerminalEvent};
pub use error::TerminalError;
pub use guard::RawModeGuard;
