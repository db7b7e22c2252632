//! [`RawModeGuard`] — a Drop-based undo stack for every bit of terminal
//! state the driver installs.

use std::io::{self, Write};

use crossterm::cursor::Show;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, queue};
use tracing::{debug, warn};

#[cfg(unix)]
use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};

pub struct RawModeGuard {
    kitty_keyboard: bool,
}

impl RawModeGuard {
    /// Runs startup steps 2-4 (raw mode, bracketed paste) and, if `kitty_keyboard` was found supported
    /// by the caller's probe, step 5's enable half (disambiguate + report press/repeat/release).
    pub fn install(kitty_keyboard: bool) -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnableBracketedPaste)?;

        #[cfg(unix)]
        if kitty_keyboard {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
        }

        debug!(kitty_keyboard, "raw mode installed");
        Ok(Self { kitty_keyboard })
    }
}

impl Drop for RawModeGuard {
    /// Reverses the startup pushes in the order 's shutdown section requires, then restores raw mode.
    /// Every step is best-effort: a failure here must never prevent the remaining restoration steps
    /// from running, since this also fires on panic.
    fn drop(&mut self) {
        let mut stdout = io::stdout();

        #[cfg(unix)]
        if self.kitty_keyboard {
            let _ = queue!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = queue!(stdout, DisableBracketedPaste);
        let _ = queue!(stdout, Show);
        let _ = stdout.flush();

        if let Err(err) = disable_raw_mode() {
            warn!(%err, "failed to disable raw mode on shutdown");
        }
    }
}
