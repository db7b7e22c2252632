//! [`TerminalDriver`]: runs the startup sequence, forwards decoded input,
//! and restores the terminal on drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use crate::capabilities::{probe_cell_pixel_size, probe_kitty_keyboard};
use crate::error::TerminalError;
use crate::guard::RawModeGuard;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Input already decoded one layer (crossterm's own byte-to-event parsing);
/// `kestrel-keys` takes it from here to canonical `KeyId`s.
#[derive(Debug, Clone)]
pub enum TerminalEvent {
    Key(crossterm::event::KeyEvent),
    Paste(String),
    Resize { columns: u16, rows: u16 },
}

/// Owns the raw-mode lifecycle and the input-forwarding thread. Two
/// `TerminalDriver`s alive in one process would both fight over stdin/out
/// — this type doesn't enforce that at the OS level, it's a single-owner convention the caller
/// upholds by constructing exactly one.
pub struct TerminalDriver {
    _guard: RawModeGuard,
    pub kitty_keyboard: bool,
    pub cell_pixel_size: Option<(u16, u16)>,
    shutdown: Arc<AtomicBool>,
    reader: Option<std::thread::JoinHandle<()>>,
}

impl TerminalDriver {
    /// Runs the full startup sequence and begins forwarding decoded input
    /// on `events`. `probe_images` gates step 6 (cell pixel size), which is
    /// only worth the round trip when the session might render images.
    pub fn start(
        events: mpsc::UnboundedSender<TerminalEvent>,
        probe_images: bool,
    ) -> Result<Self, TerminalError> {
        let kitty_keyboard = probe_kitty_keyboard().unwrap_or(false);
        let guard = RawModeGuard::install(kitty_keyboard)?;

        let cell_pixel_size = if probe_images {
            probe_cell_pixel_size().unwrap_or(None)
        } else {
            None
        };

        let shutdown = Arc::new(AtomicBool::new(false));
        let reader = spawn_reader(events, shutdown.clone());

        info!(kitty_keyboard, ?cell_pixel_size, "terminal driver started");
        Ok(Self { _guard: guard, kitty_keyboard, cell_pixel_size, shutdown, reader: Some(reader) })
    }

    /// Stops the input-forwarding thread and restores the terminal (the
    /// "suspend" half of suspend/resume; the caller is responsible for sending the process-group
    /// suspend signal and, on resume, calling [`TerminalDriver::start`] again with a full invalidation
    /// of the renderer).
    pub fn suspend(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        // `_guard` drops here, restoring raw mode / bracketed paste / Kitty flags.
    }
}

fn spawn_reader(
    events: mpsc::UnboundedSender<TerminalEvent>,
    shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            match event::poll(POLL_INTERVAL) {
                Ok(true) => {
                    let next = match event::read() {
                        Ok(Event::Key(key)) => Some(TerminalEvent::Key(key)),
                        Ok(Event::Paste(text)) => Some(TerminalEvent::Paste(text)),
                        Ok(Event::Resize(columns, rows)) => Some(TerminalEvent::Resize { columns, rows }),
                        Ok(_) => None,
                        Err(err) => {
                            warn!(%err, "terminal read error, stopping input thread");
                            break;
                        }
                    };
                    if let Some(event) = next {
                        trace!(?event, "forwarding terminal event");
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                }
                Ok(false) => continue,
                Err(err) => {
                    warn!(%err, "terminal poll error, stopping input thread");
                    break;
                }
            }
        }
    })
}
