//! Terminal capability probes.

use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::time::Duration;

/// Spec-mandated probe timeout: if no reply lands within this window, treat
/// the capability as absent.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Probes Kitty keyboard protocol support. Crossterm already implements the
/// exact handshake describes (write the query, read the reply with a timeout) to answer this
/// question, so we reuse it rather than re-parsing `ESC[?<flags>u` ourselves.
pub fn probe_kitty_keyboard() -> io::Result<bool> {
    crossterm::terminal::supports_keyboard_enhancement()
}

/// Probes the terminal's cell pixel size (`ESC[16t` → `ESC[6;<h>;<w>t`).
/// Crossterm has no built-in query for this one, so the reply is read
/// directly off stdin on a dedicated thread with the same 100ms budget.
pub fn probe_cell_pixel_size() -> io::Result<Option<(u16, u16)>> {
    let mut stdout = io::stdout();
    write!(stdout, "\x1b[16t")?;
    stdout.flush()?;
    let reply = read_raw_reply(PROBE_TIMEOUT)?;
    Ok(parse_cell_pixel_reply(&reply))
}

/// Reads one raw burst of bytes from stdin, or an empty vec if nothing
/// arrives within `timeout`. The reader thread is deliberately leaked if it
/// times out: a blocking `read` has no portable cancellation, and by the
/// time this probe is called the driver hasn't yet started forwarding
/// decoded key events, so a stray read landing later is harmless.
fn read_raw_reply(timeout: Duration) -> io::Result<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = [0u8; 64];
        if let Ok(n) = io::stdin().read(&mut buf) {
            let _ = tx.send(buf[..n].to_vec());
        }
    });
    Ok(rx.recv_timeout(timeout).unwrap_or_default())
}

fn parse_cell_pixel_reply(bytes: &[u8]) -> Option<(u16, u16)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let body = text.strip_prefix("\x1b[6;")?.strip_suffix('t')?;
    let mut parts = body.splitn(2, ';');
    let height: u16 = parts.next()?.parse().ok()?;
    let width: u16 = parts.next()?.parse().ok()?;
    Some((height, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        assert_eq!(parse_cell_pixel_reply(b"\x1b[6;20;10t"), Some((20, 10)));
    }

    #[test]
    fn rejects_malformed_reply() {
        assert_eq!(parse_cell_pixel_reply(b"garbage"), None);
        assert_eq!(parse_cell_pixel_reply(b"\x1b[6;20t"), None);
    }

    #[test]
    fn rejects_empty_reply() {
        assert_eq!(parse_cell_pixel_reply(b""), None);
    }
}
