//! Crossterm `KeyEvent` → canonical [`KeyEvent`].

use crossterm::event::{KeyCode, KeyEvent as CtKeyEvent, KeyEventKind as CtKeyEventKind, KeyModifiers as CtModifiers};

use crate::key_id::{KeyId, Modifiers};

/// `press`/`repeat`/`release`, as reported by the Kitty keyboard protocol.
/// Non-Kitty input is always `Press`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Press,
    Repeat,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub id: KeyId,
    pub kind: KeyEventKind,
}

/// Decodes one crossterm key event. `kitty_enabled` reflects whether
/// `kestrel-terminal` negotiated the enhancement flags; without them every
/// event is reported as `Press` regardless of what crossterm set.
///
/// Returns `None` for keys with no canonical representation (e.g. bare
/// modifier presses, media keys) — there is nothing for a component to
/// bind to.
pub fn decode(event: CtKeyEvent, kitty_enabled: bool) -> Option<KeyEvent> {
    let mut modifiers = Modifiers {
        shift: event.modifiers.contains(CtModifiers::SHIFT),
        ctrl: event.modifiers.contains(CtModifiers::CONTROL),
        alt: event.modifiers.contains(CtModifiers::ALT),
    };
    // BackTab is how most terminals report Shift+Tab; the modifier isn't
    // always set on the KeyEvent itself.
    if matches!(event.code, KeyCode::BackTab) {
        modifiers.shift = true;
    }

    let key = key_name(event.code)?;
    let id = KeyId::build(modifiers, &key);

    let kind = if kitty_enabled {
        match event.kind {
            CtKeyEventKind::Press => KeyEventKind::Press,
            CtKeyEventKind::Repeat => KeyEventKind::Repeat,
            CtKeyEventKind::Release => KeyEventKind::Release,
        }
    } else {
        KeyEventKind::Press
    };

    Some(KeyEvent { id, kind })
}

fn key_name(code: KeyCode) -> Option<String> {
    Some(match code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_lowercase().to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "escape".to_string(),
        KeyCode::Tab | KeyCode::BackTab => "tab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn plain_char_has_no_modifiers() {
        let event = CtKeyEvent::new(KeyCode::Char('a'), CtModifiers::NONE);
        let decoded = decode(event, false).expect("decodes");
        assert_eq!(decoded.id.as_str(), "a");
        assert_eq!(decoded.kind, KeyEventKind::Press);
    }

    #[test]
    fn ctrl_c_decodes_to_reserved_id() {
        let event = CtKeyEvent::new(KeyCode::Char('c'), CtModifiers::CONTROL);
        let decoded = decode(event, false).expect("decodes");
        assert_eq!(decoded.id.as_str(), "ctrl+c");
    }

    #[test]
    fn backtab_is_reported_as_shift_tab() {
        let event = CtKeyEvent::new(KeyCode::BackTab, CtModifiers::NONE);
        let decoded = decode(event, false).expect("decodes");
        assert_eq!(decoded.id.as_str(), "shift+tab");
    }

    #[test]
    fn release_without_kitty_is_reported_as_press() {
        let mut event = CtKeyEvent::new(KeyCode::Char('a'), CtModifiers::NONE);
        event.kind = CtKeyEventKind::Release;
        let decoded = decode(event, false).expect("decodes");
        assert_eq!(decoded.kind, KeyEventKind::Press);
    }

    #[test]
    fn release_with_kitty_enabled_is_reported_as_release() {
        let mut event = CtKeyEvent::new(KeyCode::Char('a'), CtModifiers::NONE);
        event.kind = CtKeyEventKind::Release;
        let decoded = decode(event, true).expect("decodes");
        assert_eq!(decoded.kind, KeyEventKind::Release);
    }

    #[test]
    fn function_keys_decode_by_number() {
        let event = CtKeyEvent::new(KeyCode::F(1), CtModifiers::NONE);
        let decoded = decode(event, false).expect("decodes");
        assert_eq!(decoded.id.as_str(), "f1");
    }
}
