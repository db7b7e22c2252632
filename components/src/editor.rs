//! Multi-line input buffer: cursor motion, word-wise motion/delete, history recall, external-editor
//! escape, clipboard image paste, and an autocomplete provider hook. Cursor logic follows the
//! teacher's `InputState` (`app/tui/src/state/ui.rs`) but is indexed by character, not byte, to
//! stay correct on multi-byte input.

use std::io;
use std::process::Command;

use tempfile::NamedTempFile;
use thiserror::Error;

use kestrel_keys::KeyEvent;
use kestrel_render::Component;

use crate::theme::Theme;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no $VISUAL or $EDITOR configured")]
    NoEditorConfigured,
    #[error("external editor exited with a failure status")]
    ExternalEditorFailed,
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What kind of completion popup should be showing, derived from the token
/// under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixKind {
    Slash,
    At,
}

pub trait CompletionProvider: Send {
    fn complete(&self, kind: PrefixKind, query: &str) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Submit(String),
}

pub struct Editor {
    buffer: Vec<char>,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
    theme: Theme,
    placeholder: String,
}

impl Editor {
    pub fn new(theme: Theme) -> Self {
        Editor { buffer: Vec::new(), cursor: 0, history: Vec::new(), history_index: None, theme, placeholder: String::new() }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer = text.chars().collect();
        self.cursor = self.buffer.len();
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn insert_char(&mut self, c: char) {
        self.buffer.insert(self.cursor, c);
        self.cursor += 1;
    }

    /// Inserts `s` at the cursor, one character at a time. Public so a
    /// terminal's bracketed-paste event can land in the buffer without
    /// going through the single-key path.
    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert_char(c);
        }
    }

    fn delete_backward(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.buffer.remove(self.cursor);
        }
    }

    fn delete_forward(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor < self.buffer.len() {
            self.cursor += 1;
        }
    }

    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    fn word_left(&self) -> usize {
        let mut pos = self.cursor;
        while pos > 0 && !Self::is_word_char(self.buffer[pos - 1]) {
            pos -= 1;
        }
        while pos > 0 && Self::is_word_char(self.buffer[pos - 1]) {
            pos -= 1;
        }
        pos
    }

    fn word_right(&self) -> usize {
        let mut pos = self.cursor;
        let len = self.buffer.len();
        while pos < len && !Self::is_word_char(self.buffer[pos]) {
            pos += 1;
        }
        while pos < len && Self::is_word_char(self.buffer[pos]) {
            pos += 1;
        }
        pos
    }

    fn delete_word_backward(&mut self) {
        let target = self.word_left();
        self.buffer.drain(target..self.cursor);
        self.cursor = target;
    }

    fn delete_word_forward(&mut self) {
        let target = self.word_right();
        self.buffer.drain(self.cursor..target);
    }

    fn current_line_bounds(&self) -> (usize, usize) {
        let start = self.buffer[..self.cursor].iter().rposition(|&c| c == '\n').map(|i| i + 1).unwrap_or(0);
        let end = self.buffer[self.cursor..].iter().position(|&c| c == '\n').map(|i| self.cursor + i).unwrap_or(self.buffer.len());
        (start, end)
    }

    fn move_home(&mut self) {
        self.cursor = self.current_line_bounds().0;
    }

    fn move_end(&mut self) {
        self.cursor = self.current_line_bounds().1;
    }

    fn recall_history_previous(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next_index = match self.history_index {
            None => self.history.len() - 1,
            Some(0) => return,
            Some(i) => i - 1,
        };
        self.history_index = Some(next_index);
        self.set_text(&self.history[next_index].clone());
    }

    fn recall_history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(i) if i + 1 < self.history.len() => {
                self.history_index = Some(i + 1);
                self.set_text(&self.history[i + 1].clone());
            }
            Some(_) => {
                self.history_index = None;
                self.set_text("");
            }
        }
    }

    /// Detects a `/` or `@` token under the cursor for autocomplete.
    pub fn current_completion_context(&self) -> Option<(PrefixKind, String)> {
        if self.cursor == 0 {
            return None;
        }
        let before = &self.buffer[..self.cursor];
        let mut start = None;
        for i in (0..before.len()).rev() {
            let c = before[i];
            if c.is_whitespace() {
                break;
            }
            if c == '@' || c == '/' {
                let at_start = i == 0 || before[i - 1].is_whitespace();
                if at_start {
                    start = Some((i, c));
                }
                break;
            }
        }
        let (pos, marker) = start?;
        let query: String = before[pos + 1..].iter().collect();
        let kind = if marker == '@' { PrefixKind::At } else { PrefixKind::Slash };
        Some((kind, query))
    }

    /// Replaces the active completion token (from `pos` through the cursor)
    /// with `replacement`, followed by a trailing space.
    pub fn apply_completion(&mut self, pos_before_cursor: usize, replacement: &str) {
        let start = self.cursor.saturating_sub(pos_before_cursor);
        self.buffer.drain(start..self.cursor);
        self.cursor = start;
        self.insert_str(replacement);
        self.insert_char(' ');
    }

    /// Writes the buffer to a temp file, shells out to `$VISUAL`/`$EDITOR`,
    /// and replaces the buffer with the edited content. The caller is
    /// responsible for suspending/restoring the TUI's raw mode around this
    /// call; this method only owns the subprocess and file handoff.
    pub fn edit_in_external_program(&mut self) -> Result<(), EditorError> {
        let editor = std::env::var("VISUAL").or_else(|_| std::env::var("EDITOR")).map_err(|_| EditorError::NoEditorConfigured)?;
        let mut file = NamedTempFile::new()?;
        std::io::Write::write_all(&mut file, self.text().as_bytes())?;
        let path = file.path().to_path_buf();

        tracing::debug!(%editor, path = %path.display(), "handing buffer to external editor");
        let status = Command::new(&editor).arg(&path).status()?;
        if !status.success() {
            return Err(EditorError::ExternalEditorFailed);
        }
        let edited = std::fs::read_to_string(&path)?;
        self.set_text(edited.trim_end_matches('\n'));
        Ok(())
    }

    /// Reads an image from the system clipboard, encodes it as PNG, writes
    /// it to a temp file, and inserts the resulting path at the cursor.
    pub fn paste_image_from_clipboard(&mut self) -> Result<(), EditorError> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| EditorError::Clipboard(e.to_string()))?;
        let image = clipboard.get_image().map_err(|e| EditorError::Clipboard(e.to_string()))?;

        let buffer = image::RgbaImage::from_raw(image.width as u32, image.height as u32, image.bytes.into_owned())
            .ok_or_else(|| EditorError::Clipboard("clipboard image had an invalid buffer size".to_string()))?;

        let file = tempfile::Builder::new().suffix(".png").tempfile()?;
        let (file, path) = file.keep().map_err(|e| EditorError::Io(e.error))?;
        drop(file);
        image::DynamicImage::ImageRgba8(buffer).save(&path).map_err(|e| EditorError::Clipboard(e.to_string()))?;

        tracing::debug!(path = %path.display(), "pasted clipboard image");
        self.insert_str(&path.display().to_string());
        Ok(())
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<EditorEvent> {
        match event.id.as_str() {
            "enter" => {
                if self.is_empty() {
                    return None;
                }
                let text = self.text();
                self.history.push(text.clone());
                self.history_index = None;
                self.set_text("");
                return Some(EditorEvent::Submit(text));
            }
            "shift+enter" | "ctrl+j" => self.insert_char('\n'),
            "backspace" => self.delete_backward(),
            "ctrl+backspace" | "alt+backspace" => self.delete_word_backward(),
            "delete" => self.delete_forward(),
            "ctrl+delete" | "alt+delete" => self.delete_word_forward(),
            "left" => self.move_left(),
            "right" => self.move_right(),
            "ctrl+left" | "alt+left" => self.cursor = self.word_left(),
            "ctrl+right" | "alt+right" => self.cursor = self.word_right(),
            "home" => self.move_home(),
            "end" => self.move_end(),
            "up" => self.recall_history_previous(),
            "down" => self.recall_history_next(),
            "space" => self.insert_char(' '),
            "tab" => self.insert_char('\t'),
            other => {
                if let Some(c) = single_char(other) {
                    self.insert_char(c);
                }
            }
        }
        None
    }
}

fn single_char(id: &str) -> Option<char> {
    let mut chars = id.chars();
    let first = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(first)
}

impl Component for Editor {
    fn render(&self, _width: u16) -> Vec<String> {
        if self.buffer.is_empty() && !self.placeholder.is_empty() {
            return vec![self.theme.paint(&[self.theme.italic, self.theme.text_dim], &self.placeholder)];
        }
        let text = self.text();
        if text.is_empty() {
            return vec![String::new()];
        }
        text.split('\n').map(|line| line.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use kestrel_keys::{KeyEventKind, KeyId};

    fn key(id: &str) -> KeyEvent {
        KeyEvent { id: KeyId::parse(id).expect("parse"), kind: KeyEventKind::Press }
    }

    #[test]
    fn typing_appends_chars() {
        let mut editor = Editor::new(Theme::default());
        editor.handle_key(&key("h"));
        editor.handle_key(&key("i"));
        assert_eq!(editor.text(), "hi");
    }

    #[test]
    fn enter_emits_submit_and_clears() {
        let mut editor = Editor::new(Theme::default());
        editor.handle_key(&key("h"));
        let event = editor.handle_key(&key("enter"));
        assert_eq!(event, Some(EditorEvent::Submit("h".to_string())));
        assert!(editor.is_empty());
    }

    #[test]
    fn empty_enter_does_not_submit() {
        let mut editor = Editor::new(Theme::default());
        assert_eq!(editor.handle_key(&key("enter")), None);
    }

    #[test]
    fn word_backward_delete_removes_whole_word() {
        let mut editor = Editor::new(Theme::default());
        editor.set_text("hello world");
        editor.handle_key(&key("ctrl+backspace"));
        assert_eq!(editor.text(), "hello ");
    }

    #[test]
    fn history_recall_cycles_back_and_forward() {
        let mut editor = Editor::new(Theme::default());
        editor.set_text("first");
        editor.handle_key(&key("enter"));
        editor.set_text("second");
        editor.handle_key(&key("enter"));
        editor.handle_key(&key("up"));
        assert_eq!(editor.text(), "second");
        editor.handle_key(&key("up"));
        assert_eq!(editor.text(), "first");
        editor.handle_key(&key("down"));
        assert_eq!(editor.text(), "second");
        editor.handle_key(&key("down"));
        assert_eq!(editor.text(), "");
    }

    #[test]
    fn detects_at_mention_token() {
        let mut editor = Editor::new(Theme::default());
        editor.set_text("see @src/ma");
        let (kind, query) = editor.current_completion_context().expect("token");
        assert_eq!(kind, PrefixKind::At);
        assert_eq!(query, "src/ma");
    }

    #[test]
    fn detects_slash_command_token() {
        let mut editor = Editor::new(Theme::default());
        editor.set_text("/comp");
        let (kind, query) = editor.current_completion_context().expect("token");
        assert_eq!(kind, PrefixKind::Slash);
        assert_eq!(query, "comp");
    }

    #[test]
    fn no_token_when_cursor_after_whitespace() {
        let mut editor = Editor::new(Theme::default());
        editor.set_text("@foo ");
        assert_eq!(editor.current_completion_context(), None);
    }

    #[test]
    fn apply_completion_replaces_token_with_trailing_space() {
        let mut editor = Editor::new(Theme::default());
        editor.set_text("see @src/ma");
        let (_, query) = editor.current_completion_context().expect("token");
        editor.apply_completion(query.len(), "src/main.rs");
        assert_eq!(editor.text(), "see @src/main.rs ");
    }
}
