//! Overlay-first popups: command palette, model picker, session browser, help. Each wraps a
//! [`SelectList`] or [`Markdown`] component plus the side table needed to turn a chosen index back
//! into a concrete value.

use std::path::PathBuf;

use kestrel_components::{Markdown, SelectList, SelectListEvent, Theme};
use kestrel_keys::KeyEvent;
use kestrel_protocol::Model;
use kestrel_render::Component;

pub enum Overlay {
    CommandPalette { list: SelectList, names: Vec<String> },
    ModelPicker { list: SelectList, models: Vec<Model> },
    SessionBrowser { list: SelectList, paths: Vec<PathBuf> },
    Help(Markdown),
}

pub enum OverlayOutcome {
    Cancelled,
    CommandChosen(String),
    ModelChosen(Model),
    SessionChosen(PathBuf),
}

const HELP_TEXT: &str = "\
# Keyboard shortcuts

- `ctrl+k` command palette
- `ctrl+p` session browser
- `shift+ctrl+p` model picker
- `ctrl+o` new session
- `ctrl+t` session tree overview
- `ctrl+l` full redraw
- `shift+tab` cycle steering mode
- `alt+enter` insert newline
- `!cmd` run a shell command, `!!cmd` run without adding it to context
- `ctrl+c` interrupt the running turn, twice within 500ms to exit
- `ctrl+d` exit on an empty prompt
";

impl Overlay {
    pub fn command_palette(names: Vec<String>, theme: Theme) -> Self {
        let list = SelectList::new(names.clone(), theme);
        Overlay::CommandPalette { list, names }
    }

    pub fn model_picker(models: Vec<Model>, theme: Theme) -> Self {
        let labels = models.iter().map(|m| format!("{} ({})", m.name, m.key())).collect();
        let list = SelectList::new(labels, theme);
        Overlay::ModelPicker { list, models }
    }

    pub fn session_browser(paths: Vec<PathBuf>, theme: Theme) -> Self {
        let labels = paths.iter().map(|p| p.display().to_string()).collect();
        let list = SelectList::new(labels, theme);
        Overlay::SessionBrowser { list, paths }
    }

    pub fn help(theme: Theme) -> Self {
        Overlay::Help(Markdown::new(HELP_TEXT, theme))
    }

    /// A dismissible read-only panel for arbitrary markdown, e.g. the tree
    /// overview rendered by `/tree`.
    pub fn text(body: impl Into<String>, theme: Theme) -> Self {
        Overlay::Help(Markdown::new(body.into(), theme))
    }

    pub fn render(&self, width: u16) -> Vec<String> {
        match self {
            Overlay::CommandPalette { list, .. } => list.render(width),
            Overlay::ModelPicker { list, .. } => list.render(width),
            Overlay::SessionBrowser { list, .. } => list.render(width),
            Overlay::Help(markdown) => markdown.render(width),
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<OverlayOutcome> {
        match self {
            Overlay::CommandPalette { list, names } => match list.handle_key(event)? {
                SelectListEvent::Cancelled => Some(OverlayOutcome::Cancelled),
                SelectListEvent::Chosen(index) => names.get(index).cloned().map(OverlayOutcome::CommandChosen),
            },
            Overlay::ModelPicker { list, models } => match list.handle_key(event)? {
                SelectListEvent::Cancelled => Some(OverlayOutcome::Cancelled),
                SelectListEvent::Chosen(index) => models.get(index).cloned().map(OverlayOutcome::ModelChosen),
            },
            Overlay::SessionBrowser { list, paths } => match list.handle_key(event)? {
                SelectListEvent::Cancelled => Some(OverlayOutcome::Cancelled),
                SelectListEvent::Chosen(index) => paths.get(index).cloned().map(OverlayOutcome::SessionChosen),
            },
            Overlay::Help(_) => match event.id.as_str() {
                "escape" | "enter" => Some(OverlayOutcome::Cancelled),
                _ => None,
            },
        }
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
    fn command_palette_resolves_chosen_name() {
        let mut overlay = Overlay::command_palette(vec!["model".into(), "sessions".into()], Theme::default());
        let outcome = overlay.handle_key(&key("enter"));
        assert!(matches!(outcome, Some(OverlayOutcome::CommandChosen(name)) if name == "model"));
    }

    #[test]
    fn help_closes_on_escape() {
        let mut overlay = Overlay::help(Theme::default());
        assert!(matches!(overlay.handle_key(&key("escape")), Some(OverlayOutcome::Cancelled)));
    }
}
