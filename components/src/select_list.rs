//! Fuzzy-filtered selection list: arrows move the cursor, Enter emits the chosen item, Escape
//! cancels. Filtering uses `nucleo`'s synchronous matcher.

use nucleo::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo::{Matcher, Utf32Str};

use kestrel_keys::{KeyEvent, KeyId};
use kestrel_render::Component;

use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectListEvent {
    Chosen(usize),
    Cancelled,
}

pub struct SelectList {
    items: Vec<String>,
    query: String,
    filtered: Vec<(usize, u32)>,
    cursor: usize,
    theme: Theme,
    matcher: Matcher,
}

impl SelectList {
    pub fn new(items: Vec<String>, theme: Theme) -> Self {
        let mut list = SelectList {
            filtered: Vec::new(),
            items,
            query: String::new(),
            cursor: 0,
            theme,
            matcher: Matcher::new(nucleo::Config::DEFAULT),
        };
        list.refilter();
        list
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The index into the original `items` list that the cursor rests on,
    /// if anything currently matches.
    pub fn selected(&self) -> Option<usize> {
        self.filtered.get(self.cursor).map(|(idx, _)| *idx)
    }

    fn refilter(&mut self) {
        if self.query.is_empty() {
            self.filtered = (0..self.items.len()).map(|i| (i, 0)).collect();
        } else {
            let pattern = Pattern::new(&self.query, CaseMatching::Smart, Normalization::Smart, AtomKind::Fuzzy);
            let mut scored = Vec::new();
            for (idx, item) in self.items.iter().enumerate() {
                let mut buf = Vec::new();
                let haystack = Utf32Str::new(item, &mut buf);
                if let Some(score) = pattern.score(haystack, &mut self.matcher) {
                    scored.push((idx, score));
                }
            }
            scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| self.items[a.0].cmp(&self.items[b.0])));
            self.filtered = scored;
        }
        self.cursor = 0;
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<SelectListEvent> {
        let id = event.id.as_str();
        match id {
            "escape" => return Some(SelectListEvent::Cancelled),
            "enter" => return self.selected().map(SelectListEvent::Chosen),
            "up" => {
                self.cursor = self.cursor.saturating_sub(1);
                return None;
            }
            "down" => {
                if self.cursor + 1 < self.filtered.len() {
                    self.cursor += 1;
                }
                return None;
            }
            "backspace" => {
                self.query.pop();
                self.refilter();
                return None;
            }
            _ => {}
        }
        if let Some(ch) = single_char(&event.id) {
            self.query.push(ch);
            self.refilter();
        }
        None
    }
}

fn single_char(id: &KeyId) -> Option<char> {
    let s = id.as_str();
    let mut chars = s.chars();
    let first = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(first)
}

impl Component for SelectList {
    fn render(&self, width: u16) -> Vec<String> {
        let mut lines = vec![self.theme.paint(&[self.theme.text_dim], &format!("> {}", self.query))];
        for (row, (idx, _)) in self.filtered.iter().enumerate() {
            let label = &self.items[*idx];
            let label = if label.len() > width as usize && width > 0 { &label[..width as usize] } else { label.as_str() };
            if row == self.cursor {
                lines.push(self.theme.paint(&[self.theme.bold, self.theme.primary], &format!("> {label}")));
            } else {
                lines.push(format!("  {label}"));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use kestrel_keys::KeyEventKind;

    fn key(id: &str) -> KeyEvent {
        KeyEvent { id: KeyId::parse(id).expect("parse"), kind: KeyEventKind::Press }
    }

    #[test]
    fn starts_with_all_items_visible() {
        let list = SelectList::new(vec!["alpha".into(), "beta".into()], Theme::default());
        assert_eq!(list.selected(), Some(0));
    }

    #[test]
    fn typing_narrows_to_fuzzy_matches() {
        let mut list = SelectList::new(vec!["alpha".into(), "beta".into()], Theme::default());
        list.handle_key(&key("b"));
        assert_eq!(list.selected(), Some(1));
    }

    #[test]
    fn enter_emits_chosen_index() {
        let mut list = SelectList::new(vec!["alpha".into(), "beta".into()], Theme::default());
        assert_eq!(list.handle_key(&key("enter")), Some(SelectListEvent::Chosen(0)));
    }

    #[test]
    fn escape_cancels() {
        let mut list = SelectList::new(vec!["alpha".into()], Theme::default());
        assert_eq!(list.handle_key(&key("escape")), Some(SelectListEvent::Cancelled));
    }

    #[test]
    fn down_does_not_overrun_filtered_list() {
        let mut list = SelectList::new(vec!["alpha".into()], Theme::default());
        list.handle_key(&key("down"));
        assert_eq!(list.selected(), Some(0));
    }
}
