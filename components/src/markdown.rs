//! Markdown → ANSI. Parses with `pulldown-cmark` and emits a flat line list styled through an
//! injected [`Theme`], wrapping prose to the render width.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};
use unicode_width::UnicodeWidthStr;

use kestrel_render::Component;

use crate::theme::Theme;

#[derive(Debug, Clone)]
pub struct Markdown {
    src: String,
    theme: Theme,
}

impl Markdown {
    pub fn new(src: impl Into<String>, theme: Theme) -> Self {
        Markdown { src: src.into(), theme }
    }
}

#[derive(Default)]
struct Builder {
    lines: Vec<String>,
    current: String,
    list_depth: usize,
    list_ordinal: Vec<u64>,
    in_code_block: bool,
    code_lang: String,
    blockquote: bool,
    style_stack: Vec<&'static str>,
}

impl Builder {
    fn flush_line(&mut self, theme: &Theme) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
        let _ = theme;
    }

    fn push_styled(&mut self, theme: &Theme, text: &str) {
        if self.style_stack.is_empty() {
            self.current.push_str(text);
        } else {
            self.current.push_str(&theme.paint(&self.style_stack, text));
        }
    }
}

/// Renders to ANSI text, wrapping prose lines to `width` columns (0 disables
/// wrapping, matching `Text`'s wrap-free contract for embedded code blocks).
pub fn render(src: &str, theme: &Theme, width: u16) -> Vec<String> {
    let mut b = Builder::default();
    let parser = Parser::new(src);

    for event in parser {
        match event {
            Event::Start(tag) => start_tag(&mut b, theme, tag),
            Event::End(tag_end) => end_tag(&mut b, theme, tag_end),
            Event::Text(text) => {
                if b.in_code_block {
                    for line in text.split('\n') {
                        b.current.push_str("  │ ");
                        b.current.push_str(&theme.paint(&[theme.text_dim], line));
                        b.lines.push(std::mem::take(&mut b.current));
                    }
                    b.lines.pop();
                } else {
                    b.push_styled(theme, &text);
                }
            }
            Event::Code(code) => {
                b.push_styled(theme, &format!("`{code}`"));
            }
            Event::SoftBreak => b.current.push(' '),
            Event::HardBreak => b.flush_line(theme),
            Event::Rule => {
                b.flush_line(theme);
                b.lines.push(theme.paint(&[theme.border], &"─".repeat(40)));
            }
            _ => {}
        }
    }
    b.flush_line(theme);

    if width == 0 {
        return b.lines;
    }
    b.lines.into_iter().flat_map(|line| wrap_line(&line, width as usize)).collect()
}

fn start_tag(b: &mut Builder, theme: &Theme, tag: Tag) {
    match tag {
        Tag::Heading { level, .. } => {
            b.flush_line(theme);
            let marker = match level {
                HeadingLevel::H1 => "# ",
                HeadingLevel::H2 => "## ",
                _ => "### ",
            };
            b.current.push_str(&theme.paint(&[theme.bold, theme.primary], marker));
            b.style_stack.push(theme.bold);
        }
        Tag::Paragraph => b.flush_line(theme),
        Tag::Emphasis => b.style_stack.push(theme.italic),
        Tag::Strong => b.style_stack.push(theme.bold),
        Tag::BlockQuote(_) => {
            b.flush_line(theme);
            b.blockquote = true;
            b.current.push_str(&theme.paint(&[theme.text_dim], "> "));
        }
        Tag::CodeBlock(kind) => {
            b.flush_line(theme);
            b.in_code_block = true;
            b.code_lang = match kind {
                CodeBlockKind::Fenced(lang) => lang.to_string(),
                CodeBlockKind::Indented => String::new(),
            };
            let label = if b.code_lang.is_empty() {
                "  ┌────".to_string()
            } else {
                format!("  ┌─ {} ────", b.code_lang)
            };
            b.lines.push(theme.paint(&[theme.border], &label));
        }
        Tag::List(start) => {
            b.list_depth += 1;
            b.list_ordinal.push(start.unwrap_or(0));
        }
        Tag::Item => {
            b.flush_line(theme);
            let indent = "  ".repeat(b.list_depth.saturating_sub(1));
            if let Some(n) = b.list_ordinal.last_mut() {
                if *n > 0 {
                    b.current.push_str(&format!("{indent}{n}. "));
                    *n += 1;
                } else {
                    b.current.push_str(&format!("{indent}- "));
                }
            }
        }
        Tag::Link { .. } => b.style_stack.push(theme.accent),
        _ => {}
    }
}

fn end_tag(b: &mut Builder, theme: &Theme, tag: TagEnd) {
    match tag {
        TagEnd::Heading(_) => {
            b.style_stack.pop();
            b.flush_line(theme);
        }
        TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link => {
            b.style_stack.pop();
        }
        TagEnd::Paragraph | TagEnd::Item => b.flush_line(theme),
        TagEnd::BlockQuote(_) => {
            b.flush_line(theme);
            b.blockquote = false;
        }
        TagEnd::CodeBlock => {
            b.flush_line(theme);
            b.in_code_block = false;
            b.lines.push(theme.paint(&[theme.border], "  └────"));
        }
        TagEnd::List(_) => {
            b.list_depth = b.list_depth.saturating_sub(1);
            b.list_ordinal.pop();
        }
        _ => {}
    }
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 || UnicodeWidthStr::width(line) <= width {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    for word in line.split(' ') {
        let word_width = UnicodeWidthStr::width(word);
        let sep = if current.is_empty() { 0 } else { 1 };
        if current_width + sep + word_width > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
            current_width = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_width;
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

impl Component for Markdown {
    fn render(&self, width: u16) -> Vec<String> {
        render(&self.src, &self.theme, width)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn renders_heading_bold() {
        let lines = render("# Title", &Theme::default(), 0);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Title"));
        assert!(lines[0].starts_with("\x1b["));
    }

    #[test]
    fn code_block_gets_border_lines() {
        let lines = render("```rust\nfn main() {}\n```", &Theme::default(), 0);
        assert!(lines[0].contains("rust"));
        assert!(lines.last().expect("at least one line").contains('└'));
    }

    #[test]
    fn wraps_long_paragraph_to_width() {
        let src = "word ".repeat(20);
        let lines = render(&src, &Theme::default(), 10);
        assert!(lines.iter().all(|l| UnicodeWidthStr::width(l.as_str()) <= 10));
    }

    #[test]
    fn unordered_list_items_get_bullets() {
        let lines = render("- one\n- two", &Theme::default(), 0);
        assert!(lines.iter().any(|l| l.contains("- one")));
        assert!(lines.iter().any(|l| l.contains("- two")));
    }
}
