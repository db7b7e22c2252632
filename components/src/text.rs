use kestrel_render::Component;

/// Wrap-free text: the caller guarantees the content already fits `width`; this component only
/// pads, it never wraps or truncates.
#[derive(Debug, Clone)]
pub struct Text {
    content: String,
    pad_left: u16,
    pad_right: u16,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Text { content: content.into(), pad_left: 0, pad_right: 0 }
    }

    pub fn pad_left(mut self, n: u16) -> Self {
        self.pad_left = n;
        self
    }

    pub fn pad_right(mut self, n: u16) -> Self {
        self.pad_right = n;
        self
    }
}

impl Component for Text {
    fn render(&self, _width: u16) -> Vec<String> {
        let left = " ".repeat(self.pad_left as usize);
        let right = " ".repeat(self.pad_right as usize);
        self.content.lines().map(|line| format!("{left}{line}{right}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_each_line() {
        let text = Text::new("a\nb").pad_left(1).pad_right(1);
        assert_eq!(text.render(80), vec![" a ", " b "]);
    }

    #[test]
    fn no_padding_by_default() {
        let text = Text::new("hello");
        assert_eq!(text.render(80), vec!["hello"]);
    }
}
