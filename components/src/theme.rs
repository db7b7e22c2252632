//! Read-mostly theme configuration: held by the facade, passed to components by value at
//! construction. A theme change is a full invalidate, never a mutation observed mid-render.

/// ANSI SGR fragments, not full escape sequences — callers wrap with
/// `\x1b[` / `m` themselves via [`Theme::paint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub primary: &'static str,
    pub accent: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub border: &'static str,
    pub text_dim: &'static str,
    pub bold: &'static str,
    pub italic: &'static str,
    pub underline: &'static str,
    pub reset: &'static str,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            primary: "36",
            accent: "35",
            success: "32",
            warning: "33",
            error: "31",
            border: "90",
            text_dim: "90",
            bold: "1",
            italic: "3",
            underline: "4",
            reset: "0",
        }
    }
}

impl Theme {
    /// Wraps `text` in the given SGR code(s), sealed with a reset.
    pub fn paint(&self, codes: &[&str], text: &str) -> String {
        if codes.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{}m{text}\x1b[{}m", codes.join(";"), self.reset)
    }
}
