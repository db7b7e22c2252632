//! Animated spinner: cooperatively redraws on a fixed schedule via `tokio::time::interval`, rather
//! than owning its own thread.

use std::time::Duration;

use kestrel_render::Component;

use crate::theme::Theme;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub const TICK: Duration = Duration::from_millis(80);

pub struct Loader {
    label: String,
    frame: usize,
    theme: Theme,
}

impl Loader {
    pub fn new(label: impl Into<String>, theme: Theme) -> Self {
        Loader { label: label.into(), frame: 0, theme }
    }

    /// Advances to the next spinner frame; called by the caller's interval
    /// tick, not scheduled by the component itself.
    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % FRAMES.len();
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
}

impl Component for Loader {
    fn render(&self, _width: u16) -> Vec<String> {
        let glyph = self.theme.paint(&[self.theme.primary], FRAMES[self.frame]);
        vec![format!("{glyph} {}", self.label)]
    }

    fn invalidate(&mut self) {
        self.frame = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_cycles_through_frames() {
        let mut loader = Loader::new("Thinking", Theme::default());
        for _ in 0..FRAMES.len() {
            loader.tick();
        }
        assert_eq!(loader.frame, 0);
    }

    #[test]
    fn render_includes_label() {
        let loader = Loader::new("Thinking", Theme::default());
        assert!(loader.render(80)[0].contains("Thinking"));
    }
}
