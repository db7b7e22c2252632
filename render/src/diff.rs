//! The differential patch algorithm, points 3-6.

use tracing::error;

use crate::error::WidthViolation;
use crate::width::visible_width;

const SYNC_START: &str = "\x1b[?2026h";
const SYNC_END: &str = "\x1b[?2026l";
const CLEAR_LINE: &str = "\x1b[2K";
const CLEAR_SCREEN_AND_HOME: &str = "\x1b[2J\x1b[H";
const CLEAR_SCROLLBACK: &str = "\x1b[3J";

/// Escape-sequence output of one render pass, ready to hand to
/// `kestrel-terminal` for writing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPass {
    pub output: String,
    pub full_repaint: bool,
}

/// Tracks the previously painted frame so each call to [`Renderer::render`]
/// can emit the smallest possible patch.
pub struct Renderer {
    previous_lines: Vec<String>,
    previous_width: u16,
    rows: u16,
}

impl Renderer {
    pub fn new(rows: u16) -> Self {
        Self { previous_lines: Vec::new(), previous_width: 0, rows }
    }

    pub fn resize_viewport(&mut self, rows: u16) {
        self.rows = rows;
    }

    /// Forces the next `render` call to do a full repaint, e.g. after a
    /// terminal resize or resume-from-suspend.
    pub fn invalidate(&mut self) {
        self.previous_lines.clear();
    }

    /// Runs the full algorithm: width invariant check, diff-or-full-repaint
    /// decision, patch construction, synchronized-output wrapping.
    pub fn render(&mut self, final_lines: Vec<String>, columns: u16) -> Result<RenderPass, WidthViolation> {
        if let Some((line, width)) = first_width_violation(&final_lines, columns) {
            error!(
                line,
                width,
                columns,
                frame = %final_lines.join("\n"),
                "fatal: component rendered a line wider than its frame"
            );
            return Err(WidthViolation { line, width, columns });
        }

        if final_lines == self.previous_lines && columns == self.previous_width {
            return Ok(RenderPass::default());
        }

        let width_changed = columns != self.previous_width;
        let pass = if self.previous_lines.is_empty() || width_changed {
            self.full_repaint(&final_lines, width_changed)
        } else {
            match first_diff_index(&self.previous_lines, &final_lines) {
                None => return Ok(RenderPass::default()),
                Some(k) => {
                    let cursor_row = self.previous_lines.len();
                    let viewport_top = cursor_row.saturating_sub(self.rows.max(1) as usize - 1);
                    if k < viewport_top {
                        self.full_repaint(&final_lines, false)
                    } else {
                        self.patch_from(&final_lines, k)
                    }
                }
            }
        };

        self.previous_lines = final_lines;
        self.previous_width = columns;
        Ok(pass)
    }

    fn full_repaint(&self, final_lines: &[String], clear_scrollback: bool) -> RenderPass {
        let mut out = String::new();
        out.push_str(SYNC_START);
        if clear_scrollback {
            out.push_str(CLEAR_SCROLLBACK);
        }
        out.push_str(CLEAR_SCREEN_AND_HOME);
        push_lines(&mut out, final_lines, 0);
        out.push_str(SYNC_END);
        RenderPass { output: out, full_repaint: true }
    }

    fn patch_from(&self, final_lines: &[String], k: usize) -> RenderPass {
        let mut out = String::new();
        out.push_str(SYNC_START);

        let up = self.previous_lines.len().saturating_sub(1).saturating_sub(k);
        if up > 0 {
            out.push_str(&format!("\x1b[{up}A"));
        }
        out.push('\r');

        for (offset, line) in final_lines[k..].iter().enumerate() {
            out.push_str(CLEAR_LINE);
            out.push_str(line);
            if k + offset + 1 != final_lines.len() {
                out.push_str("\r\n");
            }
        }

        if self.previous_lines.len() > final_lines.len() {
            let extra = self.previous_lines.len() - final_lines.len();
            for _ in 0..extra {
                out.push_str("\r\n");
                out.push_str(CLEAR_LINE);
            }
            out.push_str(&format!("\x1b[{extra}A"));
        }

        out.push_str(SYNC_END);
        RenderPass { output: out, full_repaint: false }
    }
}

fn push_lines(out: &mut String, lines: &[String], skip: usize) {
    for (i, line) in lines.iter().enumerate().skip(skip) {
        out.push_str(line);
        if i + 1 != lines.len() {
            out.push_str("\r\n");
        }
    }
}

fn first_width_violation(lines: &[String], columns: u16) -> Option<(usize, usize)> {
    lines.iter().enumerate().find_map(|(i, line)| {
        let width = visible_width(line);
        (width > columns as usize).then_some((i, width))
    })
}

fn first_diff_index(previous: &[String], next: &[String]) -> Option<usize> {
    let min_len = previous.len().min(next.len());
    for i in 0..min_len {
        if previous[i] != next[i] {
            return Some(i);
        }
    }
    if previous.len() != next.len() {
        Some(min_len)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn first_frame_is_a_full_repaint() {
        let mut renderer = Renderer::new(24);
        let pass = renderer.render(vec!["hello".into()], 80).expect("render");
        assert!(pass.full_repaint);
        assert!(pass.output.contains("hello"));
    }

    #[test]
    fn identical_frame_produces_no_output() {
        let mut renderer = Renderer::new(24);
        renderer.render(vec!["hello".into()], 80).expect("render");
        let pass = renderer.render(vec!["hello".into()], 80).expect("render");
        assert_eq!(pass, RenderPass::default());
    }

    #[test]
    fn width_change_forces_full_repaint_with_scrollback_clear() {
        let mut renderer = Renderer::new(24);
        renderer.render(vec!["hello".into()], 80).expect("render");
        let pass = renderer.render(vec!["hello".into()], 100).expect("render");
        assert!(pass.full_repaint);
        assert!(pass.output.contains("\x1b[3J"));
    }

    #[test]
    fn tail_change_patches_only_the_differing_line() {
        let mut renderer = Renderer::new(24);
        renderer.render(vec!["a".into(), "b".into(), "c".into()], 80).expect("render");
        let pass = renderer.render(vec!["a".into(), "b".into(), "z".into()], 80).expect("render");
        assert!(!pass.full_repaint);
        assert!(pass.output.contains('z'));
        assert!(!pass.output.contains(CLEAR_SCREEN_AND_HOME));
        // Cursor rests on row 2 ("c") after the first paint; rewriting row 2
        // needs zero rows of cursor-up, not one.
        assert!(!pass.output.contains("A\x1b[2K"));
        assert!(pass.output.contains("\r\x1b[2Kz"));
    }

    #[test]
    fn middle_change_moves_cursor_up_by_the_right_row_count() {
        let mut renderer = Renderer::new(24);
        renderer
            .render(vec!["a".into(), "b".into(), "c".into(), "d".into()], 80)
            .expect("render");
        let pass = renderer
            .render(vec!["a".into(), "b".into(), "c2".into(), "d".into()], 80)
            .expect("render");
        assert!(!pass.full_repaint);
        // Cursor rests on row 3 ("d") after the first paint; rewriting row 2
        // ("c") needs exactly one row of cursor-up, landing the column reset
        // and CLEAR_LINE right on the stale "c".
        assert!(pass.output.contains("\x1b[1A\r\x1b[2Kc2"));
    }

    #[test]
    fn change_scrolled_above_viewport_forces_full_repaint() {
        let mut renderer = Renderer::new(2);
        let many: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        renderer.render(many.clone(), 80).expect("render");
        let mut changed = many;
        changed[0] = "changed".into();
        let pass = renderer.render(changed, 80).expect("render");
        assert!(pass.full_repaint);
    }

    #[test]
    fn overlong_line_is_a_fatal_width_violation() {
        let mut renderer = Renderer::new(24);
        let err = renderer.render(vec!["x".repeat(100)], 80).unwrap_err();
        assert_eq!(err.line, 0);
        assert_eq!(err.columns, 80);
    }

    #[test]
    fn shrinking_line_count_clears_the_trailing_lines() {
        let mut renderer = Renderer::new(24);
        renderer.render(vec!["a".into(), "b".into(), "c".into()], 80).expect("render");
        let pass = renderer.render(vec!["a".into()], 80).expect("render");
        assert!(!pass.full_repaint);
        assert!(pass.output.contains(CLEAR_LINE));
    }
}
