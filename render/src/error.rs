use thiserror::Error;

/// A `visibleWidth(line) > columns` violation is a fatal rendering bug, never a recoverable
/// condition: it means some component lied about respecting its allotted width. The renderer logs a
/// full frame dump via `tracing::error!` before returning this so the caller can abort cleanly
/// instead of corrupting the terminal further.
#[derive(Debug, Error)]
#[error("line {line} has visible width {width}, exceeding the {columns}-column frame")]
pub struct WidthViolation {
    pub line: usize,
    pub width: usize,
    pub columns: u16,
}
