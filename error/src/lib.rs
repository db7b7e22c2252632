//! Shared error type for crates that don't need a bespoke enum.
//!
//! Most crates in the workspace define their own `thiserror` enum scoped to
//! their own failure modes. This crate holds the few error shapes genuinely
//! shared across crate boundaries (cancellation, "not found", io wrapping)
//! so they aren't redefined five times.

use std::fmt;

/// A generic, cross-crate error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("operation was cancelled")]
    Cancelled,

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Marker for operations that can be interrupted by a cancellation token.
///
/// Implemented by the handful of result types that need to distinguish
/// "cancelled" from "failed" without collapsing both into `Error::Cancelled`,
/// e.g. a turn's `stop_reason` vs. a hard provider error.
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;
}

/// Wraps a display-only context string onto an arbitrary error, the way the
/// teacher's driver wraps provider errors with `anyhow::anyhow!("...: {e}")`
/// at call sites. Kept tiny and `anyhow`-free so library crates don't need
/// to pull in `anyhow` just to add a breadcrumb.
pub fn context<E: fmt::Display>(msg: &str, err: E) -> Error {
    Error::Other(format!("{msg}: {err}"))
}
