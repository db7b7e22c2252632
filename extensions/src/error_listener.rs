//! Where a handler's "throw" goes.

pub trait ErrorListener: Send + Sync {
    fn on_handler_error(&self, extension_path: &str, event: &str, message: &str);
}

/// The default listener: routes every handler error through `tracing`.
pub struct TracingErrorListener;

impl ErrorListener for TracingErrorListener {
    fn on_handler_error(&self, extension_path: &str, event: &str, message: &str) {
        tracing::error!(extension = extension_path, event, message, "extension handler failed");
    }
}
