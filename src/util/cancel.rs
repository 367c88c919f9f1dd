//! Cooperative cancellation shared between the Ctrl-C handler and builds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flag checked between pipeline stages and between matrix cells.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel this token when the user presses Ctrl-C.
    ///
    /// Only one handler can be installed per process; a second attempt is
    /// logged and otherwise ignored.
    pub fn cancel_on_ctrlc(&self) {
        let token = self.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("\nCancelling after the running stage...");
            token.cancel();
        }) {
            tracing::debug!("could not install Ctrl-C handler: {}", e);
        }
    }
}
