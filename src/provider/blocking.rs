use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::ChatError;

/// Lazily built current-thread runtime that drives async provider code for blocking
/// callers.
pub(crate) struct BlockingRuntime {
    runtime: OnceLock<Runtime>,
}

impl BlockingRuntime {
    pub(crate) fn new() -> Self {
        Self {
            runtime: OnceLock::new(),
        }
    }

    /// Runs `future` to completion on the calling thread.
    ///
    /// Fails instead of panicking when called from inside a tokio runtime, where
    /// blocking the worker thread is not allowed.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> Result<F::Output, ChatError> {
        if Handle::try_current().is_ok() {
            return Err(ChatError::transport(
                "blocking call issued from inside an async runtime; use AsyncChatClient instead",
            ));
        }
        let runtime = match self.runtime.get() {
            Some(runtime) => runtime,
            None => {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|err| {
                        ChatError::transport(format!("failed to start blocking runtime: {err}"))
                    })?;
                self.runtime.get_or_init(|| runtime)
            }
        };
        Ok(runtime.block_on(future))
    }
}

impl Drop for BlockingRuntime {
    fn drop(&mut self) {
        // A plain drop panics when the owner is released inside another runtime.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
