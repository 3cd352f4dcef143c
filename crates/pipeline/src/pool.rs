//! Bounded concurrency for shared model collaborators
//!
//! ASR, TTS, and LLM backends are long-lived singletons shared by every
//! session. They are not safe for unlimited concurrent invocation, so all
//! calls acquire a permit first; excess callers queue rather than fail.

use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

#[derive(Clone)]
pub struct InferencePool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl InferencePool {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            capacity: max_concurrent.max(1),
        }
    }

    /// Wait for a slot. The returned permit releases on drop.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        // The semaphore is never closed, so acquire cannot fail
        match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("inference pool semaphore closed"),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently free slots, for diagnostics
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
