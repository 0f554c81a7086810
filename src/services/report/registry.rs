//! Generation Registry
//!
//! Tracks the running generation of each thread so it can be cancelled from
//! another request. At most one generation runs per thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::utils::error::{AppError, AppResult};

#[derive(Debug)]
struct ActiveGeneration {
    generation_id: String,
    token: CancellationToken,
}

/// Registry of running generations keyed by thread id.
#[derive(Debug, Clone, Default)]
pub struct GenerationRegistry {
    inner: Arc<Mutex<HashMap<String, ActiveGeneration>>>,
}

impl GenerationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveGeneration>> {
        // Entries stay consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new generation for `thread_id`.
    ///
    /// Fails with `AppError::Conflict` while another generation of the same
    /// thread is running. The entry is removed when the guard is dropped.
    pub fn register(&self, thread_id: &str) -> AppResult<GenerationGuard> {
        let mut active = self.lock();
        if active.contains_key(thread_id) {
            return Err(AppError::conflict(format!(
                "A report is already being generated for thread {}",
                thread_id
            )));
        }

        let generation_id = uuid::Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        active.insert(
            thread_id.to_string(),
            ActiveGeneration {
                generation_id: generation_id.clone(),
                token: token.clone(),
            },
        );

        Ok(GenerationGuard {
            registry: self.clone(),
            thread_id: thread_id.to_string(),
            generation_id,
            token,
        })
    }

    /// Cancel the running generation of a thread. Returns false if none runs.
    pub fn cancel(&self, thread_id: &str) -> bool {
        match self.lock().get(thread_id) {
            Some(generation) => {
                tracing::info!(
                    thread_id,
                    generation_id = %generation.generation_id,
                    "Cancelling generation"
                );
                generation.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, thread_id: &str) -> bool {
        self.lock().contains_key(thread_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Cancel every running generation (server shutdown).
    pub fn cancel_all(&self) {
        for generation in self.lock().values() {
            generation.token.cancel();
        }
    }
}

/// Registration handle owned by the running generation.
#[derive(Debug)]
pub struct GenerationGuard {
    registry: GenerationRegistry,
    thread_id: String,
    generation_id: String,
    token: CancellationToken,
}

impl GenerationGuard {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn generation_id(&self) -> &str {
        &self.generation_id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let mut active = self.registry.lock();
        let ours = active
            .get(&self.thread_id)
            .is_some_and(|g| g.generation_id == self.generation_id);
        if ours {
            active.remove(&self.thread_id);
        }
    }
}
