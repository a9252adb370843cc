//! Per-attachment serialization. An optimize or restore run holds the
//! attachment's lock from its first store read to its last store write.

use crate::attachment::AttachmentId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per attachment id, shared by clones
#[derive(Clone, Default)]
pub struct AttachmentLocks {
    locks: Arc<Mutex<HashMap<AttachmentId, Arc<AsyncMutex<()>>>>>,
}

impl AttachmentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run holds `id`
    pub async fn acquire(&self, id: AttachmentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Drop entries nobody is holding or waiting on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }
}
