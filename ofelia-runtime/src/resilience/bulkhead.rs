use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// A bounded, named semaphore isolating one job's concurrency from another
/// (§4.2). `Execute` blocks until a slot is available; `try_execute`
/// rejects immediately with `BulkheadFull`.
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Default capacity from §4.4 `AddJob`: 3.
    pub fn with_defaults() -> Self {
        Self::new(3)
    }

    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("bulkhead semaphore is never closed");
        f().await
    }

    pub fn try_execute_sync(&self) -> Result<BulkheadGuard<'_>> {
        match self.semaphore.try_acquire() {
            Ok(permit) => Ok(BulkheadGuard { _permit: permit }),
            Err(_) => Err(Error::BulkheadFull),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

pub struct BulkheadGuard<'a> {
    _permit: tokio::sync::SemaphorePermit<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_beyond_capacity() {
        let bulkhead = Bulkhead::new(1);
        let guard = bulkhead.try_execute_sync().unwrap();
        assert!(bulkhead.try_execute_sync().is_err());
        drop(guard);
        assert!(bulkhead.try_execute_sync().is_ok());
    }

    #[tokio::test]
    async fn execute_runs_body_with_slot_held() {
        let bulkhead = Bulkhead::new(2);
        let result = bulkhead.execute(|| async { Ok::<_, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(bulkhead.available_permits(), 2);
    }
}
