use tokio::sync::{Semaphore, SemaphorePermit};

/// Counting permit pool. A pool built without a maximum (or with zero) never blocks.
#[derive(Debug)]
pub struct PermitPool {
    max: Option<usize>,
    semaphore: Option<Semaphore>,
}

/// Held while a request is outstanding; dropping it returns the permit.
#[derive(Debug)]
pub struct Permit<'a> {
    _inner: Option<SemaphorePermit<'a>>,
}

impl PermitPool {
    pub fn new(max: Option<usize>) -> Self {
        let max = max.filter(|&max| max > 0);
        Self {
            max,
            semaphore: max.map(Semaphore::new),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub async fn acquire(&self) -> Permit<'_> {
        let inner = match &self.semaphore {
            // the semaphore is never closed, so acquisition only fails if that changes
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        Permit { _inner: inner }
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn available(&self) -> Option<usize> {
        self.semaphore
            .as_ref()
            .map(|semaphore| semaphore.available_permits())
    }
}

impl Default for PermitPool {
    fn default() -> Self {
        Self::unlimited()
    }
}
