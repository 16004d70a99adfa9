use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

use tracing::trace;
use zkc_prover::{CancellationToken, ProverError};

/// Interval at which a blocked acquire rechecks cancellation
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Byte-denominated admission control shared by the jobs of a prover
#[derive(Debug)]
pub struct MemoryBudget {
    total: u64,
    available: Mutex<u64>,
    released: Condvar,
}

/// Reservation returned by [`MemoryBudget::acquire`], released on drop
#[derive(Debug)]
pub struct MemoryPermit {
    budget: Arc<MemoryBudget>,
    bytes: u64,
}

impl MemoryPermit {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for MemoryPermit {
    fn drop(&mut self) {
        let mut available = self.budget.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available += self.bytes;
        self.budget.released.notify_all();
    }
}

impl MemoryBudget {
    pub fn new(total: u64) -> Arc<Self> {
        Arc::new(Self { total, available: Mutex::new(total), released: Condvar::new() })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn available(&self) -> u64 {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until `bytes` are free. Requests larger than the whole budget fail immediately.
    pub fn acquire(
        self: &Arc<Self>,
        bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<MemoryPermit, ProverError> {
        if bytes > self.total {
            return Err(ProverError::ResourceExhausted { needed: bytes, budget: self.total });
        }
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if cancel.is_cancelled() {
                return Err(ProverError::Cancelled);
            }
            if *available >= bytes {
                *available -= bytes;
                trace!("budget: acquired {} bytes, {} left", bytes, *available);
                return Ok(MemoryPermit { budget: Arc::clone(self), bytes });
            }
            available = self
                .released
                .wait_timeout(available, CANCEL_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
