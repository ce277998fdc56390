//! Admission control for concurrent transfers.
//!
//! The [`ConcurrencyGate`] bounds how many transfers perform network I/O at
//! the same time. It is a thin layer over [`tokio::sync::Semaphore`], which
//! serves waiters in FIFO order, so no acquirer starves while slots are
//! released to later arrivals.
//!
//! # Examples
//!
//! ```rust
//! use haul::gate::ConcurrencyGate;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> haul::Result<()> {
//! let gate = ConcurrencyGate::new(2);
//! let token = CancellationToken::new();
//!
//! let permit = gate.acquire(&token).await?;
//! assert_eq!(gate.available(), 1);
//! drop(permit);
//! assert_eq!(gate.available(), 2);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Slots {
    /// Configured capacity.
    capacity: usize,
    /// Slots still held by in-flight permits that must be retired on release.
    debt: usize,
}

/// A counting admission controller with a runtime-adjustable capacity.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    slots: Arc<Mutex<Slots>>,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` holders.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            slots: Arc::new(Mutex::new(Slots { capacity, debt: 0 })),
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Number of slots free right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot.
    ///
    /// Returns [`Error::Cancelled`] without admitting the caller when `cancel`
    /// is already cancelled or fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => permit
                .map_err(|_| Error::Internal("concurrency gate closed".into()))?,
        };
        Ok(GatePermit {
            permit: Some(permit),
            slots: self.slots.clone(),
        })
    }

    /// Change the capacity for future acquisitions.
    ///
    /// Holders admitted under the previous capacity keep their slot; when
    /// shrinking below the number of holders, the surplus is retired as they
    /// release.
    pub fn set_capacity(&self, capacity: usize) {
        let mut slots = self.lock();
        if capacity >= slots.capacity {
            let mut grow = capacity - slots.capacity;
            let repaid = grow.min(slots.debt);
            slots.debt -= repaid;
            grow -= repaid;
            self.semaphore.add_permits(grow);
        } else {
            let shrink = slots.capacity - capacity;
            let removed = self.semaphore.forget_permits(shrink);
            slots.debt += shrink - removed;
        }
        slots.capacity = capacity;
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A slot in a [`ConcurrencyGate`], released on drop.
#[derive(Debug)]
pub struct GatePermit {
    permit: Option<OwnedSemaphorePermit>,
    slots: Arc<Mutex<Slots>>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if slots.debt > 0 {
            slots.debt -= 1;
            permit.forget();
        } else {
            // Released under the lock so a concurrent shrink sees the slot.
            drop(permit);
        }
        drop(slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_capacity() {
        let gate = ConcurrencyGate::new(3);
        let token = CancellationToken::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let gate = gate.clone();
            let token = token.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire(&token).await.unwrap();
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate.available(), 3);
    }

    #[tokio::test]
    async fn test_waiters_are_served_in_order() {
        let gate = ConcurrencyGate::new(1);
        let token = CancellationToken::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let held = gate.acquire(&token).await.unwrap();
        let mut handles = Vec::new();
        for i in 0..5 {
            let gate = gate.clone();
            let token = token.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire(&token).await.unwrap();
                order.lock().unwrap().push(i);
            }));
            // Let each waiter enqueue before the next one arrives.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_cancelled_while_waiting() {
        let gate = ConcurrencyGate::new(1);
        let token = CancellationToken::new();
        let _held = gate.acquire(&token).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.acquire(&token).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_token_wins_over_free_slot() {
        let gate = ConcurrencyGate::new(4);
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(gate.acquire(&token).await, Err(Error::Cancelled)));
        assert_eq!(gate.available(), 4);
    }

    #[tokio::test]
    async fn test_grow_capacity() {
        let gate = ConcurrencyGate::new(1);
        gate.set_capacity(3);
        assert_eq!(gate.capacity(), 3);
        assert_eq!(gate.available(), 3);
    }

    #[tokio::test]
    async fn test_shrink_leaves_holders_alone() {
        let gate = ConcurrencyGate::new(3);
        let token = CancellationToken::new();
        let a = gate.acquire(&token).await.unwrap();
        let b = gate.acquire(&token).await.unwrap();

        gate.set_capacity(1);
        assert_eq!(gate.capacity(), 1);
        assert_eq!(gate.available(), 0);

        // First release pays back the surplus slot.
        drop(a);
        assert_eq!(gate.available(), 0);
        drop(b);
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn test_release_racing_shrink_never_overshoots() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let token = CancellationToken::new();
        for _ in 0..2000 {
            let gate = ConcurrencyGate::new(2);
            let a = rt.block_on(gate.acquire(&token)).unwrap();
            let b = rt.block_on(gate.acquire(&token)).unwrap();

            let releaser = std::thread::spawn(move || drop(a));
            let shrinker = {
                let gate = gate.clone();
                std::thread::spawn(move || gate.set_capacity(1))
            };
            releaser.join().unwrap();
            shrinker.join().unwrap();

            // `b` still holds the only slot of a capacity-1 gate.
            assert_eq!(gate.available(), 0);
            drop(b);
            assert_eq!(gate.available(), 1);
        }
    }

    #[tokio::test]
    async fn test_grow_after_shrink_repays_debt() {
        let gate = ConcurrencyGate::new(2);
        let token = CancellationToken::new();
        let a = gate.acquire(&token).await.unwrap();
        let b = gate.acquire(&token).await.unwrap();

        gate.set_capacity(0);
        gate.set_capacity(3);
        assert_eq!(gate.available(), 1);

        drop(a);
        drop(b);
        assert_eq!(gate.available(), 3);
    }
}
