//! Run control shared between the caller and the workers: cancellation and collaborator
//! access gating.

use crate::ops::CollaboratorAccess;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Cooperative cancellation flag, checked by workers between items.
///
/// Clones share the same flag, so a token handed to another thread can stop a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clears the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Counting semaphore limiting concurrent collaborator calls.
pub(crate) struct Gate {
    permits: Option<(Mutex<usize>, Condvar)>,
}

impl Gate {
    pub(crate) fn new(access: CollaboratorAccess) -> Self {
        Self {
            permits: access
                .permits()
                .map(|n| (Mutex::new(n), Condvar::new())),
        }
    }

    /// Blocks until a permit is free. Unlimited gates return immediately.
    pub(crate) fn acquire(&self) -> Permit<'_> {
        if let Some((count, available)) = &self.permits {
            let mut free = count.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            while *free == 0 {
                free = available
                    .wait(free)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            *free -= 1;
        }
        Permit { gate: self }
    }

    fn release(&self) {
        if let Some((count, available)) = &self.permits {
            let mut free = count.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *free += 1;
            available.notify_one();
        }
    }
}

pub(crate) struct Permit<'a> {
    gate: &'a Gate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let remote = token.clone();

        assert!(!token.is_cancelled());
        remote.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!remote.is_cancelled());
    }

    fn peak_holders(access: CollaboratorAccess, threads: usize) -> usize {
        let gate = Arc::new(Gate::new(access));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let (gate, active, peak) = (gate.clone(), active.clone(), peak.clone());
                thread::spawn(move || {
                    let _permit = gate.acquire();
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn serialized_gate_allows_one_holder() {
        assert_eq!(peak_holders(CollaboratorAccess::Serialized, 4), 1);
    }

    #[test]
    fn pooled_gate_caps_holders_at_pool_size() {
        assert_eq!(peak_holders(CollaboratorAccess::Pooled(2), 6), 2);
        assert_eq!(peak_holders(CollaboratorAccess::Pooled(3), 8), 3);
    }

    #[test]
    fn zero_sized_pool_still_admits_one_holder() {
        assert_eq!(peak_holders(CollaboratorAccess::Pooled(0), 3), 1);
    }

    #[test]
    fn shared_gate_never_blocks() {
        let gate = Gate::new(CollaboratorAccess::Shared);
        let _a = gate.acquire();
        let _b = gate.acquire();
    }
}
