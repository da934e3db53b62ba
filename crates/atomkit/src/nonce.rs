//! Nonce sources for freshly created particles.
//!
//! Particles are identified by content, so two transfers of the same amount
//! to the same owner would collide without a distinguishing nonce. A source
//! is handed to the compiler explicitly; there is no global generator.

use std::sync::atomic::{AtomicI64, Ordering};

use rand::Rng;

/// Supplies nonces for new particles.
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> i64;
}

/// Random nonces from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNonces;

impl NonceSource for RandomNonces {
    fn next_nonce(&self) -> i64 {
        rand::thread_rng().gen()
    }
}

/// Counting nonces. Deterministic, for tests and reproducible builds.
#[derive(Debug, Default)]
pub struct SequentialNonces {
    next: AtomicI64,
}

impl SequentialNonces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl NonceSource for SequentialNonces {
    fn next_nonce(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_counts_up() {
        let nonces = SequentialNonces::starting_at(5);
        assert_eq!(nonces.next_nonce(), 5);
        assert_eq!(nonces.next_nonce(), 6);
        assert_eq!(nonces.next_nonce(), 7);
    }

    #[test]
    fn test_random_nonces_differ() {
        let nonces = RandomNonces;
        let drawn: std::collections::HashSet<_> = (0..16).map(|_| nonces.next_nonce()).collect();
        assert!(drawn.len() > 1);
    }
}
