//! Best-effort duplicate-upload guard. Deliberately process-local: the
//! spec calls this an application-layer guard, not a uniqueness
//! invariant, so a burst that outlives the coalescing window is allowed
//! to create independent documents rather than being queued.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct DuplicateCoalescer {
    window: Duration,
    inflight: Mutex<HashMap<String, Instant>>,
}

impl DuplicateCoalescer {
    pub fn new(window: Duration) -> Self {
        Self { window, inflight: Mutex::new(HashMap::new()) }
    }

    /// Claim `content_hash` for the coalescing window. Returns `false`
    /// (and does not claim) if another request already holds a live
    /// claim for the same hash.
    pub fn try_claim(&self, content_hash: &str) -> bool {
        let now = Instant::now();
        let mut inflight = self.inflight.lock().expect("coalescer mutex poisoned");
        inflight.retain(|_, claimed_at| now.duration_since(*claimed_at) < self.window);

        if inflight.contains_key(content_hash) {
            return false;
        }
        inflight.insert(content_hash.to_string(), now);
        true
    }

    /// Release a claim early, e.g. after the request finished (success
    /// or failure) rather than waiting out the full window.
    pub fn release(&self, content_hash: &str) {
        self.inflight.lock().expect("coalescer mutex poisoned").remove(content_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_within_window_is_rejected() {
        let coalescer = DuplicateCoalescer::new(Duration::from_secs(60));
        assert!(coalescer.try_claim("abc"));
        assert!(!coalescer.try_claim("abc"));
    }

    #[test]
    fn distinct_hashes_claim_independently() {
        let coalescer = DuplicateCoalescer::new(Duration::from_secs(60));
        assert!(coalescer.try_claim("abc"));
        assert!(coalescer.try_claim("def"));
    }

    #[test]
    fn release_frees_the_hash_for_a_new_claim() {
        let coalescer = DuplicateCoalescer::new(Duration::from_secs(60));
        assert!(coalescer.try_claim("abc"));
        coalescer.release("abc");
        assert!(coalescer.try_claim("abc"));
    }

    #[test]
    fn expired_window_lets_a_new_claim_through() {
        let coalescer = DuplicateCoalescer::new(Duration::from_millis(1));
        assert!(coalescer.try_claim("abc"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(coalescer.try_claim("abc"));
    }
}
