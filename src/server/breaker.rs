use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

/// Circuit breaker for non-critical read paths. After enough consecutive
/// store failures the circuit opens and reads short-circuit to their
/// empty fallback; one probe is let through per cooldown.
pub struct Breaker {
    failures: AtomicU32,
    threshold: u32,
    cooldown: Duration,
    opened_at: Mutex<Option<Instant>>,
}

impl Default for Breaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

impl Breaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            failures: AtomicU32::new(0),
            threshold,
            cooldown,
            opened_at: Mutex::new(None),
        }
    }
    /// True when the call should hit the store; an open circuit admits a
    /// single probe once the cooldown lapses.
    pub fn allow(&self) -> bool {
        let mut opened = self.opened_at.lock().expect("breaker lock");
        match *opened {
            None => true,
            Some(at) if at.elapsed() >= self.cooldown => {
                *opened = Some(Instant::now());
                true
            }
            Some(_) => false,
        }
    }
    pub fn success(&self) {
        self.failures.store(0, Ordering::Relaxed);
        *self.opened_at.lock().expect("breaker lock") = None;
    }
    pub fn failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.threshold {
            let mut opened = self.opened_at.lock().expect("breaker lock");
            if opened.is_none() {
                log::warn!("[breaker] open after {} consecutive failures", failures);
            }
            *opened = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold() {
        let breaker = Breaker::new(3, Duration::from_secs(60));
        assert!(breaker.allow());
        breaker.failure();
        breaker.failure();
        assert!(breaker.allow());
        breaker.failure();
        assert!(!breaker.allow());
    }
    #[test]
    fn success_resets() {
        let breaker = Breaker::new(2, Duration::from_secs(60));
        breaker.failure();
        breaker.failure();
        assert!(!breaker.allow());
        breaker.success();
        assert!(breaker.allow());
        breaker.failure();
        assert!(breaker.allow());
    }
    #[test]
    fn cooldown_admits_a_probe() {
        let breaker = Breaker::new(1, Duration::from_millis(0));
        breaker.failure();
        // zero cooldown: every check is a probe
        assert!(breaker.allow());
    }
}
