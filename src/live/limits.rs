use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

/// Sliding-window budget for one event kind.
#[derive(Debug, Clone, Copy)]
struct Budget {
    count: u32,
    window: Duration,
}

/// Per-socket rate limiter. Lives and dies with the socket, so a plain
/// in-process map is enough; nothing here is authoritative for state.
#[derive(Debug)]
pub struct RateLimits {
    budgets: HashMap<&'static str, Budget>,
    stamps: HashMap<&'static str, VecDeque<Instant>>,
}

impl Default for RateLimits {
    fn default() -> Self {
        let minute = Duration::from_secs(60);
        let budgets = HashMap::from([
            ("game:create", Budget { count: 3, window: minute }),
            ("game:join", Budget { count: 5, window: minute }),
            ("game:trick", Budget { count: 10, window: minute }),
            ("game:pass", Budget { count: 10, window: minute }),
            ("game:forfeit", Budget { count: 3, window: minute }),
            ("game:reconnect", Budget { count: 5, window: minute }),
        ]);
        Self {
            budgets,
            stamps: HashMap::new(),
        }
    }
}

impl RateLimits {
    /// Record one attempt; false when the event's budget for the trailing
    /// window is spent. Unbudgeted events always pass.
    pub fn allow(&mut self, event: &'static str, now: Instant) -> bool {
        let Some(budget) = self.budgets.get(event).copied() else {
            return true;
        };
        let stamps = self.stamps.entry(event).or_default();
        while stamps
            .front()
            .map(|t| now.duration_since(*t) >= budget.window)
            .unwrap_or(false)
        {
            stamps.pop_front();
        }
        if stamps.len() as u32 >= budget.count {
            return false;
        }
        stamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exhausts_and_recovers() {
        let mut limits = RateLimits::default();
        let t = Instant::now();
        for _ in 0..3 {
            assert!(limits.allow("game:create", t));
        }
        assert!(!limits.allow("game:create", t));
        // window slides past the oldest stamp
        assert!(limits.allow("game:create", t + Duration::from_secs(61)));
    }
    #[test]
    fn budgets_are_per_event() {
        let mut limits = RateLimits::default();
        let t = Instant::now();
        for _ in 0..3 {
            assert!(limits.allow("game:create", t));
        }
        assert!(limits.allow("game:join", t));
    }
    #[test]
    fn unbudgeted_events_pass() {
        let mut limits = RateLimits::default();
        let t = Instant::now();
        for _ in 0..100 {
            assert!(limits.allow("presence:update", t));
        }
    }
}
