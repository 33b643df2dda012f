use crate::ID;

/// Marker for processed-event identifiers.
#[derive(Debug, Clone, Copy)]
pub struct Event;

/// Deterministic identifier of one state-mutating intent. Retries of the
/// same intent derive the same ID, so the per-session log can reject the
/// write path and report the mutation as already processed.
pub type EventId = ID<Event>;

/// Bounded, ordered idempotency log persisted on the session row.
/// Unique IDs in insertion order; oldest evicted first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dedup {
    seen: Vec<EventId>,
}

impl Dedup {
    pub fn contains(&self, id: EventId) -> bool {
        self.seen.contains(&id)
    }
    /// Record an ID, evicting from the front past `cap`. Returns false when
    /// the ID was already present (nothing recorded).
    pub fn remember(&mut self, id: EventId, cap: usize) -> bool {
        if self.contains(id) {
            return false;
        }
        self.seen.push(id);
        let excess = self.seen.len().saturating_sub(cap);
        self.seen.drain(..excess);
        true
    }
    pub fn len(&self) -> usize {
        self.seen.len()
    }
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
    pub fn raw(&self) -> Vec<uuid::Uuid> {
        self.seen.iter().map(|id| id.inner()).collect()
    }
}

impl From<Vec<uuid::Uuid>> for Dedup {
    fn from(raw: Vec<uuid::Uuid>) -> Self {
        Self {
            seen: raw.into_iter().map(ID::from).collect(),
        }
    }
}

impl FromIterator<EventId> for Dedup {
    fn from_iter<I: IntoIterator<Item = EventId>>(iter: I) -> Self {
        Self {
            seen: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PROCESSED_EVENTS;

    #[test]
    fn remembers_once() {
        let mut log = Dedup::default();
        let id = EventId::derived("judge:g:t:landed");
        assert!(log.remember(id, MAX_PROCESSED_EVENTS));
        assert!(!log.remember(id, MAX_PROCESSED_EVENTS));
        assert_eq!(log.len(), 1);
    }
    #[test]
    fn evicts_oldest_first() {
        let mut log = Dedup::default();
        let ids: Vec<EventId> = (0..5).map(|i| EventId::derived(&format!("e{}", i))).collect();
        for id in &ids {
            log.remember(*id, 3);
        }
        assert_eq!(log.len(), 3);
        assert!(!log.contains(ids[0]));
        assert!(!log.contains(ids[1]));
        assert!(log.contains(ids[2]));
        assert!(log.contains(ids[4]));
    }
    #[test]
    fn never_exceeds_cap() {
        let mut log = Dedup::default();
        for i in 0..(MAX_PROCESSED_EVENTS * 2) {
            log.remember(EventId::derived(&format!("e{}", i)), MAX_PROCESSED_EVENTS);
            assert!(log.len() <= MAX_PROCESSED_EVENTS);
        }
    }
    #[test]
    fn round_trips_raw() {
        let mut log = Dedup::default();
        log.remember(EventId::derived("a"), 10);
        log.remember(EventId::derived("b"), 10);
        assert_eq!(Dedup::from(log.raw()), log);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // bounded, unique, and idempotent under arbitrary replays
            #[test]
            fn log_stays_bounded_and_unique(
                seeds in proptest::collection::vec(0u32..64, 0..400),
            ) {
                let mut log = Dedup::default();
                for seed in seeds {
                    let id = EventId::derived(&format!("event-{}", seed));
                    let first = !log.contains(id);
                    prop_assert_eq!(log.remember(id, MAX_PROCESSED_EVENTS), first);
                    prop_assert!(log.len() <= MAX_PROCESSED_EVENTS);
                    prop_assert!(log.contains(id));
                }
                let raw = log.raw();
                let unique: std::collections::HashSet<_> = raw.iter().collect();
                prop_assert_eq!(unique.len(), raw.len());
            }
        }
    }
}
