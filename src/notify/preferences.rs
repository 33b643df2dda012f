use super::Kind;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Suppression window for push and email, in UTC hours. In-app delivery
/// ignores it. An empty window (start == end) never matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl QuietHours {
    pub fn active(&self, now: SystemTime) -> bool {
        let hour = hour_utc(now);
        match self.start_hour.cmp(&self.end_hour) {
            std::cmp::Ordering::Equal => false,
            std::cmp::Ordering::Less => (self.start_hour..self.end_hour).contains(&hour),
            // wraps midnight, e.g. 22..7
            std::cmp::Ordering::Greater => hour >= self.start_hour || hour < self.end_hour,
        }
    }
}

fn hour_utc(now: SystemTime) -> u8 {
    let secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    ((secs / 3600) % 24) as u8
}

/// Per-user delivery preferences. Defaults are permissive, which is also
/// the fallback when the preference row is unreachable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub push_enabled: bool,
    pub email_enabled: bool,
    pub inapp_enabled: bool,
    /// Per-category overrides; a missing entry means enabled.
    pub categories: BTreeMap<String, bool>,
    pub quiet_hours: Option<QuietHours>,
    pub push_token: Option<String>,
    pub email: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            push_enabled: true,
            email_enabled: true,
            inapp_enabled: true,
            categories: BTreeMap::new(),
            quiet_hours: None,
            push_token: None,
            email: None,
        }
    }
}

impl Preferences {
    pub fn category_enabled(&self, kind: Kind) -> bool {
        self.categories.get(kind.as_str()).copied().unwrap_or(true)
    }
    pub fn quiet(&self, now: SystemTime) -> bool {
        self.quiet_hours.map(|q| q.active(now)).unwrap_or(false)
    }
}

/// Only tokens in the provider's expected shape go out the door.
pub fn valid_push_token(token: &str) -> bool {
    token.starts_with("ExponentPushToken[") && token.ends_with(']') && token.len() > 19
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at_hour(hour: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(hour * 3600)
    }

    #[test]
    fn quiet_hours_plain_window() {
        let q = QuietHours {
            start_hour: 9,
            end_hour: 17,
        };
        assert!(!q.active(at_hour(8)));
        assert!(q.active(at_hour(9)));
        assert!(q.active(at_hour(16)));
        assert!(!q.active(at_hour(17)));
    }
    #[test]
    fn quiet_hours_wrap_midnight() {
        let q = QuietHours {
            start_hour: 22,
            end_hour: 7,
        };
        assert!(q.active(at_hour(23)));
        assert!(q.active(at_hour(3)));
        assert!(!q.active(at_hour(12)));
    }
    #[test]
    fn quiet_hours_empty_window_never_matches() {
        let q = QuietHours {
            start_hour: 5,
            end_hour: 5,
        };
        for h in 0..24 {
            assert!(!q.active(at_hour(h)));
        }
    }
    #[test]
    fn defaults_are_permissive() {
        let p = Preferences::default();
        assert!(p.push_enabled && p.email_enabled && p.inapp_enabled);
        assert!(p.category_enabled(Kind::YourTurn));
        assert!(!p.quiet(at_hour(4)));
    }
    #[test]
    fn category_toggle_wins() {
        let mut p = Preferences::default();
        p.categories.insert(String::from("your_turn"), false);
        assert!(!p.category_enabled(Kind::YourTurn));
        assert!(p.category_enabled(Kind::GameOver));
    }
    #[test]
    fn push_token_shape() {
        assert!(valid_push_token("ExponentPushToken[abc123]"));
        assert!(!valid_push_token("ExponentPushToken[]"));
        assert!(!valid_push_token("fcm:abc123"));
    }
}
