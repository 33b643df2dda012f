use super::*;
use crate::duel::PlayerId;
use crate::pg::*;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_postgres::Client;

/// Which channels one notification goes out on. `None` when the category
/// is disabled outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub inapp: bool,
    pub push: bool,
    pub email: bool,
}

/// Channel routing, separated from delivery so it can be pinned down in
/// tests. In-app ignores quiet hours; push needs a well-formed token;
/// email is reserved for high-value kinds.
pub fn plan(kind: Kind, prefs: &Preferences, now: SystemTime) -> Option<Plan> {
    if !prefs.category_enabled(kind) {
        return None;
    }
    let quiet = prefs.quiet(now);
    Some(Plan {
        inapp: prefs.inapp_enabled,
        push: !quiet
            && prefs.push_enabled
            && prefs
                .push_token
                .as_deref()
                .map(valid_push_token)
                .unwrap_or(false),
        email: !quiet && kind.high_value() && prefs.email_enabled && prefs.email.is_some(),
    })
}

/// Preference lookup with permissive defaults when the row is missing or
/// the store is unreachable.
#[allow(async_fn_in_trait)]
pub trait PreferenceSource {
    async fn preferences_of(&self, user: PlayerId) -> Preferences;
}

impl PreferenceSource for Arc<Client> {
    async fn preferences_of(&self, user: PlayerId) -> Preferences {
        let row = self
            .query_opt(
                const_format::concatcp!("SELECT preferences FROM ", PROFILES, " WHERE id = $1"),
                &[&user.inner()],
            )
            .await;
        match row {
            Ok(Some(row)) => serde_json::from_value(row.get::<_, serde_json::Value>(0))
                .unwrap_or_default(),
            Ok(None) => Preferences::default(),
            Err(e) => {
                log::warn!("[notify] preferences unreachable for {}: {}", user, e);
                Preferences::default()
            }
        }
    }
}

/// Fire-and-forget dispatcher. Called strictly after commit; every channel
/// fails independently and only ever logs.
pub struct Dispatcher {
    db: Arc<Client>,
    push: Box<dyn PushProvider>,
    email: Box<dyn EmailProvider>,
}

impl Dispatcher {
    pub fn new(db: Arc<Client>, push: Box<dyn PushProvider>, email: Box<dyn EmailProvider>) -> Self {
        Self { db, push, email }
    }
    pub fn logging(db: Arc<Client>) -> Self {
        Self::new(db, Box::new(LogDelivery), Box::new(LogDelivery))
    }

    pub async fn dispatch(&self, to: PlayerId, kind: Kind, payload: serde_json::Value) {
        let now = SystemTime::now();
        let prefs = self.db.preferences_of(to).await;
        let Some(plan) = plan(kind, &prefs, now) else {
            log::debug!("[notify] {} to {} skipped: category disabled", kind, to);
            return;
        };
        if plan.inapp {
            let note = Notification::new(to, kind, payload.clone(), now);
            if let Err(e) = self.db.deposit(&note).await {
                log::warn!("[notify] in-app deposit failed for {}: {}", to, e);
            }
        }
        if plan.push {
            let token = prefs.push_token.as_deref().unwrap_or_default();
            if let Err(e) = self.push.push(token, kind, &payload).await {
                log::warn!("[notify] push failed for {}: {}", to, e);
            }
        }
        if plan.email {
            let address = prefs.email.as_deref().unwrap_or_default();
            if let Err(e) = self.email.email(address, kind, &payload).await {
                log::warn!("[notify] email failed for {}: {}", to, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use std::time::UNIX_EPOCH;

    fn prefs_with_token() -> Preferences {
        Preferences {
            push_token: Some(String::from("ExponentPushToken[abc]")),
            email: Some(String::from("skater@example.com")),
            ..Preferences::default()
        }
    }
    fn daytime() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(12 * 3600)
    }

    #[test]
    fn disabled_category_skips_everything() {
        let mut prefs = prefs_with_token();
        prefs.categories.insert(String::from("your_turn"), false);
        assert_eq!(plan(Kind::YourTurn, &prefs, daytime()), None);
    }
    #[test]
    fn quiet_hours_keep_inapp_only() {
        let mut prefs = prefs_with_token();
        prefs.quiet_hours = Some(QuietHours {
            start_hour: 0,
            end_hour: 24,
        });
        let plan = plan(Kind::YourTurn, &prefs, daytime()).unwrap();
        assert!(plan.inapp);
        assert!(!plan.push);
        assert!(!plan.email);
    }
    #[test]
    fn email_is_high_value_only() {
        let prefs = prefs_with_token();
        assert!(plan(Kind::GameOver, &prefs, daytime()).unwrap().email);
        assert!(!plan(Kind::DisputeFiled, &prefs, daytime()).unwrap().email);
        assert!(!plan(Kind::DeadlineWarning, &prefs, daytime()).unwrap().email);
    }
    #[test]
    fn push_requires_a_well_formed_token() {
        let mut prefs = prefs_with_token();
        assert!(plan(Kind::YourTurn, &prefs, daytime()).unwrap().push);
        prefs.push_token = Some(String::from("not-a-token"));
        assert!(!plan(Kind::YourTurn, &prefs, daytime()).unwrap().push);
        prefs.push_token = None;
        assert!(!plan(Kind::YourTurn, &prefs, daytime()).unwrap().push);
    }
    #[test]
    fn channel_toggles_are_independent() {
        let mut prefs = prefs_with_token();
        prefs.push_enabled = false;
        prefs.inapp_enabled = false;
        let plan = plan(Kind::GameOver, &prefs, daytime()).unwrap();
        assert!(!plan.inapp);
        assert!(!plan.push);
        assert!(plan.email);
    }
}
