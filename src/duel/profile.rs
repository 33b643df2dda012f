use crate::ID;
use crate::Unique;
use crate::notify::Preferences;

/// Players are identified by their profile row.
pub type PlayerId = ID<Profile>;

/// Player profile slice owned by this service: display name, the monotone
/// dispute-penalty counter, and notification preferences. The user
/// directory proper lives elsewhere.
#[derive(Debug, Clone)]
pub struct Profile {
    id: ID<Self>,
    username: String,
    dispute_penalties: i32,
    preferences: Preferences,
}

impl Profile {
    pub fn new(id: ID<Self>, username: String) -> Self {
        Self {
            id,
            username,
            dispute_penalties: 0,
            preferences: Preferences::default(),
        }
    }
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }
    pub fn with_penalties(mut self, dispute_penalties: i32) -> Self {
        self.dispute_penalties = dispute_penalties;
        self
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn dispute_penalties(&self) -> i32 {
        self.dispute_penalties
    }
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }
}

impl Unique for Profile {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use crate::pg::*;

    impl Schema for Profile {
        fn name() -> &'static str {
            PROFILES
        }
        fn columns() -> &'static [tokio_postgres::types::Type] {
            &[
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::VARCHAR,
                tokio_postgres::types::Type::INT4,
                tokio_postgres::types::Type::JSONB,
            ]
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                PROFILES,
                " (
                    id                  UUID PRIMARY KEY,
                    username            VARCHAR(32) NOT NULL,
                    dispute_penalties   INTEGER NOT NULL DEFAULT 0,
                    preferences         JSONB NOT NULL DEFAULT '{}'::jsonb
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_profiles_username ON ",
                PROFILES,
                " (username);"
            )
        }
    }
}
