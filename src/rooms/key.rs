use serde::Deserialize;
use serde::Serialize;

/// Room type with its fixed capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    /// 1v1 duel spectating/updates.
    Battle,
    /// Live multi-player session.
    Game,
    /// Everyone hanging out at a spot.
    Spot,
    /// Server-wide announcements.
    Global,
    /// Implicit per-user room for direct delivery.
    User,
}

impl RoomKind {
    /// Membership cap; None is unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Battle => Some(2),
            Self::Game => Some(8),
            Self::Spot => Some(100),
            Self::Global => None,
            Self::User => None,
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Battle => "battle",
            Self::Game => "game",
            Self::Spot => "spot",
            Self::Global => "global",
            Self::User => "user",
        }
    }
}

impl TryFrom<&str> for RoomKind {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "battle" => Ok(Self::Battle),
            "game" => Ok(Self::Game),
            "spot" => Ok(Self::Spot),
            "global" => Ok(Self::Global),
            "user" => Ok(Self::User),
            other => Err(format!("unknown room kind: {}", other)),
        }
    }
}

/// `<type>:<id>` room address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    pub kind: RoomKind,
    pub id: String,
}

impl RoomKey {
    pub fn battle(id: impl std::fmt::Display) -> Self {
        Self {
            kind: RoomKind::Battle,
            id: id.to_string(),
        }
    }
    pub fn game(id: impl std::fmt::Display) -> Self {
        Self {
            kind: RoomKind::Game,
            id: id.to_string(),
        }
    }
    pub fn spot(id: impl std::fmt::Display) -> Self {
        Self {
            kind: RoomKind::Spot,
            id: id.to_string(),
        }
    }
    pub fn global() -> Self {
        Self {
            kind: RoomKind::Global,
            id: String::from("all"),
        }
    }
    pub fn user(uid: impl std::fmt::Display) -> Self {
        Self {
            kind: RoomKind::User,
            id: uid.to_string(),
        }
    }
    pub fn capacity(&self) -> Option<usize> {
        self.kind.capacity()
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl TryFrom<&str> for RoomKey {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.split_once(':') {
            Some((kind, id)) if !id.is_empty() => Ok(Self {
                kind: RoomKind::try_from(kind)?,
                id: id.to_string(),
            }),
            _ => Err(format!("malformed room key: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities() {
        assert_eq!(RoomKind::Battle.capacity(), Some(2));
        assert_eq!(RoomKind::Game.capacity(), Some(8));
        assert_eq!(RoomKind::Spot.capacity(), Some(100));
        assert_eq!(RoomKind::Global.capacity(), None);
    }
    #[test]
    fn renders_and_parses() {
        let key = RoomKey::battle("abc");
        assert_eq!(key.to_string(), "battle:abc");
        assert_eq!(RoomKey::try_from("battle:abc").unwrap(), key);
        assert!(RoomKey::try_from("battle:").is_err());
        assert!(RoomKey::try_from("arena:abc").is_err());
    }
}
