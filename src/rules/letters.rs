use crate::Arbitrary;

/// The word whose letters accrete on a losing board.
pub const WORD: &str = "SKATE";

/// A player's board: a prefix of "SKATE", represented by its length.
/// Five letters is elimination. The representation cannot hold anything
/// that is not a prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Letters(u8);

impl Letters {
    pub const NONE: Self = Self(0);
    pub const FULL: Self = Self(5);

    pub fn count(&self) -> usize {
        self.0 as usize
    }
    /// One more letter, saturating at the full word.
    pub fn gain(self) -> Self {
        Self(self.0.saturating_add(1).min(5))
    }
    /// Strip the trailing letter, saturating at the empty board.
    /// Used when an upheld dispute reverses a BAIL.
    pub fn strip(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
    pub fn eliminated(&self) -> bool {
        self.0 == 5
    }
    pub fn as_str(&self) -> &'static str {
        &WORD[..self.count()]
    }
}

impl std::fmt::Display for Letters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Letters {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match WORD.starts_with(s) {
            true => Ok(Self(s.len() as u8)),
            false => Err(format!("not a prefix of {}: {}", WORD, s)),
        }
    }
}

impl serde::Serialize for Letters {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
impl<'de> serde::Deserialize<'de> for Letters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl Arbitrary for Letters {
    fn random() -> Self {
        Self(rand::random_range(0..=5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accretes_in_order() {
        let mut letters = Letters::NONE;
        for expected in ["S", "SK", "SKA", "SKAT", "SKATE"] {
            letters = letters.gain();
            assert_eq!(letters.as_str(), expected);
        }
    }
    #[test]
    fn gain_saturates_at_full() {
        assert_eq!(Letters::FULL.gain(), Letters::FULL);
    }
    #[test]
    fn strip_undoes_gain() {
        let letters = Letters::NONE.gain().gain();
        assert_eq!(letters.strip().as_str(), "S");
        assert_eq!(Letters::NONE.strip(), Letters::NONE);
    }
    #[test]
    fn eliminated_only_at_full_word() {
        let mut letters = Letters::NONE;
        for _ in 0..4 {
            letters = letters.gain();
            assert!(!letters.eliminated());
        }
        assert!(letters.gain().eliminated());
    }
    #[test]
    fn parses_prefixes_only() {
        assert_eq!(Letters::try_from("SKA").unwrap().count(), 3);
        assert_eq!(Letters::try_from("").unwrap(), Letters::NONE);
        assert!(Letters::try_from("SKATES").is_err());
        assert!(Letters::try_from("KATE").is_err());
    }
}
