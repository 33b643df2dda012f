use crate::Arbitrary;
use serde::Deserialize;
use serde::Serialize;

/// Session lifecycle phase. `Paused` only occurs in the live variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Active,
    Paused,
    Completed,
    Declined,
    Forfeited,
}

impl Phase {
    /// Terminal phases never transition out; their deadline, sub-phase and
    /// turn pointer are null.
    pub fn terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Declined | Self::Forfeited)
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Declined => "declined",
            Self::Forfeited => "forfeited",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Phase {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "declined" => Ok(Self::Declined),
            "forfeited" => Ok(Self::Forfeited),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// Round sub-phase within an active session. Null once terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Offensive player records the trick to beat.
    SetTrick,
    /// Defensive player records their one-take attempt.
    RespondTrick,
    /// Defensive player calls LAND or BAIL on themself.
    Judge,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetTrick => "set_trick",
            Self::RespondTrick => "respond_trick",
            Self::Judge => "judge",
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TurnPhase {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "set_trick" => Ok(Self::SetTrick),
            "respond_trick" => Ok(Self::RespondTrick),
            "judge" => Ok(Self::Judge),
            other => Err(format!("unknown turn phase: {}", other)),
        }
    }
}

impl Arbitrary for Phase {
    fn random() -> Self {
        [
            Self::Pending,
            Self::Active,
            Self::Paused,
            Self::Completed,
            Self::Declined,
            Self::Forfeited,
        ][rand::random_range(0..6)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(Phase::Completed.terminal());
        assert!(Phase::Declined.terminal());
        assert!(Phase::Forfeited.terminal());
        assert!(!Phase::Pending.terminal());
        assert!(!Phase::Active.terminal());
        assert!(!Phase::Paused.terminal());
    }
    #[test]
    fn round_trips_through_strings() {
        for phase in [
            Phase::Pending,
            Phase::Active,
            Phase::Paused,
            Phase::Completed,
            Phase::Declined,
            Phase::Forfeited,
        ] {
            assert_eq!(Phase::try_from(phase.as_str()).unwrap(), phase);
        }
        for tp in [TurnPhase::SetTrick, TurnPhase::RespondTrick, TurnPhase::Judge] {
            assert_eq!(TurnPhase::try_from(tp.as_str()).unwrap(), tp);
        }
    }
}
