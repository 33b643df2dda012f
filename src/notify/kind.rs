use serde::Deserialize;
use serde::Serialize;

/// One logical notification per observable state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    ChallengeReceived,
    YourTurn,
    GameOver,
    OpponentForfeited,
    GameForfeitedTimeout,
    DeadlineWarning,
    DisputeFiled,
    DisputeResolved,
    QuickMatch,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChallengeReceived => "challenge_received",
            Self::YourTurn => "your_turn",
            Self::GameOver => "game_over",
            Self::OpponentForfeited => "opponent_forfeited",
            Self::GameForfeitedTimeout => "game_forfeited_timeout",
            Self::DeadlineWarning => "deadline_warning",
            Self::DisputeFiled => "dispute_filed",
            Self::DisputeResolved => "dispute_resolved",
            Self::QuickMatch => "quick_match",
        }
    }
    /// Types worth an email. Everything else is push/in-app only.
    pub fn high_value(&self) -> bool {
        matches!(self, Self::ChallengeReceived | Self::YourTurn | Self::GameOver)
    }
    /// Short subject line for push and email rendering.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ChallengeReceived => "New challenge",
            Self::YourTurn => "Your turn",
            Self::GameOver => "Game over",
            Self::OpponentForfeited => "Opponent forfeited",
            Self::GameForfeitedTimeout => "Game forfeited on timeout",
            Self::DeadlineWarning => "Deadline approaching",
            Self::DisputeFiled => "Call disputed",
            Self::DisputeResolved => "Dispute resolved",
            Self::QuickMatch => "Quick match found",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Kind {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "challenge_received" => Ok(Self::ChallengeReceived),
            "your_turn" => Ok(Self::YourTurn),
            "game_over" => Ok(Self::GameOver),
            "opponent_forfeited" => Ok(Self::OpponentForfeited),
            "game_forfeited_timeout" => Ok(Self::GameForfeitedTimeout),
            "deadline_warning" => Ok(Self::DeadlineWarning),
            "dispute_filed" => Ok(Self::DisputeFiled),
            "dispute_resolved" => Ok(Self::DisputeResolved),
            "quick_match" => Ok(Self::QuickMatch),
            other => Err(format!("unknown notification kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_value_set_is_exactly_three() {
        let high: Vec<Kind> = [
            Kind::ChallengeReceived,
            Kind::YourTurn,
            Kind::GameOver,
            Kind::OpponentForfeited,
            Kind::GameForfeitedTimeout,
            Kind::DeadlineWarning,
            Kind::DisputeFiled,
            Kind::DisputeResolved,
            Kind::QuickMatch,
        ]
        .into_iter()
        .filter(Kind::high_value)
        .collect();
        assert_eq!(high, vec![Kind::ChallengeReceived, Kind::YourTurn, Kind::GameOver]);
    }
}
