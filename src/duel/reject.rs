/// Structured refusal from the gateway. The transport layer owns the
/// mapping to HTTP status codes and socket error events; the gateway never
/// logs these at error level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reject {
    GameNotFound,
    TurnNotFound,
    DisputeNotFound,
    OpponentNotFound,
    SelfChallenge,
    Forbidden,
    NotAPlayer,
    NotYourTurn,
    WrongPhase,
    DeadlinePassed,
    VideoTooLong,
    AlreadyJudged,
    ResponseRequired,
    DisputeQuotaUsed,
    WrongJudgment,
    NotSetter,
    NotRespondent,
    AlreadyResolved,
    RoomFull,
    RateLimited,
    Validation(String),
    Unavailable(String),
    Internal(String),
}

impl Reject {
    /// Stable machine code carried on error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::TurnNotFound => "TURN_NOT_FOUND",
            Self::DisputeNotFound => "DISPUTE_NOT_FOUND",
            Self::OpponentNotFound => "OPPONENT_NOT_FOUND",
            Self::SelfChallenge => "SELF_CHALLENGE",
            Self::Forbidden => "FORBIDDEN",
            Self::NotAPlayer => "NOT_A_PLAYER",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::WrongPhase => "WRONG_PHASE",
            Self::DeadlinePassed => "DEADLINE_PASSED",
            Self::VideoTooLong => "VIDEO_TOO_LONG",
            Self::AlreadyJudged => "ALREADY_JUDGED",
            Self::ResponseRequired => "RESPONSE_REQUIRED",
            Self::DisputeQuotaUsed => "DISPUTE_QUOTA_USED",
            Self::WrongJudgment => "WRONG_JUDGMENT",
            Self::NotSetter => "NOT_SETTER",
            Self::NotRespondent => "NOT_RESPONDENT",
            Self::AlreadyResolved => "ALREADY_RESOLVED",
            Self::RoomFull => "ROOM_FULL",
            Self::RateLimited => "RATE_LIMITED",
            Self::Validation(_) => "VALIDATION",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }
    /// Human-readable message. Internal details never leak.
    pub fn message(&self) -> String {
        match self {
            Self::GameNotFound => String::from("game not found"),
            Self::TurnNotFound => String::from("turn not found"),
            Self::DisputeNotFound => String::from("dispute not found"),
            Self::OpponentNotFound => String::from("opponent not found"),
            Self::SelfChallenge => String::from("you cannot challenge yourself"),
            Self::Forbidden => String::from("you cannot act on this"),
            Self::NotAPlayer => String::from("you are not a player in this game"),
            Self::NotYourTurn => String::from("it is not your turn"),
            Self::WrongPhase => String::from("the game is not in the right phase for that"),
            Self::DeadlinePassed => String::from("the turn deadline has passed"),
            Self::VideoTooLong => String::from("video exceeds the 15 second limit"),
            Self::AlreadyJudged => String::from("that turn has already been judged"),
            Self::ResponseRequired => String::from("a response attempt must be recorded first"),
            Self::DisputeQuotaUsed => String::from("you have already used your dispute"),
            Self::WrongJudgment => String::from("only BAIL calls can be disputed"),
            Self::NotSetter => String::from("only the setter of the trick can dispute"),
            Self::NotRespondent => String::from("only the judger can resolve this dispute"),
            Self::AlreadyResolved => String::from("this dispute is already resolved"),
            Self::RoomFull => String::from("room is full"),
            Self::RateLimited => String::from("slow down"),
            Self::Validation(msg) => msg.clone(),
            Self::Unavailable(_) => String::from("service unavailable"),
            Self::Internal(_) => String::from("something went wrong"),
        }
    }
}

impl std::fmt::Display for Reject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for Reject {}

#[cfg(feature = "database")]
impl From<tokio_postgres::Error> for Reject {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}
