use serde::Deserialize;
use serde::Serialize;

/// The defender's final call on a set trick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Defender matched the trick. Roles swap, no letter.
    Landed,
    /// BAIL: defender failed. Defender earns a letter, roles stay.
    Missed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landed => "landed",
            Self::Missed => "missed",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Verdict {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "landed" => Ok(Self::Landed),
            "missed" => Ok(Self::Missed),
            other => Err(format!("unknown verdict: {}", other)),
        }
    }
}

/// Judgment state persisted on a `set` turn. Starts `Pending`; the single
/// later mutation it ever sees is the verdict (or a dispute overturning it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    Pending,
    Landed,
    Missed,
}

impl Judgment {
    pub fn pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Pending => None,
            Self::Landed => Some(Verdict::Landed),
            Self::Missed => Some(Verdict::Missed),
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Landed => "landed",
            Self::Missed => "missed",
        }
    }
}

impl From<Verdict> for Judgment {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Landed => Self::Landed,
            Verdict::Missed => Self::Missed,
        }
    }
}

impl std::fmt::Display for Judgment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Judgment {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "landed" => Ok(Self::Landed),
            "missed" => Ok(Self::Missed),
            other => Err(format!("unknown judgment: {}", other)),
        }
    }
}
