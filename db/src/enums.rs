use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Admin-driven lifecycle of a hackathon event. Transitions normally only
/// move forward; the mutation path does not forbid moving backward but logs
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HackathonState {
    BeforeStart,
    Hacking,
    Voting,
    Ended,
}

impl Default for HackathonState {
    fn default() -> Self {
        Self::BeforeStart
    }
}

impl HackathonState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeStart => "before_start",
            Self::Hacking => "hacking",
            Self::Voting => "voting",
            Self::Ended => "ended",
        }
    }
}

impl FromStr for HackathonState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before_start" => Ok(Self::BeforeStart),
            "hacking" => Ok(Self::Hacking),
            "voting" => Ok(Self::Voting),
            "ended" => Ok(Self::Ended),
            other => Err(format!("unknown hackathon state {other}")),
        }
    }
}

impl std::fmt::Display for HackathonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
