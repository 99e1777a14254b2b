//! Sleep quality rating.

use serde::{Deserialize, Serialize};

/// How well a night went, on a six-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepQuality {
    VeryBad,
    Poor,
    SoSo,
    Ok,
    Good,
    Excellent,
}

impl SleepQuality {
    /// All ratings, worst first.
    pub const ALL: [Self; 6] = [
        Self::VeryBad,
        Self::Poor,
        Self::SoSo,
        Self::Ok,
        Self::Good,
        Self::Excellent,
    ];

    /// Convert rating to its integer score for database storage.
    pub const fn score(self) -> i32 {
        match self {
            Self::VeryBad => 0,
            Self::Poor => 1,
            Self::SoSo => 2,
            Self::Ok => 3,
            Self::Good => 4,
            Self::Excellent => 5,
        }
    }

    /// Parse a rating from its integer score.
    pub const fn from_score(score: i32) -> Option<Self> {
        match score {
            0 => Some(Self::VeryBad),
            1 => Some(Self::Poor),
            2 => Some(Self::SoSo),
            3 => Some(Self::Ok),
            4 => Some(Self::Good),
            5 => Some(Self::Excellent),
            _ => None,
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryBad => "Very bad",
            Self::Poor => "Poor",
            Self::SoSo => "So-so",
            Self::Ok => "OK",
            Self::Good => "Pretty good",
            Self::Excellent => "Excellent!",
        }
    }

    /// Parse a rating from user input: a score or a name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        if let Ok(score) = s.parse::<i32>() {
            return Self::from_score(score);
        }
        match s.as_str() {
            "very-bad" | "very_bad" | "verybad" => Some(Self::VeryBad),
            "poor" => Some(Self::Poor),
            "so-so" | "soso" | "so_so" => Some(Self::SoSo),
            "ok" => Some(Self::Ok),
            "good" => Some(Self::Good),
            "excellent" => Some(Self::Excellent),
            _ => None,
        }
    }
}

impl std::fmt::Display for SleepQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
