use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quality tier assigned to a project. `A` is best; `E` marks projects
/// that should never appear in a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ranking {
    A,
    B,
    C,
    E,
}

impl Ranking {
    /// Score multiplier per the street cred formula.
    pub fn points(self) -> f64 {
        match self {
            Ranking::A => 1.8,
            Ranking::B => 1.0,
            Ranking::C => 0.2,
            Ranking::E => 0.0,
        }
    }

    /// Quality order for single-subsumption checks: `A` outranks `B`
    /// outranks `C` outranks `E`.
    pub fn quality(self) -> u8 {
        match self {
            Ranking::A => 3,
            Ranking::B => 2,
            Ranking::C => 1,
            Ranking::E => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Ranking::A => "A",
            Ranking::B => "B",
            Ranking::C => "C",
            Ranking::E => "E",
        }
    }
}

impl std::fmt::Display for Ranking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Ranking {
    type Err = ClassificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Ranking::A),
            "B" => Ok(Ranking::B),
            "C" => Ok(Ranking::C),
            "E" => Ok(Ranking::E),
            other => Err(ClassificationError::NotARanking(other.to_string())),
        }
    }
}

/// A classification is either a ranking (A/B/C/E) or a certification:
/// any other non-numeric word, emoji included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ranking(Ranking),
    Certification(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("classification must not be empty")]
    Empty,

    #[error("classification cannot be numeric: {0}")]
    Numeric(String),

    #[error("not a ranking: {0}")]
    NotARanking(String),
}

impl Classification {
    /// Parse a user-entered classification: the first word, uppercased.
    /// Numbers are reserved for season identifiers and rejected here.
    pub fn parse(input: &str) -> Result<Self, ClassificationError> {
        let word = input
            .split_whitespace()
            .next()
            .ok_or(ClassificationError::Empty)?
            .to_uppercase();
        if word.chars().all(|c| c.is_ascii_digit()) {
            return Err(ClassificationError::Numeric(word));
        }
        match word.parse::<Ranking>() {
            Ok(ranking) => Ok(Classification::Ranking(ranking)),
            Err(_) => Ok(Classification::Certification(word)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Classification::Ranking(r) => r.as_str(),
            Classification::Certification(c) => c,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
