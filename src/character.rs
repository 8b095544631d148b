//! The two characters of the story and the table each one is bound to

use crate::error::Error;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Character {
    Jack,
    Jill,
}

impl Character {
    pub const ALL: [Character; 2] = [Character::Jack, Character::Jill];

    /// File name of the character's table inside the data directory
    pub fn table_file(&self) -> &'static str {
        match self {
            Character::Jack => "male.csv",
            Character::Jill => "female.csv",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Character::Jack => "Jack",
            Character::Jill => "Jill",
        }
    }

    pub fn possessive(&self) -> String {
        format!("{}'s", self.name())
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Character {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jack" | "male" => Ok(Character::Jack),
            "jill" | "female" => Ok(Character::Jill),
            _ => Err(Error::UnknownCharacter(s.to_string())),
        }
    }
}
