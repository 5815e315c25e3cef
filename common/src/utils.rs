use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{impl_display_for_enum, impl_from_str_for_enum};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Snake,
    FruitLuck,
    Crossword,
    LuckyDucks,
    Uno,
    MarioDash,
    PrecisionArchery,
}

impl GameType {
    pub const ALL: [GameType; 7] = [
        GameType::Snake,
        GameType::FruitLuck,
        GameType::Crossword,
        GameType::LuckyDucks,
        GameType::Uno,
        GameType::MarioDash,
        GameType::PrecisionArchery,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            GameType::Snake => "Snake Classic",
            GameType::FruitLuck => "Fruit Luck",
            GameType::Crossword => "Crossword Challenge",
            GameType::LuckyDucks => "Lucky Ducks",
            GameType::Uno => "Uno Showdown",
            GameType::MarioDash => "Mario Dash Racing",
            GameType::PrecisionArchery => "Precision Archery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Upcoming,
    Active,
    Completed,
}

impl_from_str_for_enum!(
    GameType,
    Snake => "snake",
    FruitLuck => "fruit_luck",
    Crossword => "crossword",
    LuckyDucks => "lucky_ducks",
    Uno => "uno",
    MarioDash => "mario_dash",
    PrecisionArchery => "precision_archery",
);
impl_display_for_enum!(
    GameType,
    Snake => "snake",
    FruitLuck => "fruit_luck",
    Crossword => "crossword",
    LuckyDucks => "lucky_ducks",
    Uno => "uno",
    MarioDash => "mario_dash",
    PrecisionArchery => "precision_archery",
);
impl_from_str_for_enum!(RoomStatus, Waiting => "waiting", Active => "active", Completed => "completed");
impl_display_for_enum!(RoomStatus, Waiting => "waiting", Active => "active", Completed => "completed");
impl_from_str_for_enum!(
    TournamentStatus,
    Upcoming => "upcoming",
    Active => "active",
    Completed => "completed",
);
impl_display_for_enum!(
    TournamentStatus,
    Upcoming => "upcoming",
    Active => "active",
    Completed => "completed",
);
