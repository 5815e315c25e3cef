use std::{fs, path::Path};

use anyhow::Context;
use common::utils::GameType;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    archery::{Archery, ArcheryRules},
    crossword::{Crossword, CrosswordRules},
    fruit_luck::{FruitLuck, FruitLuckRules},
    lucky_ducks::{LuckyDucks, LuckyDucksRules},
    mario_dash::{MarioDash, MarioDashRules},
    session::GameError,
    snake::{Snake, SnakeRules},
    uno::{Uno, UnoRules},
};

/// Tunable constants for every game. Missing sections and fields keep their
/// defaults, so an override file only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub snake: SnakeRules,
    pub fruit_luck: FruitLuckRules,
    pub lucky_ducks: LuckyDucksRules,
    pub crossword: CrosswordRules,
    pub uno: UnoRules,
    pub mario_dash: MarioDashRules,
    pub archery: ArcheryRules,
}

impl GameRules {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let rules: GameRules = serde_json::from_str(raw).context("Failed to parse game rules")?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read game rules from {}", path.display()))?;
        let rules = Self::from_json(&raw)?;
        info!(path = %path.display(), "Loaded game rules");
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        self.crossword.puzzle.validate()?;

        let periods = [
            (GameType::Snake, self.snake.tick_ms),
            (GameType::FruitLuck, self.fruit_luck.tick_ms),
            (GameType::LuckyDucks, self.lucky_ducks.tick_ms),
            (GameType::Uno, self.uno.tick_ms),
            (GameType::MarioDash, self.mario_dash.tick_ms),
            (GameType::PrecisionArchery, self.archery.tick_ms),
        ];
        if let Some((game, _)) = periods.iter().find(|(_, ms)| *ms == 0) {
            return Err(GameError::InvalidRules(format!("{game} tick period must be positive")));
        }
        if self.snake.grid_size <= 0 {
            return Err(GameError::InvalidRules("snake grid must not be empty".into()));
        }
        if self.mario_dash.min_step <= 0.0 || self.mario_dash.max_step < self.mario_dash.min_step {
            return Err(GameError::InvalidRules("mario dash step range is invalid".into()));
        }
        if self.archery.rivals.is_empty() || self.archery.darts_per_round == 0 {
            return Err(GameError::InvalidRules("archery needs rivals and darts".into()));
        }
        if self.uno.hand_size == 0 || self.uno.hand_size > 50 {
            return Err(GameError::InvalidRules("uno hand size must be between 1 and 50".into()));
        }
        Ok(())
    }

    pub fn entry_fee(&self, game: GameType) -> u64 {
        match game {
            GameType::Snake => self.snake.entry_fee,
            GameType::FruitLuck => self.fruit_luck.entry_fee,
            GameType::Crossword => self.crossword.entry_fee,
            GameType::LuckyDucks => self.lucky_ducks.entry_fee,
            GameType::Uno => self.uno.entry_fee,
            GameType::MarioDash => self.mario_dash.entry_fee,
            GameType::PrecisionArchery => self.archery.entry_fee,
        }
    }

    pub fn snake(&self) -> Snake {
        Snake::new(self.snake.clone())
    }

    pub fn fruit_luck(&self) -> FruitLuck {
        FruitLuck::new(self.fruit_luck.clone())
    }

    pub fn lucky_ducks(&self) -> LuckyDucks {
        LuckyDucks::new(self.lucky_ducks.clone())
    }

    pub fn crossword(&self) -> Crossword {
        Crossword::new(self.crossword.clone())
    }

    pub fn uno(&self) -> Uno {
        Uno::new(self.uno.clone())
    }

    pub fn mario_dash(&self) -> MarioDash {
        MarioDash::new(self.mario_dash.clone())
    }

    pub fn archery(&self) -> Archery {
        Archery::new(self.archery.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_game_costs_forty_five_by_default() {
        let rules = GameRules::default();
        rules.validate().unwrap();
        for game in GameType::ALL {
            assert_eq!(rules.entry_fee(game), 45, "{game}");
        }
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let rules = GameRules::from_json(r#"{ "snake": { "max_reward": 200 }, "uno": { "win_reward": 120 } }"#).unwrap();
        assert_eq!(rules.snake.max_reward, 200);
        assert_eq!(rules.snake.grid_size, 20);
        assert_eq!(rules.uno.win_reward, 120);
        assert_eq!(rules.archery, ArcheryRules::default());
    }

    #[test]
    fn inconsistent_overrides_are_rejected() {
        assert!(GameRules::from_json(r#"{ "snake": { "tick_ms": 0 } }"#).is_err());
        assert!(GameRules::from_json(r#"{ "mario_dash": { "min_step": 5.0, "max_step": 1.0 } }"#).is_err());
        assert!(GameRules::from_json("not json").is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("arcade-rules-{}.json", std::process::id()));
        fs::write(&path, r#"{ "fruit_luck": { "jackpot": 300 } }"#).unwrap();
        let rules = GameRules::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(rules.fruit_luck.jackpot, 300);
        assert!(GameRules::load(&path).is_err());
    }
}
