use std::{convert::Infallible, time::Duration};

use common::utils::GameType;
use serde::{Deserialize, Serialize};

use crate::{
    rng::GameRng,
    session::{Game, GameError, Step},
};

pub const FINISH_LINE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarioDashRules {
    pub entry_fee: u64,
    pub tick_ms: u64,
    pub min_step: f64,
    pub max_step: f64,
    pub coin_chance: f64,
    pub racers: u32,
    /// Reward by finishing position, first place first.
    pub placement_rewards: Vec<u64>,
    pub default_reward: u64,
    pub coins_per_bonus: u32,
    pub coin_bonus: u64,
}

impl Default for MarioDashRules {
    fn default() -> Self {
        Self {
            entry_fee: 45,
            tick_ms: 100,
            min_step: 1.5,
            max_step: 4.5,
            coin_chance: 0.3,
            racers: 6,
            placement_rewards: vec![80, 60, 40],
            default_reward: 20,
            coins_per_bonus: 10,
            coin_bonus: 5,
        }
    }
}

impl MarioDashRules {
    pub fn reward_for(&self, position: u32, coins: u32) -> u64 {
        let placement = position
            .checked_sub(1)
            .and_then(|i| self.placement_rewards.get(i as usize))
            .copied()
            .unwrap_or(self.default_reward);
        let bonus = u64::from(coins / self.coins_per_bonus.max(1)) * self.coin_bonus;
        placement + bonus
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Race {
    pub progress: f64,
    pub coins: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceOutcome {
    pub position: u32,
    pub coins: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MarioDash {
    rules: MarioDashRules,
}

impl MarioDash {
    pub fn new(rules: MarioDashRules) -> Self {
        Self { rules }
    }
}

impl Game for MarioDash {
    type Active = Race;
    type Input = Infallible;
    type Outcome = RaceOutcome;

    fn kind(&self) -> GameType {
        GameType::MarioDash
    }

    fn entry_fee(&self) -> u64 {
        self.rules.entry_fee
    }

    fn tick_period(&self) -> Duration {
        Duration::from_millis(self.rules.tick_ms)
    }

    fn begin(&self, _rng: &mut GameRng) -> Race {
        Race {
            progress: 0.0,
            coins: 0,
        }
    }

    fn tick(&self, race: &mut Race, rng: &mut GameRng) -> Step<RaceOutcome> {
        race.progress += rng.uniform(self.rules.min_step, self.rules.max_step);
        if rng.chance(self.rules.coin_chance) {
            race.coins += 1;
        }
        if race.progress < FINISH_LINE {
            return Step::Continue;
        }

        race.progress = FINISH_LINE;
        Step::Finished(RaceOutcome {
            position: rng.inclusive(1, self.rules.racers.max(1)),
            coins: race.coins,
        })
    }

    fn apply(&self, _race: &mut Race, input: Infallible, _rng: &mut GameRng) -> Result<Step<RaceOutcome>, GameError> {
        match input {}
    }

    fn reward(&self, outcome: &RaceOutcome) -> u64 {
        self.rules.reward_for(outcome.position, outcome.coins)
    }
}
