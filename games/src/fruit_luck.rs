use std::{convert::Infallible, time::Duration};

use common::utils::GameType;
use serde::{Deserialize, Serialize};

use crate::{
    rng::GameRng,
    session::{Game, GameError, Step},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fruit {
    Apple,
    Orange,
    Banana,
    Grape,
    Strawberry,
    Kiwi,
}

impl Fruit {
    pub const ALL: [Fruit; 6] = [
        Fruit::Apple,
        Fruit::Orange,
        Fruit::Banana,
        Fruit::Grape,
        Fruit::Strawberry,
        Fruit::Kiwi,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            Fruit::Apple => "🍎",
            Fruit::Orange => "🍊",
            Fruit::Banana => "🍌",
            Fruit::Grape => "🍇",
            Fruit::Strawberry => "🍓",
            Fruit::Kiwi => "🥝",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FruitLuckRules {
    pub entry_fee: u64,
    pub tick_ms: u64,
    pub spin_ms: u64,
    pub jackpot: u64,
}

impl Default for FruitLuckRules {
    fn default() -> Self {
        Self {
            entry_fee: 45,
            tick_ms: 100,
            spin_ms: 2_000,
            jackpot: 150,
        }
    }
}

impl FruitLuckRules {
    fn spin_steps(&self) -> u64 {
        (self.spin_ms / self.tick_ms.max(1)).max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reels {
    pub symbols: [Fruit; 3],
    pub steps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FruitLuckOutcome {
    pub symbols: [Fruit; 3],
}

impl FruitLuckOutcome {
    pub fn is_jackpot(&self) -> bool {
        self.symbols.iter().all(|fruit| *fruit == self.symbols[0])
    }
}

#[derive(Debug, Clone, Default)]
pub struct FruitLuck {
    rules: FruitLuckRules,
}

impl FruitLuck {
    pub fn new(rules: FruitLuckRules) -> Self {
        Self { rules }
    }
}

fn roll(rng: &mut GameRng) -> [Fruit; 3] {
    [0; 3].map(|_| Fruit::ALL[rng.index(Fruit::ALL.len())])
}

impl Game for FruitLuck {
    type Active = Reels;
    type Input = Infallible;
    type Outcome = FruitLuckOutcome;

    fn kind(&self) -> GameType {
        GameType::FruitLuck
    }

    fn entry_fee(&self) -> u64 {
        self.rules.entry_fee
    }

    fn tick_period(&self) -> Duration {
        Duration::from_millis(self.rules.tick_ms)
    }

    fn begin(&self, _rng: &mut GameRng) -> Reels {
        Reels {
            symbols: [Fruit::Apple, Fruit::Orange, Fruit::Banana],
            steps: 0,
        }
    }

    fn tick(&self, reels: &mut Reels, rng: &mut GameRng) -> Step<FruitLuckOutcome> {
        reels.symbols = roll(rng);
        reels.steps += 1;
        if reels.steps < self.rules.spin_steps() {
            return Step::Continue;
        }

        reels.symbols = roll(rng);
        Step::Finished(FruitLuckOutcome {
            symbols: reels.symbols,
        })
    }

    fn apply(
        &self,
        _reels: &mut Reels,
        input: Infallible,
        _rng: &mut GameRng,
    ) -> Result<Step<FruitLuckOutcome>, GameError> {
        match input {}
    }

    fn reward(&self, outcome: &FruitLuckOutcome) -> u64 {
        if outcome.is_jackpot() {
            self.rules.jackpot
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_lasts_twenty_ticks() {
        let game = FruitLuck::default();
        let mut rng = GameRng::seeded(4);
        let mut reels = game.begin(&mut rng);

        for _ in 0..19 {
            assert_eq!(game.tick(&mut reels, &mut rng), Step::Continue);
        }
        let Step::Finished(outcome) = game.tick(&mut reels, &mut rng) else {
            panic!("spin should stop after 2 seconds");
        };
        assert_eq!(outcome.symbols, reels.symbols);
    }

    #[test]
    fn only_three_of_a_kind_pays() {
        let game = FruitLuck::default();
        let jackpot = FruitLuckOutcome {
            symbols: [Fruit::Kiwi; 3],
        };
        let near_miss = FruitLuckOutcome {
            symbols: [Fruit::Kiwi, Fruit::Kiwi, Fruit::Grape],
        };
        assert_eq!(game.reward(&jackpot), 150);
        assert_eq!(game.reward(&near_miss), 0);
    }

    #[test]
    fn reward_tracks_the_match_rule() {
        let game = FruitLuck::default();
        let mut rng = GameRng::seeded(77);
        for _ in 0..200 {
            let mut reels = game.begin(&mut rng);
            let outcome = loop {
                if let Step::Finished(outcome) = game.tick(&mut reels, &mut rng) {
                    break outcome;
                }
            };
            assert_eq!(game.reward(&outcome) > 0, outcome.is_jackpot());
        }
    }
}
