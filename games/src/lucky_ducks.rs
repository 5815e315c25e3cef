use std::{convert::Infallible, time::Duration};

use common::utils::GameType;
use serde::{Deserialize, Serialize};

use crate::{
    rng::GameRng,
    session::{Game, GameError, Step},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Duck,
    Frog,
    Turtle,
    Fish,
    Crab,
}

impl Symbol {
    pub const ALL: [Symbol; 5] = [
        Symbol::Duck,
        Symbol::Frog,
        Symbol::Turtle,
        Symbol::Fish,
        Symbol::Crab,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            Symbol::Duck => "🦆",
            Symbol::Frog => "🐸",
            Symbol::Turtle => "🐢",
            Symbol::Fish => "🐠",
            Symbol::Crab => "🦀",
        }
    }
}

/// `reels[reel][row]`
pub type Reels = [[Symbol; 3]; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payline {
    Row(usize),
    Column(usize),
    Diagonal,
    AntiDiagonal,
}

impl Payline {
    pub const ALL: [Payline; 8] = [
        Payline::Row(0),
        Payline::Row(1),
        Payline::Row(2),
        Payline::Column(0),
        Payline::Column(1),
        Payline::Column(2),
        Payline::Diagonal,
        Payline::AntiDiagonal,
    ];

    pub fn symbols(self, reels: &Reels) -> [Symbol; 3] {
        match self {
            Payline::Row(row) => [reels[0][row], reels[1][row], reels[2][row]],
            Payline::Column(reel) => reels[reel],
            Payline::Diagonal => [reels[0][0], reels[1][1], reels[2][2]],
            Payline::AntiDiagonal => [reels[0][2], reels[1][1], reels[2][0]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LuckyDucksRules {
    pub entry_fee: u64,
    pub tick_ms: u64,
    pub spin_ms: u64,
    pub three_ducks: u64,
    pub three_of_a_kind: u64,
    pub two_ducks: u64,
}

impl Default for LuckyDucksRules {
    fn default() -> Self {
        Self {
            entry_fee: 45,
            tick_ms: 100,
            spin_ms: 3_000,
            three_ducks: 150,
            three_of_a_kind: 75,
            two_ducks: 60,
        }
    }
}

impl LuckyDucksRules {
    pub fn line_payout(&self, line: [Symbol; 3]) -> u64 {
        let ducks = line.iter().filter(|s| **s == Symbol::Duck).count();
        if ducks == 3 {
            self.three_ducks
        } else if line.iter().all(|s| *s == line[0]) {
            self.three_of_a_kind
        } else if ducks == 2 {
            self.two_ducks
        } else {
            0
        }
    }

    pub fn evaluate(&self, reels: &Reels) -> Vec<LineWin> {
        Payline::ALL
            .iter()
            .filter_map(|line| {
                let payout = self.line_payout(line.symbols(reels));
                (payout > 0).then_some(LineWin {
                    line: *line,
                    payout,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWin {
    pub line: Payline,
    pub payout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinningReels {
    pub reels: Reels,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuckyDucksOutcome {
    pub reels: Reels,
    pub wins: Vec<LineWin>,
}

impl LuckyDucksOutcome {
    pub fn total(&self) -> u64 {
        self.wins.iter().map(|win| win.payout).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LuckyDucks {
    rules: LuckyDucksRules,
}

impl LuckyDucks {
    pub fn new(rules: LuckyDucksRules) -> Self {
        Self { rules }
    }
}

fn roll(rng: &mut GameRng) -> Reels {
    [[Symbol::Duck; 3]; 3].map(|reel| reel.map(|_| Symbol::ALL[rng.index(Symbol::ALL.len())]))
}

impl Game for LuckyDucks {
    type Active = SpinningReels;
    type Input = Infallible;
    type Outcome = LuckyDucksOutcome;

    fn kind(&self) -> GameType {
        GameType::LuckyDucks
    }

    fn entry_fee(&self) -> u64 {
        self.rules.entry_fee
    }

    fn tick_period(&self) -> Duration {
        Duration::from_millis(self.rules.tick_ms)
    }

    fn begin(&self, _rng: &mut GameRng) -> SpinningReels {
        use Symbol::*;
        SpinningReels {
            reels: [[Duck, Frog, Turtle], [Fish, Duck, Crab], [Turtle, Fish, Duck]],
            elapsed_ms: 0,
        }
    }

    fn tick(&self, spin: &mut SpinningReels, rng: &mut GameRng) -> Step<LuckyDucksOutcome> {
        spin.reels = roll(rng);
        spin.elapsed_ms += self.rules.tick_ms;
        if spin.elapsed_ms < self.rules.spin_ms {
            return Step::Continue;
        }

        spin.reels = roll(rng);
        Step::Finished(LuckyDucksOutcome {
            reels: spin.reels,
            wins: self.rules.evaluate(&spin.reels),
        })
    }

    fn apply(
        &self,
        _spin: &mut SpinningReels,
        input: Infallible,
        _rng: &mut GameRng,
    ) -> Result<Step<LuckyDucksOutcome>, GameError> {
        match input {}
    }

    fn reward(&self, outcome: &LuckyDucksOutcome) -> u64 {
        outcome.total()
    }
}
