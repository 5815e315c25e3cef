use std::time::Duration;

use common::utils::GameType;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    rng::GameRng,
    session::{Game, GameError, Step},
};

/// Scoring rings measured from the target centre, after the power penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetZones {
    pub bullseye_radius: f64,
    pub bullseye_points: u32,
    pub inner_bull_radius: f64,
    pub inner_bull_points: u32,
    pub ring_radius: f64,
    pub treble: (f64, f64),
    pub double: (f64, f64),
    pub outer_radius: f64,
}

impl Default for TargetZones {
    fn default() -> Self {
        Self {
            bullseye_radius: 2.0,
            bullseye_points: 50,
            inner_bull_radius: 5.0,
            inner_bull_points: 25,
            ring_radius: 15.0,
            treble: (8.0, 10.0),
            double: (12.0, 14.0),
            outer_radius: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcheryRules {
    pub entry_fee: u64,
    pub tick_ms: u64,
    pub rivals: Vec<String>,
    pub darts_per_round: u32,
    pub power_step: u32,
    pub max_power: u32,
    pub optimal_power: f64,
    pub power_penalty: f64,
    pub max_wind: f64,
    pub wind_drift: f64,
    pub aim_jitter: f64,
    pub rival_round_min: u32,
    pub rival_round_max: u32,
    /// Reward by final position, first place first.
    pub placement_rewards: Vec<u64>,
    pub zones: TargetZones,
}

impl Default for ArcheryRules {
    fn default() -> Self {
        Self {
            entry_fee: 45,
            tick_ms: 50,
            rivals: ["BullsEye", "Archer23", "Hawkeye", "Precision", "DeadShot", "Marksman", "Robin"]
                .map(String::from)
                .to_vec(),
            darts_per_round: 3,
            power_step: 2,
            max_power: 100,
            optimal_power: 75.0,
            power_penalty: 0.1,
            max_wind: 10.0,
            wind_drift: 0.5,
            aim_jitter: 5.0,
            rival_round_min: 30,
            rival_round_max: 149,
            placement_rewards: vec![100, 70, 50, 50, 30, 30, 30, 30],
            zones: TargetZones::default(),
        }
    }
}

impl ArcheryRules {
    /// Points for one dart aimed at `aim` (target centre is 50,50).
    pub fn dart_score(&self, aim: Aim, power: u32, wind: f64) -> u32 {
        let zones = &self.zones;
        let x = aim.x + wind * self.wind_drift;
        let distance = ((x - 50.0).powi(2) + (aim.y - 50.0).powi(2)).sqrt();
        let d = distance + (f64::from(power) - self.optimal_power).abs() * self.power_penalty;

        if d <= zones.bullseye_radius {
            zones.bullseye_points
        } else if d <= zones.inner_bull_radius {
            zones.inner_bull_points
        } else if d <= zones.ring_radius {
            let base = (21.0 - d).floor().clamp(1.0, 20.0) as u32;
            if (zones.treble.0..=zones.treble.1).contains(&d) {
                base * 3
            } else if (zones.double.0..=zones.double.1).contains(&d) {
                base * 2
            } else {
                base
            }
        } else if d <= zones.outer_radius {
            (10.0 - d / 3.0).floor().max(1.0) as u32
        } else {
            0
        }
    }

    pub fn reward_for(&self, position: usize) -> u64 {
        position
            .checked_sub(1)
            .and_then(|i| self.placement_rewards.get(i))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aim {
    pub x: f64,
    pub y: f64,
}

impl Aim {
    pub const CENTRE: Aim = Aim { x: 50.0, y: 50.0 };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Archer {
    pub name: String,
    pub score: u32,
    pub eliminated: bool,
}

/// `archers[0]` is the human player.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcheryContest {
    pub archers: Vec<Archer>,
    pub round: u32,
    pub darts_thrown: u32,
    pub round_score: u32,
    pub wind: f64,
    pub aim: Aim,
    pub power: u32,
    pub charging: bool,
}

impl ArcheryContest {
    pub fn remaining(&self) -> usize {
        self.archers.iter().filter(|a| !a.eliminated).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcheryInput {
    Aim(Aim),
    StartCharging,
    StopCharging,
    Throw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcheryOutcome {
    pub position: usize,
    pub rounds: u32,
    pub score: u32,
}

fn finished(contest: &ArcheryContest, position: usize) -> Step<ArcheryOutcome> {
    Step::Finished(ArcheryOutcome {
        position,
        rounds: contest.round,
        score: contest.archers.first().map_or(0, |a| a.score),
    })
}

#[derive(Debug, Clone, Default)]
pub struct Archery {
    rules: ArcheryRules,
}

impl Archery {
    pub fn new(rules: ArcheryRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ArcheryRules {
        &self.rules
    }

    fn roll_wind(&self, rng: &mut GameRng) -> f64 {
        rng.uniform(-self.rules.max_wind, self.rules.max_wind)
    }

    fn jittered_aim(&self, rng: &mut GameRng) -> Aim {
        let jitter = self.rules.aim_jitter;
        Aim {
            x: 50.0 + rng.uniform(-jitter, jitter),
            y: 50.0 + rng.uniform(-jitter, jitter),
        }
    }

    /// Scores the round and drops the lowest remaining archer.
    fn end_round(&self, contest: &mut ArcheryContest, rng: &mut GameRng) -> Step<ArcheryOutcome> {
        if let Some(you) = contest.archers.first_mut() {
            you.score += contest.round_score;
        }
        for rival in contest.archers.iter_mut().skip(1).filter(|a| !a.eliminated) {
            rival.score += rng.inclusive(self.rules.rival_round_min, self.rules.rival_round_max);
        }

        let remaining = contest.remaining();
        // ties go out in seating order
        let lowest = contest
            .archers
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.eliminated)
            .min_by_key(|(_, a)| a.score)
            .map(|(i, _)| i);

        match lowest {
            Some(index) if remaining > 1 => {
                contest.archers[index].eliminated = true;
                debug!(round = contest.round, archer = %contest.archers[index].name, "Eliminated");
                if index == 0 {
                    return finished(contest, remaining);
                }
                if remaining - 1 == 1 {
                    return finished(contest, 1);
                }
            }
            _ => return finished(contest, 1),
        }

        contest.round += 1;
        contest.darts_thrown = 0;
        contest.round_score = 0;
        contest.wind = self.roll_wind(rng);
        Step::Continue
    }
}

impl Game for Archery {
    type Active = ArcheryContest;
    type Input = ArcheryInput;
    type Outcome = ArcheryOutcome;

    fn kind(&self) -> GameType {
        GameType::PrecisionArchery
    }

    fn entry_fee(&self) -> u64 {
        self.rules.entry_fee
    }

    fn tick_period(&self) -> Duration {
        Duration::from_millis(self.rules.tick_ms)
    }

    fn begin(&self, rng: &mut GameRng) -> ArcheryContest {
        let archers = std::iter::once("You".to_string())
            .chain(self.rules.rivals.iter().cloned())
            .map(|name| Archer {
                name,
                score: 0,
                eliminated: false,
            })
            .collect();

        ArcheryContest {
            archers,
            round: 1,
            darts_thrown: 0,
            round_score: 0,
            wind: self.roll_wind(rng),
            aim: Aim::CENTRE,
            power: 0,
            charging: false,
        }
    }

    fn tick(&self, contest: &mut ArcheryContest, _rng: &mut GameRng) -> Step<ArcheryOutcome> {
        if contest.charging {
            contest.power = (contest.power + self.rules.power_step).min(self.rules.max_power);
            if contest.power >= self.rules.max_power {
                contest.charging = false;
            }
        }
        Step::Continue
    }

    fn apply(
        &self,
        contest: &mut ArcheryContest,
        input: ArcheryInput,
        rng: &mut GameRng,
    ) -> Result<Step<ArcheryOutcome>, GameError> {
        match input {
            ArcheryInput::Aim(aim) => {
                contest.aim = Aim {
                    x: aim.x.clamp(0.0, 100.0),
                    y: aim.y.clamp(0.0, 100.0),
                };
            }
            ArcheryInput::StartCharging => {
                contest.power = 0;
                contest.charging = true;
            }
            ArcheryInput::StopCharging => contest.charging = false,
            ArcheryInput::Throw => {
                if contest.power == 0 {
                    return Err(GameError::InvalidMove("charge before throwing".into()));
                }

                let points = self.rules.dart_score(contest.aim, contest.power, contest.wind);
                debug!(points, power = contest.power, "Dart thrown");
                contest.round_score += points;
                contest.darts_thrown += 1;
                contest.aim = self.jittered_aim(rng);
                contest.power = 0;
                contest.charging = false;

                if contest.darts_thrown >= self.rules.darts_per_round {
                    return Ok(self.end_round(contest, rng));
                }
            }
        }
        Ok(Step::Continue)
    }

    fn reward(&self, outcome: &ArcheryOutcome) -> u64 {
        self.rules.reward_for(outcome.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Aim {
        Aim { x, y }
    }

    #[test]
    fn dart_scoring_rings() {
        let rules = ArcheryRules::default();
        assert_eq!(rules.dart_score(Aim::CENTRE, 75, 0.0), 50);
        // a 1.5 power penalty still lands in the bullseye
        assert_eq!(rules.dart_score(Aim::CENTRE, 90, 0.0), 50);
        assert_eq!(rules.dart_score(at(54.0, 50.0), 75, 0.0), 25);
        assert_eq!(rules.dart_score(at(56.0, 50.0), 75, 0.0), 15);
        assert_eq!(rules.dart_score(at(60.0, 50.0), 75, 0.0), 33);
        assert_eq!(rules.dart_score(at(50.0, 63.0), 75, 0.0), 16);
        assert_eq!(rules.dart_score(at(50.0, 70.0), 75, 0.0), 3);
        assert_eq!(rules.dart_score(at(0.0, 0.0), 75, 0.0), 0);
    }

    #[test]
    fn wind_pushes_the_dart() {
        let rules = ArcheryRules::default();
        // 10 units of wind drift the dart 5 to the right
        assert_eq!(rules.dart_score(at(45.0, 50.0), 75, 10.0), 50);
        assert_eq!(rules.dart_score(Aim::CENTRE, 75, 10.0), 25);
    }

    #[test]
    fn charging_builds_power_and_caps() {
        let game = Archery::default();
        let mut rng = GameRng::seeded(2);
        let mut contest = game.begin(&mut rng);

        game.apply(&mut contest, ArcheryInput::StartCharging, &mut rng).unwrap();
        for _ in 0..38 {
            game.tick(&mut contest, &mut rng);
        }
        assert_eq!(contest.power, 76);

        for _ in 0..50 {
            game.tick(&mut contest, &mut rng);
        }
        assert_eq!(contest.power, 100);
        assert!(!contest.charging);
    }

    #[test]
    fn throwing_needs_power() {
        let game = Archery::default();
        let mut rng = GameRng::seeded(2);
        let mut contest = game.begin(&mut rng);
        assert!(matches!(
            game.apply(&mut contest, ArcheryInput::Throw, &mut rng),
            Err(GameError::InvalidMove(_))
        ));
    }

    fn throw(game: &Archery, contest: &mut ArcheryContest, aim: Aim, rng: &mut GameRng) -> Step<ArcheryOutcome> {
        contest.wind = 0.0;
        game.apply(contest, ArcheryInput::Aim(aim), rng).unwrap();
        contest.power = 75;
        game.apply(contest, ArcheryInput::Throw, rng).unwrap()
    }

    #[test]
    fn perfect_archer_outlasts_the_field() {
        let game = Archery::default();
        let mut rng = GameRng::seeded(8);
        let mut contest = game.begin(&mut rng);

        let outcome = loop {
            if let Step::Finished(outcome) = throw(&game, &mut contest, Aim::CENTRE, &mut rng) {
                break outcome;
            }
        };

        assert_eq!(outcome.position, 1);
        assert_eq!(outcome.rounds, 7);
        assert_eq!(outcome.score, 7 * 150);
        assert_eq!(contest.remaining(), 1);
        assert_eq!(game.reward(&outcome), 100);
    }

    #[test]
    fn missing_everything_is_out_first() {
        let game = Archery::default();
        let mut rng = GameRng::seeded(8);
        let mut contest = game.begin(&mut rng);

        assert_eq!(throw(&game, &mut contest, at(0.0, 0.0), &mut rng), Step::Continue);
        assert_eq!(throw(&game, &mut contest, at(0.0, 0.0), &mut rng), Step::Continue);
        let Step::Finished(outcome) = throw(&game, &mut contest, at(0.0, 0.0), &mut rng) else {
            panic!("lowest score is eliminated");
        };
        assert_eq!(outcome.position, 8);
        assert_eq!(outcome.score, 0);
        assert_eq!(game.reward(&outcome), 30);
    }

    #[test]
    fn placement_table() {
        let rules = ArcheryRules::default();
        let rewards: Vec<u64> = (1..=9).map(|p| rules.reward_for(p)).collect();
        assert_eq!(rewards, vec![100, 70, 50, 50, 30, 30, 30, 30, 0]);
    }
}
