use games::{
    archery::{Aim, Archery, ArcheryContest, ArcheryInput},
    crossword::{Crossword, CrosswordBoard, CrosswordInput, Puzzle},
    snake::{Direction, Position, Snake, SnakeBoard},
    uno::{favourite_color, Turn, Uno, UnoInput, UnoTable},
    Game, GameRng,
};

/// Stands in for the player: looks at each new state and decides the next input.
pub trait Autopilot<G: Game> {
    fn next_input(&mut self, active: &G::Active) -> Option<G::Input>;
}

/// For games the player only watches.
pub struct Spectator;

impl<G: Game> Autopilot<G> for Spectator {
    fn next_input(&mut self, _active: &G::Active) -> Option<G::Input> {
        None
    }
}

/// Greedy: the safe direction that gets closest to the food.
pub struct SnakePilot {
    grid_size: i32,
}

impl SnakePilot {
    pub fn new(grid_size: i32) -> Self {
        Self { grid_size }
    }

    fn is_safe(&self, board: &SnakeBoard, at: Position) -> bool {
        (0..self.grid_size).contains(&at.x)
            && (0..self.grid_size).contains(&at.y)
            && !board.body.contains(&at)
    }
}

impl Autopilot<Snake> for SnakePilot {
    fn next_input(&mut self, board: &SnakeBoard) -> Option<Direction> {
        let head = board.head()?;
        let step = |direction: Direction| {
            let (dx, dy) = match direction {
                Direction::Up => (0, -1),
                Direction::Down => (0, 1),
                Direction::Left => (-1, 0),
                Direction::Right => (1, 0),
            };
            Position::new(head.x + dx, head.y + dy)
        };
        let distance = |at: Position| (at.x - board.food.x).abs() + (at.y - board.food.y).abs();

        let best = [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
            .into_iter()
            .filter(|direction| *direction != board.heading.opposite())
            .filter(|direction| self.is_safe(board, step(*direction)))
            .min_by_key(|direction| (distance(step(*direction)), *direction != board.heading))?;

        (best != board.heading).then_some(best)
    }
}

/// Types the answers in, one cell per step.
pub struct CrosswordPilot {
    puzzle: Puzzle,
}

impl CrosswordPilot {
    pub fn new(game: &Crossword) -> Self {
        Self {
            puzzle: game.puzzle().clone(),
        }
    }
}

impl Autopilot<Crossword> for CrosswordPilot {
    fn next_input(&mut self, board: &CrosswordBoard) -> Option<CrosswordInput> {
        self.puzzle
            .clues
            .iter()
            .flat_map(|clue| clue.cells())
            .find(|((row, col), letter)| board.grid[*row][*col] != Some(*letter))
            .map(|((row, col), letter)| CrosswordInput::Enter {
                row,
                col,
                letter: letter.to_ascii_lowercase(),
            })
    }
}

/// Plays the first coloured match, keeps wilds for last, draws when stuck.
pub struct UnoPilot;

impl Autopilot<Uno> for UnoPilot {
    fn next_input(&mut self, table: &UnoTable) -> Option<UnoInput> {
        if table.turn != Turn::Player {
            return None;
        }

        let playable = table.playable_cards();
        let choice = playable
            .iter()
            .find(|card| !card.is_wild())
            .or_else(|| playable.first());

        Some(match choice {
            Some(card) => UnoInput::Play {
                card_id: card.id,
                declared: card
                    .is_wild()
                    .then(|| {
                        let rest: Vec<_> = table
                            .player_hand
                            .iter()
                            .copied()
                            .filter(|other| other.id != card.id)
                            .collect();
                        favourite_color(&rest)
                    })
                    .flatten(),
            },
            None => UnoInput::Draw,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stance {
    Aiming,
    Drawing,
    Charging,
}

/// Compensates for wind, then releases near the ideal power. A steadiness of
/// zero never misses.
pub struct ArcheryPilot {
    rng: GameRng,
    stance: Stance,
    wobble: f64,
    release_at: u32,
    wind_drift: f64,
}

impl ArcheryPilot {
    pub fn new(game: &Archery, rng: GameRng, wobble: f64) -> Self {
        Self {
            rng,
            stance: Stance::Aiming,
            wobble,
            release_at: game.rules().optimal_power.round() as u32,
            wind_drift: game.rules().wind_drift,
        }
    }
}

impl Autopilot<Archery> for ArcheryPilot {
    fn next_input(&mut self, contest: &ArcheryContest) -> Option<ArcheryInput> {
        match self.stance {
            Stance::Aiming => {
                self.stance = Stance::Drawing;
                let wobble = self.wobble;
                Some(ArcheryInput::Aim(Aim {
                    x: 50.0 - contest.wind * self.wind_drift + self.rng.uniform(-wobble, wobble),
                    y: 50.0 + self.rng.uniform(-wobble, wobble),
                }))
            }
            Stance::Drawing => {
                self.stance = Stance::Charging;
                Some(ArcheryInput::StartCharging)
            }
            Stance::Charging if contest.power >= self.release_at || !contest.charging => {
                self.stance = Stance::Aiming;
                Some(ArcheryInput::Throw)
            }
            Stance::Charging => None,
        }
    }
}
