use std::{collections::VecDeque, time::Duration};

use common::utils::GameType;
use serde::{Deserialize, Serialize};

use crate::{
    rng::GameRng,
    session::{Game, GameError, Step},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeRules {
    pub entry_fee: u64,
    pub grid_size: i32,
    pub tick_ms: u64,
    pub points_per_food: u64,
    pub reward_divisor: u64,
    pub max_reward: u64,
    pub start: Position,
    pub first_food: Position,
}

impl Default for SnakeRules {
    fn default() -> Self {
        Self {
            entry_fee: 45,
            grid_size: 20,
            tick_ms: 150,
            points_per_food: 10,
            reward_divisor: 2,
            max_reward: 100,
            start: Position::new(10, 10),
            first_food: Position::new(15, 15),
        }
    }
}

impl SnakeRules {
    pub fn reward_for(&self, score: u64) -> u64 {
        (score / self.reward_divisor.max(1)).min(self.max_reward)
    }

    fn contains(&self, at: Position) -> bool {
        (0..self.grid_size).contains(&at.x) && (0..self.grid_size).contains(&at.y)
    }
}

/// Head is at the front.
#[derive(Debug, Clone, PartialEq)]
pub struct SnakeBoard {
    pub body: VecDeque<Position>,
    pub food: Position,
    pub heading: Direction,
    pub score: u64,
}

impl SnakeBoard {
    pub fn head(&self) -> Option<Position> {
        self.body.front().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Wall,
    Tail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnakeOutcome {
    pub score: u64,
    pub length: usize,
    pub collision: Collision,
}

fn finished(board: &SnakeBoard, collision: Collision) -> Step<SnakeOutcome> {
    Step::Finished(SnakeOutcome {
        score: board.score,
        length: board.body.len(),
        collision,
    })
}

#[derive(Debug, Clone, Default)]
pub struct Snake {
    rules: SnakeRules,
}

impl Snake {
    pub fn new(rules: SnakeRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &SnakeRules {
        &self.rules
    }

    fn spawn_food(&self, body: &VecDeque<Position>, rng: &mut GameRng) -> Option<Position> {
        let free: Vec<Position> = (0..self.rules.grid_size)
            .flat_map(|y| (0..self.rules.grid_size).map(move |x| Position::new(x, y)))
            .filter(|cell| !body.contains(cell))
            .collect();
        rng.pick(&free)
    }
}

impl Game for Snake {
    type Active = SnakeBoard;
    type Input = Direction;
    type Outcome = SnakeOutcome;

    fn kind(&self) -> GameType {
        GameType::Snake
    }

    fn entry_fee(&self) -> u64 {
        self.rules.entry_fee
    }

    fn tick_period(&self) -> Duration {
        Duration::from_millis(self.rules.tick_ms)
    }

    fn begin(&self, _rng: &mut GameRng) -> SnakeBoard {
        SnakeBoard {
            body: VecDeque::from([self.rules.start]),
            food: self.rules.first_food,
            heading: Direction::Up,
            score: 0,
        }
    }

    fn tick(&self, board: &mut SnakeBoard, rng: &mut GameRng) -> Step<SnakeOutcome> {
        let Some(head) = board.head() else {
            return finished(board, Collision::Tail);
        };
        let (dx, dy) = board.heading.delta();
        let next = Position::new(head.x + dx, head.y + dy);

        if !self.rules.contains(next) {
            return finished(board, Collision::Wall);
        }
        // checked before the tail moves, so chasing the tail is a collision
        if board.body.contains(&next) {
            return finished(board, Collision::Tail);
        }

        board.body.push_front(next);
        if next == board.food {
            board.score += self.rules.points_per_food;
            match self.spawn_food(&board.body, rng) {
                Some(food) => board.food = food,
                None => return finished(board, Collision::Tail),
            }
        } else {
            board.body.pop_back();
        }

        Step::Continue
    }

    /// Reversing onto the body is ignored rather than rejected.
    fn apply(
        &self,
        board: &mut SnakeBoard,
        heading: Direction,
        _rng: &mut GameRng,
    ) -> Result<Step<SnakeOutcome>, GameError> {
        if heading != board.heading.opposite() {
            board.heading = heading;
        }
        Ok(Step::Continue)
    }

    fn reward(&self, outcome: &SnakeOutcome) -> u64 {
        self.rules.reward_for(outcome.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play() -> (Snake, SnakeBoard, GameRng) {
        let snake = Snake::default();
        let mut rng = GameRng::seeded(9);
        let board = snake.begin(&mut rng);
        (snake, board, rng)
    }

    #[test]
    fn starts_centered_heading_up() {
        let (_, board, _) = play();
        assert_eq!(board.head(), Some(Position::new(10, 10)));
        assert_eq!(board.food, Position::new(15, 15));
        assert_eq!(board.heading, Direction::Up);
    }

    #[test]
    fn hits_the_top_wall() {
        let (snake, mut board, mut rng) = play();
        for _ in 0..10 {
            assert_eq!(snake.tick(&mut board, &mut rng), Step::Continue);
        }
        assert_eq!(board.head(), Some(Position::new(10, 0)));
        let Step::Finished(outcome) = snake.tick(&mut board, &mut rng) else {
            panic!("expected a wall collision");
        };
        assert_eq!(outcome.collision, Collision::Wall);
        assert_eq!(snake.reward(&outcome), 0);
    }

    #[test]
    fn eating_grows_and_respawns_food() {
        let (snake, mut board, mut rng) = play();
        board.food = Position::new(10, 9);

        assert_eq!(snake.tick(&mut board, &mut rng), Step::Continue);
        assert_eq!(board.score, 10);
        assert_eq!(board.body.len(), 2);
        assert!(!board.body.contains(&board.food));
        assert!(snake.rules().contains(board.food));
    }

    #[test]
    fn reversal_is_ignored() {
        let (snake, mut board, mut rng) = play();
        snake.apply(&mut board, Direction::Down, &mut rng).unwrap();
        assert_eq!(board.heading, Direction::Up);
        snake.apply(&mut board, Direction::Left, &mut rng).unwrap();
        assert_eq!(board.heading, Direction::Left);
    }

    #[test]
    fn running_into_the_body_ends_the_game() {
        let (snake, mut board, mut rng) = play();
        // head at (5,5) moving down into its own body loop
        board.body = VecDeque::from([
            Position::new(5, 5),
            Position::new(6, 5),
            Position::new(6, 6),
            Position::new(5, 6),
            Position::new(4, 6),
        ]);
        board.heading = Direction::Down;
        board.score = 40;

        let Step::Finished(outcome) = snake.tick(&mut board, &mut rng) else {
            panic!("expected a body collision");
        };
        assert_eq!(outcome.collision, Collision::Tail);
        assert_eq!(outcome.length, 5);
        assert_eq!(snake.reward(&outcome), 20);
    }

    #[test]
    fn reward_is_half_the_score_capped() {
        let rules = SnakeRules::default();
        assert_eq!(rules.reward_for(0), 0);
        assert_eq!(rules.reward_for(30), 15);
        assert_eq!(rules.reward_for(200), 100);
        assert_eq!(rules.reward_for(250), 100);
    }
}
