use std::{collections::HashMap, time::Duration};

use common::utils::GameType;
use serde::{Deserialize, Serialize};

use crate::{
    rng::GameRng,
    session::{Game, GameError, Step},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueDirection {
    Across,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub number: u32,
    pub clue: String,
    pub answer: String,
    pub row: usize,
    pub col: usize,
    pub direction: ClueDirection,
}

impl Clue {
    fn new(number: u32, clue: &str, answer: &str, (row, col): (usize, usize), direction: ClueDirection) -> Self {
        Self {
            number,
            clue: clue.to_string(),
            answer: answer.to_string(),
            row,
            col,
            direction,
        }
    }

    /// Cells covered by the answer, paired with the expected letter.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), char)> + '_ {
        self.answer.chars().enumerate().map(move |(i, letter)| {
            let cell = match self.direction {
                ClueDirection::Across => (self.row, self.col + i),
                ClueDirection::Down => (self.row + i, self.col),
            };
            (cell, letter)
        })
    }
}

pub type Grid = Vec<Vec<Option<char>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub rows: usize,
    pub cols: usize,
    pub clues: Vec<Clue>,
}

impl Default for Puzzle {
    fn default() -> Self {
        use ClueDirection::*;
        Self {
            rows: 5,
            cols: 3,
            clues: vec![
                Clue::new(1, "Feline pet", "CAT", (0, 0), Across),
                Clue::new(2, "Great sorrow", "WOE", (2, 0), Across),
                Clue::new(3, "Flying mammal", "BAT", (4, 0), Across),
                Clue::new(4, "Farm animal that moos", "COW", (0, 0), Down),
                Clue::new(5, "Digit on a foot", "TOE", (0, 2), Down),
            ],
        }
    }
}

impl Puzzle {
    /// Every answer must be upper-case letters inside the grid, and crossing
    /// answers must agree on the shared letter.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.clues.is_empty() {
            return Err(GameError::InvalidRules("crossword has no clues".into()));
        }

        let mut letters: HashMap<(usize, usize), char> = HashMap::new();
        for clue in &self.clues {
            if clue.answer.is_empty() || !clue.answer.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(GameError::InvalidRules(format!(
                    "clue {} answer {:?} must be upper-case letters",
                    clue.number, clue.answer
                )));
            }
            for ((row, col), letter) in clue.cells() {
                if row >= self.rows || col >= self.cols {
                    return Err(GameError::InvalidRules(format!(
                        "clue {} runs off the grid at ({row}, {col})",
                        clue.number
                    )));
                }
                match letters.insert((row, col), letter) {
                    Some(existing) if existing != letter => {
                        return Err(GameError::InvalidRules(format!(
                            "clue {} puts {letter} where another answer has {existing} at ({row}, {col})",
                            clue.number
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn empty_grid(&self) -> Grid {
        vec![vec![None; self.cols]; self.rows]
    }

    pub fn is_cell_active(&self, row: usize, col: usize) -> bool {
        self.clues
            .iter()
            .any(|clue| clue.cells().any(|(cell, _)| cell == (row, col)))
    }

    /// Number printed in the corner of a cell that starts a clue.
    pub fn clue_number_at(&self, row: usize, col: usize) -> Option<u32> {
        self.clues
            .iter()
            .filter(|clue| (clue.row, clue.col) == (row, col))
            .map(|clue| clue.number)
            .min()
    }

    pub fn is_solved(&self, grid: &Grid, clue: &Clue) -> bool {
        clue.cells()
            .all(|((row, col), letter)| grid.get(row).and_then(|r| r.get(col)).copied().flatten() == Some(letter))
    }

    pub fn solved_clues(&self, grid: &Grid) -> Vec<u32> {
        self.clues
            .iter()
            .filter(|clue| self.is_solved(grid, clue))
            .map(|clue| clue.number)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosswordRules {
    pub entry_fee: u64,
    pub reward: u64,
    pub puzzle: Puzzle,
}

impl Default for CrosswordRules {
    fn default() -> Self {
        Self {
            entry_fee: 45,
            reward: 120,
            puzzle: Puzzle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrosswordBoard {
    pub grid: Grid,
    pub solved: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrosswordInput {
    Enter { row: usize, col: usize, letter: char },
    Clear { row: usize, col: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrosswordOutcome {
    pub grid: Grid,
}

#[derive(Debug, Clone, Default)]
pub struct Crossword {
    rules: CrosswordRules,
}

impl Crossword {
    pub fn new(rules: CrosswordRules) -> Self {
        Self { rules }
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.rules.puzzle
    }

    fn cell_mut<'g>(&self, grid: &'g mut Grid, row: usize, col: usize) -> Result<&'g mut Option<char>, GameError> {
        if !self.rules.puzzle.is_cell_active(row, col) {
            return Err(GameError::OutOfBounds { row, col });
        }
        grid.get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(GameError::OutOfBounds { row, col })
    }
}

impl Game for Crossword {
    type Active = CrosswordBoard;
    type Input = CrosswordInput;
    type Outcome = CrosswordOutcome;

    fn kind(&self) -> GameType {
        GameType::Crossword
    }

    fn entry_fee(&self) -> u64 {
        self.rules.entry_fee
    }

    /// Untimed; ticks are idle.
    fn tick_period(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn begin(&self, _rng: &mut GameRng) -> CrosswordBoard {
        CrosswordBoard {
            grid: self.rules.puzzle.empty_grid(),
            solved: Vec::new(),
        }
    }

    fn tick(&self, _board: &mut CrosswordBoard, _rng: &mut GameRng) -> Step<CrosswordOutcome> {
        Step::Continue
    }

    fn apply(
        &self,
        board: &mut CrosswordBoard,
        input: CrosswordInput,
        _rng: &mut GameRng,
    ) -> Result<Step<CrosswordOutcome>, GameError> {
        match input {
            CrosswordInput::Enter { row, col, letter } => {
                if !letter.is_ascii_alphabetic() {
                    return Err(GameError::InvalidMove(format!("{letter:?} is not a letter")));
                }
                *self.cell_mut(&mut board.grid, row, col)? = Some(letter.to_ascii_uppercase());
            }
            CrosswordInput::Clear { row, col } => {
                *self.cell_mut(&mut board.grid, row, col)? = None;
            }
        }

        board.solved = self.rules.puzzle.solved_clues(&board.grid);
        if board.solved.len() == self.rules.puzzle.clues.len() {
            return Ok(Step::Finished(CrosswordOutcome {
                grid: board.grid.clone(),
            }));
        }
        Ok(Step::Continue)
    }

    fn reward(&self, _outcome: &CrosswordOutcome) -> u64 {
        self.rules.reward
    }
}
