use std::{fmt, time::Duration};

use common::utils::GameType;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    rng::GameRng,
    session::{Game, GameError, Step},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Face::Number(n) => write!(f, "{n}"),
            Face::Skip => f.write_str("skip"),
            Face::Reverse => f.write_str("reverse"),
            Face::DrawTwo => f.write_str("+2"),
            Face::Wild => f.write_str("wild"),
            Face::WildDrawFour => f.write_str("+4"),
        }
    }
}

/// Wild cards carry no colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub id: u32,
    pub color: Option<Color>,
    pub face: Face,
}

impl Card {
    pub fn is_wild(&self) -> bool {
        self.color.is_none()
    }
}

/// 108 cards: per colour one 0, two of each 1-9, skip, reverse and +2; plus
/// four wild and four wild +4.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(108);
    let mut push = |color: Option<Color>, face: Face| {
        let id = deck.len() as u32;
        deck.push(Card { id, color, face });
    };

    for color in Color::ALL {
        push(Some(color), Face::Number(0));
        for _ in 0..2 {
            for n in 1..=9 {
                push(Some(color), Face::Number(n));
            }
            push(Some(color), Face::Skip);
            push(Some(color), Face::Reverse);
            push(Some(color), Face::DrawTwo);
        }
    }
    for _ in 0..4 {
        push(None, Face::Wild);
        push(None, Face::WildDrawFour);
    }
    deck
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnoRules {
    pub entry_fee: u64,
    pub hand_size: usize,
    pub tick_ms: u64,
    pub win_reward: u64,
}

impl Default for UnoRules {
    fn default() -> Self {
        Self {
            entry_fee: 45,
            hand_size: 5,
            tick_ms: 1_500,
            win_reward: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Player,
    Computer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnoTable {
    pub player_hand: Vec<Card>,
    pub computer_hand: Vec<Card>,
    pub draw_pile: Vec<Card>,
    /// Played cards under `top`, shuffled back in when the draw pile runs out.
    pub discard_pile: Vec<Card>,
    pub top: Card,
    /// `None` after an undeclared wild, when only wilds and equal faces match.
    pub active_color: Option<Color>,
    pub turn: Turn,
    /// Consecutive draws that found no card at all.
    pub stalled_draws: u8,
}

impl UnoTable {
    pub fn is_playable(&self, card: &Card) -> bool {
        card.is_wild() || (card.color.is_some() && card.color == self.active_color) || card.face == self.top.face
    }

    pub fn playable_cards(&self) -> Vec<Card> {
        self.player_hand
            .iter()
            .copied()
            .filter(|card| self.is_playable(card))
            .collect()
    }

    fn discard(&mut self, card: Card, declared: Option<Color>) {
        let covered = std::mem::replace(&mut self.top, card);
        self.discard_pile.push(covered);
        self.active_color = card.color.or(declared);
        self.stalled_draws = 0;
    }

    fn draw(&mut self, rng: &mut GameRng) -> Option<Card> {
        if self.draw_pile.is_empty() && !self.discard_pile.is_empty() {
            self.draw_pile = std::mem::take(&mut self.discard_pile);
            rng.shuffle(&mut self.draw_pile);
            debug!(cards = self.draw_pile.len(), "Reshuffled the discards");
        }
        self.draw_pile.pop()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnoInput {
    Play { card_id: u32, declared: Option<Color> },
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Player,
    Computer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnoOutcome {
    pub winner: Winner,
    pub player_cards_left: usize,
    pub computer_cards_left: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Uno {
    rules: UnoRules,
}

impl Uno {
    pub fn new(rules: UnoRules) -> Self {
        Self { rules }
    }

    fn computer_turn(&self, table: &mut UnoTable, rng: &mut GameRng) -> Step<UnoOutcome> {
        let playable: Vec<usize> = table
            .computer_hand
            .iter()
            .enumerate()
            .filter(|(_, card)| table.is_playable(card))
            .map(|(i, _)| i)
            .collect();

        match rng.pick(&playable) {
            Some(index) => {
                let card = table.computer_hand.remove(index);
                let declared = card.is_wild().then(|| favourite_color(&table.computer_hand)).flatten();
                debug!(face = %card.face, "Computer plays");
                table.discard(card, declared);
                if table.computer_hand.is_empty() {
                    return finished(table, Winner::Computer);
                }
            }
            None => {
                debug!(hand = table.computer_hand.len(), "Computer draws");
                if let Some(end) = draw_for(table, Turn::Computer, rng) {
                    return end;
                }
            }
        }

        table.turn = Turn::Player;
        Step::Continue
    }
}

/// Most frequent colour in the hand, ties broken in [`Color::ALL`] order.
pub fn favourite_color(hand: &[Card]) -> Option<Color> {
    Color::ALL
        .iter()
        .rev()
        .map(|color| (hand.iter().filter(|card| card.color == Some(*color)).count(), *color))
        .filter(|(count, _)| *count > 0)
        .max_by_key(|(count, _)| *count)
        .map(|(_, color)| color)
}

/// Draws one card for `side`. Two draws in a row from an exhausted deck end the
/// game: the smaller hand wins and a tie goes to the computer.
fn draw_for(table: &mut UnoTable, side: Turn, rng: &mut GameRng) -> Option<Step<UnoOutcome>> {
    match table.draw(rng) {
        Some(card) => {
            match side {
                Turn::Player => table.player_hand.push(card),
                Turn::Computer => table.computer_hand.push(card),
            }
            table.stalled_draws = 0;
            None
        }
        None => {
            table.stalled_draws += 1;
            if table.stalled_draws < 2 {
                return None;
            }
            let winner = if table.player_hand.len() < table.computer_hand.len() {
                Winner::Player
            } else {
                Winner::Computer
            };
            debug!(?winner, "Deck exhausted, nobody can move");
            Some(finished(table, winner))
        }
    }
}

fn finished(table: &UnoTable, winner: Winner) -> Step<UnoOutcome> {
    Step::Finished(UnoOutcome {
        winner,
        player_cards_left: table.player_hand.len(),
        computer_cards_left: table.computer_hand.len(),
    })
}

impl Game for Uno {
    type Active = UnoTable;
    type Input = UnoInput;
    type Outcome = UnoOutcome;

    fn kind(&self) -> GameType {
        GameType::Uno
    }

    fn entry_fee(&self) -> u64 {
        self.rules.entry_fee
    }

    fn tick_period(&self) -> Duration {
        Duration::from_millis(self.rules.tick_ms)
    }

    fn begin(&self, rng: &mut GameRng) -> UnoTable {
        let mut deck = build_deck();
        rng.shuffle(&mut deck);

        let hand = self.rules.hand_size.min(deck.len() / 2 - 1);
        let player_hand: Vec<Card> = deck.drain(..hand).collect();
        let computer_hand: Vec<Card> = deck.drain(..hand).collect();
        let top = deck.remove(0);

        UnoTable {
            player_hand,
            computer_hand,
            active_color: top.color,
            top,
            draw_pile: deck,
            discard_pile: Vec::new(),
            turn: Turn::Player,
            stalled_draws: 0,
        }
    }

    /// The computer moves on the first tick after the player's turn.
    fn tick(&self, table: &mut UnoTable, rng: &mut GameRng) -> Step<UnoOutcome> {
        match table.turn {
            Turn::Computer => self.computer_turn(table, rng),
            Turn::Player => Step::Continue,
        }
    }

    fn apply(
        &self,
        table: &mut UnoTable,
        input: UnoInput,
        rng: &mut GameRng,
    ) -> Result<Step<UnoOutcome>, GameError> {
        if table.turn != Turn::Player {
            return Err(GameError::NotYourTurn);
        }

        match input {
            UnoInput::Play { card_id, declared } => {
                let index = table
                    .player_hand
                    .iter()
                    .position(|card| card.id == card_id)
                    .ok_or_else(|| GameError::InvalidMove(format!("card {card_id} is not in your hand")))?;
                let card = table.player_hand[index];
                if !table.is_playable(&card) {
                    return Err(GameError::InvalidMove(format!("{} does not match", card.face)));
                }

                table.player_hand.remove(index);
                table.discard(card, declared);
                if table.player_hand.is_empty() {
                    return Ok(finished(table, Winner::Player));
                }
            }
            UnoInput::Draw => {
                if let Some(end) = draw_for(table, Turn::Player, rng) {
                    return Ok(end);
                }
            }
        }

        table.turn = Turn::Computer;
        Ok(Step::Continue)
    }

    fn reward(&self, outcome: &UnoOutcome) -> u64 {
        match outcome.winner {
            Winner::Player => self.rules.win_reward,
            Winner::Computer => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: u32, color: Option<Color>, face: Face) -> Card {
        Card { id, color, face }
    }

    fn table(player: Vec<Card>, computer: Vec<Card>, top: Card) -> UnoTable {
        UnoTable {
            player_hand: player,
            computer_hand: computer,
            draw_pile: vec![card(900, Some(Color::Green), Face::Number(4))],
            discard_pile: vec![],
            active_color: top.color,
            top,
            turn: Turn::Player,
            stalled_draws: 0,
        }
    }

    #[test]
    fn deck_composition() {
        let deck = build_deck();
        assert_eq!(deck.len(), 108);
        assert_eq!(deck.iter().filter(|c| c.is_wild()).count(), 8);
        assert_eq!(deck.iter().filter(|c| c.face == Face::Number(0)).count(), 4);
        assert_eq!(
            deck.iter()
                .filter(|c| c.color == Some(Color::Red) && c.face == Face::Number(7))
                .count(),
            2
        );
        let mut ids: Vec<u32> = deck.iter().map(|c| c.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 108);
    }

    #[test]
    fn deal_leaves_the_rest_in_the_pile() {
        let game = Uno::default();
        let table = game.begin(&mut GameRng::seeded(5));
        assert_eq!(table.player_hand.len(), 5);
        assert_eq!(table.computer_hand.len(), 5);
        assert_eq!(table.draw_pile.len(), 97);
        assert_eq!(table.active_color, table.top.color);
        assert_eq!(table.turn, Turn::Player);
    }

    #[test]
    fn matching_rule() {
        let top = card(0, Some(Color::Red), Face::Number(5));
        let t = table(vec![], vec![], top);
        assert!(t.is_playable(&card(1, Some(Color::Red), Face::Skip)));
        assert!(t.is_playable(&card(2, Some(Color::Blue), Face::Number(5))));
        assert!(t.is_playable(&card(3, None, Face::Wild)));
        assert!(!t.is_playable(&card(4, Some(Color::Blue), Face::Number(6))));
    }

    #[test]
    fn undeclared_wild_matches_only_wilds_and_faces() {
        let top = card(0, None, Face::Wild);
        let t = table(vec![], vec![], top);
        assert!(!t.is_playable(&card(1, Some(Color::Red), Face::Number(1))));
        assert!(t.is_playable(&card(2, None, Face::Wild)));
        assert!(t.is_playable(&card(3, None, Face::WildDrawFour)));
    }

    #[test]
    fn unplayable_card_is_rejected() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, Some(Color::Blue), Face::Number(6)), card(2, Some(Color::Red), Face::Number(2))],
            vec![card(3, Some(Color::Red), Face::Number(8))],
            card(0, Some(Color::Red), Face::Number(5)),
        );

        let err = game
            .apply(&mut t, UnoInput::Play { card_id: 1, declared: None }, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidMove(_)));
        let err = game
            .apply(&mut t, UnoInput::Play { card_id: 42, declared: None }, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidMove(_)));
        assert_eq!(t.player_hand.len(), 2);
        assert_eq!(t.turn, Turn::Player);
    }

    #[test]
    fn turns_alternate_and_the_computer_answers_on_tick() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, Some(Color::Red), Face::Number(2)), card(2, Some(Color::Yellow), Face::Number(9))],
            vec![card(3, Some(Color::Red), Face::Number(8)), card(4, Some(Color::Blue), Face::Number(1))],
            card(0, Some(Color::Red), Face::Number(5)),
        );

        assert_eq!(
            game.apply(&mut t, UnoInput::Play { card_id: 1, declared: None }, &mut rng),
            Ok(Step::Continue)
        );
        assert_eq!(t.turn, Turn::Computer);
        assert_eq!(
            game.apply(&mut t, UnoInput::Draw, &mut rng),
            Err(GameError::NotYourTurn)
        );

        assert_eq!(game.tick(&mut t, &mut rng), Step::Continue);
        assert_eq!(t.top.id, 3);
        assert_eq!(t.computer_hand.len(), 1);
        assert_eq!(t.turn, Turn::Player);
    }

    #[test]
    fn computer_draws_when_stuck() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, Some(Color::Red), Face::Number(2))],
            vec![card(3, Some(Color::Blue), Face::Number(8))],
            card(0, Some(Color::Red), Face::Number(5)),
        );
        t.turn = Turn::Computer;

        assert_eq!(game.tick(&mut t, &mut rng), Step::Continue);
        assert_eq!(t.computer_hand.len(), 2);
        assert!(t.draw_pile.is_empty());
        assert_eq!(t.top.id, 0);
        assert_eq!(t.turn, Turn::Player);
    }

    #[test]
    fn empty_draw_pile_is_refilled_from_the_discards() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, Some(Color::Red), Face::Number(2)), card(2, Some(Color::Blue), Face::Number(7))],
            vec![card(3, Some(Color::Yellow), Face::Number(8))],
            card(0, Some(Color::Red), Face::Number(5)),
        );
        t.draw_pile.clear();

        game.apply(&mut t, UnoInput::Play { card_id: 1, declared: None }, &mut rng)
            .unwrap();
        assert_eq!(t.discard_pile, vec![card(0, Some(Color::Red), Face::Number(5))]);

        // yellow 8 cannot follow red 2, so the computer takes the old top back
        assert_eq!(game.tick(&mut t, &mut rng), Step::Continue);
        assert_eq!(t.computer_hand.len(), 2);
        assert!(t.computer_hand.iter().any(|c| c.id == 0));
        assert!(t.discard_pile.is_empty());
        assert_eq!(t.stalled_draws, 0);
    }

    #[test]
    fn exhausted_deck_ends_in_favour_of_the_smaller_hand() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, Some(Color::Blue), Face::Number(6))],
            vec![card(3, Some(Color::Green), Face::Number(8)), card(4, Some(Color::Yellow), Face::Number(1))],
            card(0, Some(Color::Red), Face::Number(5)),
        );
        t.draw_pile.clear();

        assert_eq!(game.apply(&mut t, UnoInput::Draw, &mut rng), Ok(Step::Continue));
        assert_eq!(t.stalled_draws, 1);
        assert_eq!(t.turn, Turn::Computer);

        let Step::Finished(outcome) = game.tick(&mut t, &mut rng) else {
            panic!("neither side can move");
        };
        assert_eq!(outcome.winner, Winner::Player);
        assert_eq!(outcome.player_cards_left, 1);
        assert_eq!(outcome.computer_cards_left, 2);
        assert_eq!(game.reward(&outcome), 90);
    }

    #[test]
    fn stalled_tie_goes_to_the_computer() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, Some(Color::Blue), Face::Number(6))],
            vec![card(3, Some(Color::Green), Face::Number(8))],
            card(0, Some(Color::Red), Face::Number(5)),
        );
        t.draw_pile.clear();
        t.turn = Turn::Computer;

        assert_eq!(game.tick(&mut t, &mut rng), Step::Continue);
        let Ok(Step::Finished(outcome)) = game.apply(&mut t, UnoInput::Draw, &mut rng) else {
            panic!("neither side can move");
        };
        assert_eq!(outcome.winner, Winner::Computer);
    }

    #[test]
    fn declared_wild_sets_the_colour() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, None, Face::Wild), card(2, Some(Color::Red), Face::Number(2))],
            vec![card(3, Some(Color::Blue), Face::Number(8))],
            card(0, Some(Color::Red), Face::Number(5)),
        );

        game.apply(
            &mut t,
            UnoInput::Play {
                card_id: 1,
                declared: Some(Color::Blue),
            },
            &mut rng,
        )
        .unwrap();
        assert_eq!(t.active_color, Some(Color::Blue));

        let Step::Finished(outcome) = game.tick(&mut t, &mut rng) else {
            panic!("computer plays its last card");
        };
        assert_eq!(outcome.winner, Winner::Computer);
        assert_eq!(game.reward(&outcome), 0);
    }

    #[test]
    fn emptying_your_hand_wins() {
        let game = Uno::default();
        let mut rng = GameRng::seeded(1);
        let mut t = table(
            vec![card(1, Some(Color::Red), Face::Skip)],
            vec![card(3, Some(Color::Blue), Face::Number(8))],
            card(0, Some(Color::Red), Face::Number(5)),
        );

        let Ok(Step::Finished(outcome)) =
            game.apply(&mut t, UnoInput::Play { card_id: 1, declared: None }, &mut rng)
        else {
            panic!("last card wins");
        };
        assert_eq!(outcome.winner, Winner::Player);
        assert_eq!(outcome.computer_cards_left, 1);
        assert_eq!(game.reward(&outcome), 90);
    }

    #[test]
    fn computer_declares_its_strongest_colour() {
        let hand = [
            card(1, Some(Color::Green), Face::Number(1)),
            card(2, Some(Color::Green), Face::Number(2)),
            card(3, Some(Color::Red), Face::Number(3)),
            card(4, None, Face::Wild),
        ];
        assert_eq!(favourite_color(&hand), Some(Color::Green));
        assert_eq!(favourite_color(&hand[3..]), None);
        assert_eq!(
            favourite_color(&[card(1, Some(Color::Yellow), Face::Skip), card(2, Some(Color::Red), Face::Skip)]),
            Some(Color::Red)
        );
    }
}
