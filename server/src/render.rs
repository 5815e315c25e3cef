use chrono::{DateTime, Utc};
use colored::Colorize;
use common::models::{GameRoom, PlayerStats, RoomPlayer, Tournament};
use games::{
    archery::ArcheryOutcome,
    crossword::CrosswordOutcome,
    fruit_luck::FruitLuckOutcome,
    lucky_ducks::{LuckyDucksOutcome, Payline},
    mario_dash::RaceOutcome,
    snake::{Collision, SnakeOutcome},
    uno::{UnoOutcome, Winner},
    Settlement,
};
use wallet::{format_countdown, short_address, ClaimOutcome};

/// One-line result shown under the game-over banner.
pub trait Describe {
    fn describe(&self) -> String;
}

impl Describe for SnakeOutcome {
    fn describe(&self) -> String {
        let hit = match self.collision {
            Collision::Wall => "the wall",
            Collision::Tail => "your own tail",
        };
        format!("Score {} at length {}, ran into {hit}", self.score, self.length)
    }
}

impl Describe for FruitLuckOutcome {
    fn describe(&self) -> String {
        let reels: Vec<&str> = self.symbols.iter().map(|fruit| fruit.emoji()).collect();
        let verdict = if self.is_jackpot() { "JACKPOT!" } else { "no match" };
        format!("{} {verdict}", reels.join(" "))
    }
}

impl Describe for LuckyDucksOutcome {
    fn describe(&self) -> String {
        let rows: Vec<String> = (0..3)
            .map(|row| {
                Payline::Row(row)
                    .symbols(&self.reels)
                    .iter()
                    .map(|symbol| symbol.emoji())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        let lines = match self.wins.len() {
            0 => "no winning lines".to_string(),
            n => format!("{n} winning line(s) paying {}", self.total()),
        };
        format!("{}\n{lines}", rows.join("\n"))
    }
}

impl Describe for CrosswordOutcome {
    fn describe(&self) -> String {
        let rows: Vec<String> = self
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.unwrap_or('#').to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        format!("{}\nPuzzle solved", rows.join("\n"))
    }
}

impl Describe for UnoOutcome {
    fn describe(&self) -> String {
        match self.winner {
            Winner::Player => format!(
                "You went out first, computer held {} card(s)",
                self.computer_cards_left
            ),
            Winner::Computer => format!(
                "Computer went out first, you held {} card(s)",
                self.player_cards_left
            ),
        }
    }
}

impl Describe for RaceOutcome {
    fn describe(&self) -> String {
        format!("Finished {} with {} coin(s)", ordinal(self.position as usize), self.coins)
    }
}

impl Describe for ArcheryOutcome {
    fn describe(&self) -> String {
        format!(
            "Placed {} after {} round(s) with {} points",
            ordinal(self.position),
            self.rounds,
            self.score
        )
    }
}

pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

pub fn settlement<O: Describe>(title: &str, settlement: &Settlement<O>, balance: u64) {
    println!();
    println!("{}", format!("=== {title}: game over ===").bold());
    println!("{}", settlement.outcome.describe());
    if settlement.reward > 0 {
        println!("{}", format!("+{} tokens", settlement.reward).green().bold());
    } else {
        println!("{}", "No reward this time".yellow());
    }
    println!("Balance: {}", balance.to_string().cyan());
}

pub fn balance(balance: u64, wallet: Option<&str>, next_claim: Option<chrono::Duration>) {
    match wallet {
        Some(address) => println!("Wallet:  {}", short_address(address).cyan()),
        None => println!("Wallet:  {}", "not connected".dimmed()),
    }
    println!("Balance: {} tokens", balance.to_string().bold());
    match next_claim {
        None => println!("Daily claim: {}", "available".green()),
        Some(remaining) => println!("Daily claim in {}", format_countdown(remaining).yellow()),
    }
}

pub fn claim(outcome: &ClaimOutcome) {
    match outcome {
        ClaimOutcome::Claimed { amount, balance } => println!(
            "{} Balance is now {}",
            format!("Claimed {amount} tokens.").green().bold(),
            balance
        ),
        ClaimOutcome::CoolingDown { remaining } => println!(
            "{} Next claim in {}",
            "Already claimed today.".yellow(),
            format_countdown(*remaining)
        ),
    }
}

fn when(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn game_title(game_type: &str) -> String {
    game_type
        .parse::<common::utils::GameType>()
        .map(|game| game.title().to_string())
        .unwrap_or_else(|_| game_type.to_string())
}

pub fn rooms(rooms: &[GameRoom]) {
    if rooms.is_empty() {
        println!("{}", "No rooms".dimmed());
        return;
    }
    println!(
        "{}",
        format!("{:<8} {:<20} {:<12} {:>4} {:>5}  {}", "CODE", "GAME", "HOST", "MAX", "FEE", "ID").bold()
    );
    for room in rooms {
        println!(
            "{:<8} {:<20} {:<12} {:>4} {:>5}  {}",
            room.room_code.cyan(),
            game_title(&room.game_type),
            short_address(&room.host_wallet_address),
            room.max_players,
            room.entry_fee,
            room.id.dimmed()
        );
    }
}

pub fn room(room: &GameRoom, players: &[RoomPlayer]) {
    println!(
        "Room {} ({}) {} {}/{}",
        room.room_code.cyan().bold(),
        game_title(&room.game_type),
        room.status,
        players.len(),
        room.max_players
    );
    for player in players {
        let host = if player.wallet_address == room.host_wallet_address {
            " (host)".yellow().to_string()
        } else {
            String::new()
        };
        println!("  {}{host}", short_address(&player.wallet_address));
    }
}

pub fn tournaments(tournaments: &[Tournament]) {
    if tournaments.is_empty() {
        println!("{}", "No upcoming tournaments".dimmed());
        return;
    }
    for tournament in tournaments {
        println!(
            "{} [{}] {}",
            tournament.name.bold(),
            tournament.status,
            game_title(&tournament.game_type)
        );
        println!(
            "  starts {}  fee {}  prize {}  max {}",
            when(tournament.start_time),
            tournament.entry_fee,
            tournament.prize_pool.to_string().green(),
            tournament.max_participants
        );
        println!("  {}", tournament.id.dimmed());
    }
}

pub fn leaderboard(players: &[PlayerStats], me: Option<&str>) {
    if players.is_empty() {
        println!("{}", "No games recorded yet".dimmed());
        return;
    }
    println!("{}", format!("{:>4}  {:<14} {:>6} {:>8}", "#", "PLAYER", "GAMES", "WON").bold());
    for (rank, player) in players.iter().enumerate() {
        let name = player
            .username
            .clone()
            .unwrap_or_else(|| short_address(&player.wallet_address));
        let line = format!(
            "{:>4}  {:<14} {:>6} {:>8}",
            rank + 1,
            name,
            player.total_games_played,
            player.total_tokens_won
        );
        if Some(player.wallet_address.as_str()) == me {
            println!("{}", line.green().bold());
        } else {
            println!("{line}");
        }
    }
}
