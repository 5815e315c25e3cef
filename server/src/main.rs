use arcade::Arcade;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use common::{
    config::Config,
    utils::{GameType, RoomStatus},
};
use lobby::{leaderboard::DEFAULT_LIMIT, rooms::DEFAULT_MAX_PLAYERS, JoinOutcome, NewTournament};
use tracing::info;

mod arcade;
mod autopilot;
mod render;

#[derive(Parser)]
#[command(author, version, about = "Token-gated minigame arcade", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Token balance and daily claim status
    Balance,
    /// Claim the daily token grant
    Claim,
    /// Connect the configured wallet
    Connect,
    /// Forget the connected wallet
    Disconnect,
    /// Play one round, paying the entry fee
    Play {
        game: GameType,
        /// Seed for a reproducible round
        #[arg(long)]
        seed: Option<u64>,
    },
    #[command(subcommand)]
    Rooms(RoomsCommand),
    #[command(subcommand)]
    Tournaments(TournamentsCommand),
    Leaderboard {
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum RoomsCommand {
    List {
        #[arg(long, default_value = "waiting")]
        status: RoomStatus,
    },
    Create {
        game: GameType,
        #[arg(long, default_value_t = DEFAULT_MAX_PLAYERS)]
        max_players: i64,
    },
    /// Join by the six character room code
    Join { code: String },
    Leave { room_id: String },
    /// Host only
    Start { room_id: String },
    /// Follow the room list, or one room's players with --room
    Watch {
        #[arg(long)]
        room: Option<String>,
    },
}

#[derive(Subcommand)]
enum TournamentsCommand {
    List,
    Join {
        tournament_id: String,
    },
    Schedule {
        name: String,
        game: GameType,
        #[arg(long)]
        starts_in_hours: i64,
        #[arg(long, default_value_t = 64)]
        max_participants: i64,
        #[arg(long, default_value_t = 0)]
        prize_pool: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    common::telemetry::init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let mut arcade = Arcade::new(config).await?;

    match cli.command {
        Commands::Balance => arcade.show_balance(),
        Commands::Claim => {
            arcade.claim()?;
        }
        Commands::Connect => {
            let address = arcade.connect().await?;
            println!("Connected {}", wallet::short_address(&address).green());
        }
        Commands::Disconnect => {
            arcade.disconnect()?;
            println!("Wallet disconnected");
        }
        Commands::Play { game, seed } => arcade.play(game, seed).await?,
        Commands::Rooms(command) => rooms(&arcade, command).await?,
        Commands::Tournaments(command) => tournaments(&arcade, command).await?,
        Commands::Leaderboard { limit } => {
            let top = arcade.lobby.leaderboard.top_players(limit).await?;
            render::leaderboard(&top, arcade.wallet.as_deref());
        }
    }

    Ok(())
}

async fn rooms(arcade: &Arcade, command: RoomsCommand) -> anyhow::Result<()> {
    let client = &arcade.lobby.rooms;
    match command {
        RoomsCommand::List { status } => render::rooms(&client.fetch_rooms(status).await?),
        RoomsCommand::Create { game, max_players } => {
            let room = client.create_room(game, max_players).await?;
            println!("Share code {} to invite players", room.room_code.cyan().bold());
            render::room(&room, &client.room_players(&room.id).await?);
        }
        RoomsCommand::Join { code } => {
            let (room, outcome) = client.join_by_code(&code).await?;
            if outcome == JoinOutcome::AlreadyMember {
                println!("{}", "Already in this room".yellow());
            }
            render::room(&room, &client.room_players(&room.id).await?);
        }
        RoomsCommand::Leave { room_id } => {
            client.leave_room(&room_id).await?;
            println!("Left room");
        }
        RoomsCommand::Start { room_id } => {
            let room = client.start_room(&room_id).await?;
            render::room(&room, &client.room_players(&room.id).await?);
        }
        RoomsCommand::Watch { room: Some(room_id) } => {
            let room = client.room(&room_id).await?;
            render::room(&room, &client.room_players(&room_id).await?);
            let mut watcher = client.watch_players(&room_id);
            info!(room = %room.room_code, "Watching players, Ctrl-C to stop");
            while let Some(players) = watcher.next().await {
                render::room(&client.room(&room_id).await?, &players?);
            }
        }
        RoomsCommand::Watch { room: None } => {
            render::rooms(&client.fetch_rooms(RoomStatus::Waiting).await?);
            let mut watcher = client.watch_rooms(RoomStatus::Waiting);
            info!("Watching waiting rooms, Ctrl-C to stop");
            while let Some(rooms) = watcher.next().await {
                println!();
                render::rooms(&rooms?);
            }
        }
    }
    Ok(())
}

async fn tournaments(arcade: &Arcade, command: TournamentsCommand) -> anyhow::Result<()> {
    let client = &arcade.lobby.tournaments;
    match command {
        TournamentsCommand::List => render::tournaments(&client.fetch_tournaments().await?),
        TournamentsCommand::Join { tournament_id } => {
            match client.join_tournament(&tournament_id).await? {
                JoinOutcome::Joined => println!("{}", "Registered".green()),
                JoinOutcome::AlreadyMember => println!("{}", "Already registered".yellow()),
            }
        }
        TournamentsCommand::Schedule {
            name,
            game,
            starts_in_hours,
            max_participants,
            prize_pool,
        } => {
            let mut new = NewTournament::new(name, game, Utc::now() + Duration::hours(starts_in_hours));
            new.entry_fee = i64::try_from(arcade.rules.entry_fee(game))?;
            new.max_participants = max_participants;
            new.prize_pool = prize_pool;
            let tournament = client.schedule_tournament(new).await?;
            render::tournaments(std::slice::from_ref(&tournament));
        }
    }
    Ok(())
}
