use anyhow::Context;
use common::{
    config::{Config, LedgerBackend},
    utils::GameType,
};
use games::{
    driver, DriveEnd, Game, GameRng, GameRules, Session, SessionState, Settlement,
};
use lobby::{ChangeFeed, Lobby};
use tokio::signal;
use tracing::{info, warn};
use wallet::{
    ClaimOutcome, FileStorage, MemoryStorage, RedisStorage, Storage, TokenLedger, WalletConnector,
};

use crate::{
    autopilot::{Autopilot, ArcheryPilot, CrosswordPilot, SnakePilot, Spectator, UnoPilot},
    render::{self, Describe},
};

pub type Ledger = TokenLedger<Box<dyn Storage + Send>>;

/// Everything one invocation of the CLI works against.
pub struct Arcade {
    pub ledger: Ledger,
    pub rules: GameRules,
    pub lobby: Lobby,
    pub wallet: Option<String>,
    connector: WalletConnector,
}

impl Arcade {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let storage: Box<dyn Storage + Send> = match config.ledger_backend {
            LedgerBackend::File => Box::new(
                FileStorage::open(&config.ledger_path)
                    .with_context(|| format!("opening {}", config.ledger_path.display()))?,
            ),
            LedgerBackend::Redis => {
                let url = config
                    .redis_url
                    .as_deref()
                    .context("redis ledger needs REDIS_URL")?;
                Box::new(RedisStorage::connect(url, "arcade")?)
            }
            LedgerBackend::Memory => Box::new(MemoryStorage::new()),
        };
        let mut ledger = TokenLedger::open(storage)?;

        let rules = match &config.game_rules_path {
            Some(path) => GameRules::load(path)?,
            None => GameRules::default(),
        };

        let connector = WalletConnector::new(config.wallet_address.clone());
        let wallet = connector.connected(ledger.storage_mut())?;

        let pool = common::db::establish_connection(&config.database_url).await?;
        let feed = match &config.redis_url {
            Some(url) => {
                let feed = ChangeFeed::with_redis(redis::Client::open(url.as_str())?);
                feed.spawn_relay();
                feed
            }
            None => ChangeFeed::local(),
        };
        let lobby = Lobby::new(pool, feed, wallet.clone());

        info!(
            backend = %config.ledger_backend,
            balance = ledger.balance(),
            wallet = wallet.as_deref().unwrap_or("-"),
            "Arcade ready"
        );

        Ok(Self {
            ledger,
            rules,
            lobby,
            wallet,
            connector,
        })
    }

    pub fn show_balance(&self) {
        let next_claim = (!self.ledger.can_claim()).then(|| self.ledger.time_until_next_claim());
        render::balance(self.ledger.balance(), self.wallet.as_deref(), next_claim);
    }

    pub fn claim(&mut self) -> anyhow::Result<ClaimOutcome> {
        let outcome = self.ledger.claim()?;
        render::claim(&outcome);
        Ok(outcome)
    }

    pub async fn connect(&mut self) -> anyhow::Result<String> {
        if self.wallet.is_none() {
            println!("Connecting wallet...");
        }
        let address = self.connector.connect(self.ledger.storage_mut()).await?;
        self.wallet = Some(address.clone());
        Ok(address)
    }

    pub fn disconnect(&mut self) -> anyhow::Result<()> {
        self.connector.disconnect(self.ledger.storage_mut())?;
        self.wallet = None;
        Ok(())
    }

    /// Plays one round of `game` on autopilot and records the result.
    pub async fn play(&mut self, game: GameType, seed: Option<u64>) -> anyhow::Result<()> {
        let mut rng = match seed {
            Some(seed) => GameRng::seeded(seed),
            None => GameRng::from_entropy(),
        };
        let pilot_rng = GameRng::seeded(rng.inclusive(0, u32::MAX).into());

        let reward = match game {
            GameType::Snake => {
                let snake = self.rules.snake();
                let mut pilot = SnakePilot::new(snake.rules().grid_size);
                self.run(snake, &mut pilot, rng).await?
            }
            GameType::FruitLuck => {
                self.run(self.rules.fruit_luck(), &mut Spectator, rng).await?
            }
            GameType::LuckyDucks => {
                self.run(self.rules.lucky_ducks(), &mut Spectator, rng).await?
            }
            GameType::Crossword => {
                let crossword = self.rules.crossword();
                let mut pilot = CrosswordPilot::new(&crossword);
                self.run(crossword, &mut pilot, rng).await?
            }
            GameType::Uno => self.run(self.rules.uno(), &mut UnoPilot, rng).await?,
            GameType::MarioDash => {
                self.run(self.rules.mario_dash(), &mut Spectator, rng).await?
            }
            GameType::PrecisionArchery => {
                let archery = self.rules.archery();
                let mut pilot = ArcheryPilot::new(&archery, pilot_rng, 3.0);
                self.run(archery, &mut pilot, rng).await?
            }
        };

        if let (Some(reward), Some(wallet)) = (reward, self.wallet.as_deref()) {
            if let Err(err) = self.lobby.leaderboard.record_result(wallet, reward).await {
                warn!(%err, "Could not record result on the leaderboard");
            }
        }
        Ok(())
    }

    /// `None` when the player gave up before the game finished.
    async fn run<G, P>(&mut self, game: G, pilot: &mut P, rng: GameRng) -> anyhow::Result<Option<u64>>
    where
        G: Game,
        G::Outcome: Describe,
        P: Autopilot<G>,
    {
        let title = game.kind().title();
        println!("{} (entry fee {})", title, game.entry_fee());

        let settlement = run_game(game, pilot, rng, &mut self.ledger).await?;
        Ok(settlement.map(|settlement| {
            render::settlement(title, &settlement, self.ledger.balance());
            settlement.reward
        }))
    }
}

/// Starts a session, lets `pilot` play it out and returns the settled result.
/// Ctrl-C abandons the game.
pub async fn run_game<G, P, S, C>(
    game: G,
    pilot: &mut P,
    rng: GameRng,
    ledger: &mut TokenLedger<S, C>,
) -> anyhow::Result<Option<Settlement<G::Outcome>>>
where
    G: Game,
    P: Autopilot<G>,
    S: Storage,
    C: wallet::Clock,
{
    let mut session = Session::new(game, rng);
    session.start(ledger)?;

    let (handle, driver) = driver::channel();
    let end = {
        let run = driver.run(&mut session, ledger, |state| {
            if let SessionState::Active(active) = state {
                if let Some(input) = pilot.next_input(active) {
                    handle.send(input);
                }
            }
        });
        tokio::pin!(run);

        let mut interrupted = false;
        loop {
            tokio::select! {
                end = &mut run => break end?,
                _ = signal::ctrl_c(), if !interrupted => {
                    interrupted = true;
                    handle.cancel();
                }
            }
        }
    };

    match end {
        DriveEnd::Settled { .. } => Ok(session.acknowledge()),
        DriveEnd::Cancelled => {
            println!("Game abandoned, the entry fee is not refunded");
            Ok(None)
        }
    }
}
