use clap::Parser;
use client::entities::Team;
use client::error::{ConnectionError, SessionError};
use client::events::NetworkEventQueue;
use client::game::Game;
use client::input::{parse_command, LocalAction, HELP};
use client::network::{self, RelayLink};
use client::presentation::{LogPresenter, Presenter};
use client::session::{GameMode, SessionConfig, DEFAULT_KILL_LIMIT};
use log::{error, info, warn};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8000")]
    server: String,

    /// Name shown to other players
    #[arg(short = 'u', long, default_value = "player")]
    username: String,

    /// Game mode selected in the lobby
    #[arg(short = 'm', long, value_enum, default_value = "ffa")]
    mode: GameMode,

    /// Team to play for (defaults to one derived from the client id)
    #[arg(short = 't', long, value_enum)]
    team: Option<Team>,

    /// Team kills needed to win a team deathmatch
    #[arg(short = 'k', long, default_value_t = DEFAULT_KILL_LIMIT)]
    kill_limit: u32,

    /// Seconds to wait for the relay handshake
    #[arg(long, default_value = "5")]
    connect_timeout: u64,

    /// Simulation steps per second
    #[arg(long, default_value = "60")]
    tick_rate: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = SessionConfig {
        mode: args.mode,
        kill_limit: args.kill_limit,
        team: args.team,
    };

    info!("Starting client...");
    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let (events, mut queue) = NetworkEventQueue::channel();
    let connect_timeout = Duration::from_secs(args.connect_timeout);

    let mut server = args.server.clone();
    let link = loop {
        match network::connect(&server, &args.username, connect_timeout, events.clone()).await {
            Ok(link) => break link,
            Err(e) => {
                error!("{}", e);
                match prompt_address(&mut console, &e).await? {
                    Some(address) => server = address,
                    None => return Ok(()),
                }
            }
        }
    };
    drop(events);
    info!("Joined relay at {} as {}", link.peer(), args.username);

    let mut game = Game::new(link.client_id(), &args.username, &config);
    let mut presenter = LogPresenter;
    let commands = spawn_console(console);

    println!("{}", HELP);
    let result = run(&mut game, &link, &mut queue, commands, &mut presenter, args.tick_rate).await;
    link.shutdown();

    if let Err(SessionError::RelayClosed) = result {
        println!("Relay has stopped! Exiting...");
        return Err(SessionError::RelayClosed.into());
    }
    Ok(())
}

/// Asks for a new relay address after a failed connect. `None` means the
/// user gave up.
async fn prompt_address(
    console: &mut Lines<BufReader<Stdin>>,
    error: &ConnectionError,
) -> Result<Option<String>, std::io::Error> {
    println!("Could not connect: {}", error);
    println!("Enter relay address (host:port), or an empty line to quit:");
    match console.next_line().await? {
        Some(line) if !line.trim().is_empty() => Ok(Some(line.trim().to_string())),
        _ => Ok(None),
    }
}

/// Reads console lines on their own task so the loop never waits on stdin.
fn spawn_console(mut console: Lines<BufReader<Stdin>>) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok(Some(line)) = console.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run(
    game: &mut Game,
    link: &RelayLink,
    queue: &mut NetworkEventQueue,
    mut commands: mpsc::UnboundedReceiver<String>,
    presenter: &mut dyn Presenter,
    tick_rate: u32,
) -> Result<(), SessionError> {
    let dt = 1.0 / tick_rate.max(1) as f32;
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                game.drain_events(queue)?;
                game.tick(dt);

                for message in game.take_outbound() {
                    if !link.send(message) {
                        return Err(SessionError::RelayClosed);
                    }
                }
                for event in game.take_presentation() {
                    presenter.present(&event);
                }
            }

            Some(line) = commands.recv() => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(LocalAction::Quit) => {
                        info!("Quitting");
                        return Ok(());
                    }
                    Ok(action) => {
                        if !game.apply_action(&action) {
                            warn!("{:?} not available in {:?}", action, game.session().phase());
                        }
                    }
                    Err(e) => println!("{} ({})", e, HELP),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
        }
    }
}
