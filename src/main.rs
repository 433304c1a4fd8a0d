//! # Delve Command Line
//!
//! Generates map files, inspects them and runs headless simulations.

use clap::{Args as ClapArgs, Parser, Subcommand};
use delve::{
    codec, generate_dungeon, AiKind, DelveError, DelveResult, Game, GameSession, GenerationConfig,
    Map, MapLibrary, Position, Stats,
};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments for Delve.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Maze generation, binary maps and a headless dungeon turn loop")]
#[command(version)]
struct Args {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a map and write it to a file
    Generate {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Output file
        #[arg(short, long, default_value = "map.dm")]
        output: PathBuf,
    },
    /// Decode a map file and print it as JSON
    Inspect {
        /// Map file to decode
        path: PathBuf,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Populate a map and run the turn loop
    Simulate {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Play on this map file instead of generating one
        #[arg(long)]
        map: Option<PathBuf>,

        /// Explorer AI players to add
        #[arg(long, default_value_t = 1)]
        explorers: u32,

        /// Wanderer AI players to add
        #[arg(long, default_value_t = 0)]
        wanderers: u32,

        /// Maximum number of ticks
        #[arg(long, default_value_t = 500)]
        steps: u64,

        /// Milliseconds between ticks
        #[arg(long, default_value_t = 10)]
        tick_ms: u64,

        /// Write the final map to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
struct LayoutArgs {
    /// Map width in blocks
    #[arg(long, default_value_t = delve::config::DEFAULT_MAZE_WIDTH)]
    width: u32,

    /// Map height in blocks
    #[arg(long, default_value_t = delve::config::DEFAULT_MAZE_HEIGHT)]
    height: u32,

    /// Random seed for generation and AI
    #[arg(short, long)]
    seed: Option<u64>,

    /// Open every entrance instead of carving a maze
    #[arg(long)]
    open: bool,

    /// Monsters to place
    #[arg(long, default_value_t = 0)]
    monsters: u32,

    /// Items to place
    #[arg(long, default_value_t = 0)]
    items: u32,
}

impl LayoutArgs {
    fn to_config(&self) -> GenerationConfig {
        GenerationConfig::new(self.width, self.height, self.seed)
            .with_open_map(self.open)
            .with_monsters(self.monsters)
            .with_items(self.items)
    }
}

#[tokio::main]
async fn main() -> DelveResult<()> {
    let args = Args::parse();

    // Initialize logging
    initialize_logging(&args.log_level)?;

    info!("Starting Delve v{}", delve::VERSION);

    match args.command {
        Command::Generate { layout, output } => run_generate(&layout, output),
        Command::Inspect { path, pretty } => run_inspect(path, pretty),
        Command::Simulate {
            layout,
            map,
            explorers,
            wanderers,
            steps,
            tick_ms,
            output,
        } => {
            run_simulate(
                &layout,
                map,
                (explorers, wanderers),
                steps,
                Duration::from_millis(tick_ms),
                output,
            )
            .await
        }
    }
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) -> DelveResult<()> {
    #[cfg(feature = "dev-tools")]
    {
        use tracing::Level;

        let level = match log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .try_init()
            .map_err(|err| DelveError::InvalidState(format!("logging setup failed: {}", err)))?;
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        let level = log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info);
        env_logger::Builder::new()
            .filter_level(level)
            .format_target(false)
            .try_init()
            .map_err(|err| DelveError::InvalidState(format!("logging setup failed: {}", err)))?;
    }

    Ok(())
}

fn run_generate(layout: &LayoutArgs, output: PathBuf) -> DelveResult<()> {
    let map = generate_dungeon(&layout.to_config())?;
    std::fs::write(&output, codec::serialize(&map))?;
    info!(
        "Wrote {}x{} map to {}",
        map.width(),
        map.height(),
        output.display()
    );
    Ok(())
}

fn run_inspect(path: PathBuf, pretty: bool) -> DelveResult<()> {
    let mut library = MapLibrary::new();
    let name = library.import_file(&path)?;
    let map = library.get(&name)?;
    if !delve::is_connected(&map) {
        warn!("{} contains blocks that cannot be reached", path.display());
    }

    let snapshot = Game::new(map, 0).snapshot();
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{}", json);
    Ok(())
}

async fn run_simulate(
    layout: &LayoutArgs,
    map_path: Option<PathBuf>,
    (explorers, wanderers): (u32, u32),
    steps: u64,
    tick: Duration,
    output: Option<PathBuf>,
) -> DelveResult<()> {
    let map = match map_path {
        Some(path) => {
            let mut library = MapLibrary::new();
            let name = library.import_file(&path)?;
            library.get(&name)?
        }
        None => generate_dungeon(&layout.to_config())?,
    };

    let seed = layout.seed.unwrap_or_else(rand::random);
    let mut game = Game::from_map(map, seed);
    let kinds = std::iter::repeat(AiKind::Explorer)
        .take(explorers as usize)
        .chain(std::iter::repeat(AiKind::Wanderer).take(wanderers as usize));
    let mut spots = free_positions(game.map()).into_iter();
    for (index, ai) in kinds.enumerate() {
        let pos = spots.next().ok_or_else(|| {
            DelveError::InvalidState("no free block left for another player".to_string())
        })?;
        game.add_ai_player(format!("{:?} {}", ai, index + 1), ai, Stats::player(), pos)?;
    }

    let session = GameSession::spawn(game);
    let report = session.run_ticker(tick, steps).await?;
    match report.winner {
        Some(winner) => info!("{} won after {} ticks", winner, report.steps),
        None => info!("Nobody won within {} ticks", report.steps),
    }

    let game = session.shutdown().await?;
    if let Some(path) = output {
        std::fs::write(&path, codec::serialize(game.map()))?;
        info!("Wrote final map to {}", path.display());
    }

    println!(
        "{}",
        serde_json::json!({
            "steps": report.steps,
            "events": report.events.len(),
            "winner": report.winner,
            "final": game.snapshot(),
        })
    );
    Ok(())
}

/// Unoccupied blocks, the origin first, skipping the winning block.
fn free_positions(map: &Map) -> Vec<Position> {
    let mut spots: Vec<Position> = map
        .positions()
        .filter(|pos| !map.is_occupied(*pos) && !map.is_winning_block(*pos))
        .collect();
    spots.sort_by_key(|pos| pos.manhattan_distance(Position::origin()));
    spots
}
