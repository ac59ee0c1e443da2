use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use matrix_2048::config::GameConfig;
use matrix_2048::engine::legal_moves;
use matrix_2048::grid::Direction;
use matrix_2048::persist::FileStore;
use matrix_2048::session::Game;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::from_toml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if args.store.is_some() {
        config.store_path = args.store.clone();
    }
    config.validate()?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match args.cmd.unwrap_or(Cmd::Play) {
        Cmd::Play => play(&config, rng),
        Cmd::Simulate { games, max_moves, quiet } => simulate(&config, rng, games, max_moves, quiet),
    }
}

#[derive(Debug, Parser)]
#[command(name = "matrix-2048", about = "Sliding-tile merge puzzle")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Cmd>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed the tile spawner for a reproducible game
    #[arg(long)]
    seed: Option<u64>,

    /// Save the game to this JSON file after every move (overrides config)
    #[arg(long)]
    store: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
enum Cmd {
    /// Play interactively: w/a/s/d or up/left/down/right, r to restart, q to quit
    Play,
    /// Play games with a uniformly random legal move and report scores
    Simulate {
        /// Number of games to play
        #[arg(long, default_value_t = 100)]
        games: u64,
        /// Per-game: stop after this many moves
        #[arg(long)]
        max_moves: Option<u64>,
        /// Suppress the progress bar
        #[arg(long)]
        quiet: bool,
    },
}

fn play(config: &GameConfig, rng: StdRng) -> anyhow::Result<()> {
    let mut store = match &config.store_path {
        Some(path) => Some(FileStore::open(path).with_context(|| format!("opening store {}", path.display()))?),
        None => None,
    };
    let mut game = match &store {
        Some(s) => Game::restore(config, s, rng)?,
        None => Game::new(config, rng)?,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    render(&game, &mut stdout)?;
    for line in stdin.lock().lines() {
        let line = line?;
        match line.trim() {
            "" => continue,
            "q" | "quit" => break,
            "r" | "restart" => game.restart()?,
            cmd => match cmd.parse::<Direction>() {
                Ok(dir) => {
                    let turn = game.play(dir)?;
                    if !turn.report.merges.is_empty() {
                        let cells: Vec<String> = turn.report.merged_positions().map(|p| p.to_string()).collect();
                        writeln!(stdout, "merged at {}", cells.join(" "))?;
                    }
                }
                Err(e) => {
                    writeln!(stdout, "{e}; use w/a/s/d, r or q")?;
                    continue;
                }
            },
        }
        if let Some(s) = store.as_mut() {
            game.save(s)?;
        }
        render(&game, &mut stdout)?;
        if game.is_terminal() {
            writeln!(stdout, "Game Over, total score {}. r to restart, q to quit.", game.score())?;
        }
    }
    if let Some(s) = store.as_mut() {
        game.save(s)?;
        info!("saved game to {}", s.path().display());
    }
    Ok(())
}

fn render<R: Rng>(game: &Game<R>, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "\n{}", game.grid())?;
    writeln!(out, "score: {} | best: {}", game.score(), game.highest_score())?;
    out.flush()
}

fn simulate(config: &GameConfig, mut rng: StdRng, games: u64, max_moves: Option<u64>, quiet: bool) -> anyhow::Result<()> {
    let pb = if quiet {
        None
    } else {
        let pb = ProgressBar::new(games);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:30}] {pos}/{len} | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let mut total_score = 0u64;
    let mut best_score = 0u64;
    let mut best_tile = 0u32;
    let mut total_moves = 0u64;
    for _ in 0..games {
        let mut game = Game::new(config, StdRng::seed_from_u64(rng.gen()))?;
        let mut moves = 0u64;
        while !game.is_terminal() && max_moves.map_or(true, |m| moves < m) {
            let legal = legal_moves(game.grid());
            if legal.is_empty() {
                break;
            }
            let dir = legal[rng.gen_range(0..legal.len())];
            game.play(dir)?;
            moves += 1;
        }
        total_moves += moves;
        total_score += game.score();
        best_score = best_score.max(game.score());
        best_tile = best_tile.max(game.grid().highest_tile());
        if let Some(pb) = &pb {
            pb.inc(1);
            pb.set_message(format!("best score: {best_score} | best tile: {best_tile}"));
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let n = games.max(1) as f64;
    println!(
        "Games: {} | mean score: {:.1} | best score: {} | best tile: {} | mean moves: {:.1}",
        games,
        total_score as f64 / n,
        best_score,
        best_tile,
        total_moves as f64 / n
    );
    Ok(())
}
