//! matrix-2048: a grid-based 2048 merge engine
//!
//! This crate provides:
//! - A `Grid` of tile values with directional line access (`grid` module)
//! - The merge engine: `apply_move`, `spawn_tile`, `is_terminal` (`engine` module)
//! - A play session that tracks score and highest score (`session` module)
//! - A string key/value save format with memory and JSON-file stores (`persist` module)
//! - TOML configuration (`config` module)
//!
//! Quick start:
//! ```
//! use matrix_2048::engine::{self, SpawnPolicy};
//! use matrix_2048::grid::{Direction, Grid};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut grid = Grid::new(4).unwrap();
//! engine::spawn_tile(&mut grid, &SpawnPolicy::default(), &mut rng).unwrap();
//! engine::spawn_tile(&mut grid, &SpawnPolicy::default(), &mut rng).unwrap();
//!
//! let report = engine::apply_move(&mut grid, Direction::Left);
//! if report.moved {
//!     engine::spawn_tile(&mut grid, &SpawnPolicy::default(), &mut rng).unwrap();
//! }
//! assert!(!engine::is_terminal(&grid));
//! ```
//!
//! Full loop with a session
//! ```
//! use matrix_2048::config::GameConfig;
//! use matrix_2048::engine::legal_moves;
//! use matrix_2048::session::Game;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut game = Game::new(&GameConfig::default(), StdRng::seed_from_u64(123)).unwrap();
//! let mut moves = 0u32;
//! while !game.is_terminal() && moves < 8 {
//!     let Some(&dir) = legal_moves(game.grid()).first() else { break };
//!     game.play(dir).unwrap();
//!     moves += 1;
//! }
//! assert!(game.highest_score() >= game.score());
//! ```
//!
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod persist;
pub mod session;

pub use error::GameError;
