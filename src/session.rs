use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::engine::{self, ChangeReport, SpawnPolicy};
use crate::error::GameError;
use crate::grid::{Direction, Grid, Tile};
use crate::persist::{PersistError, Snapshot, Store};

/// Caller-side bookkeeping that outlives individual moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Running total for the current game.
    pub score: u64,
    /// Best score ever reached; survives restarts.
    pub highest_score: u64,
    pub terminal: bool,
}

impl GameState {
    fn add(&mut self, delta: u64) {
        self.score = self.score.saturating_add(delta);
        self.highest_score = self.highest_score.max(self.score);
    }
}

/// Outcome of one `Game::play` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub report: ChangeReport,
    /// Tile placed after an effective move.
    pub spawned: Option<Tile>,
    pub terminal: bool,
}

/// A play session: grid, score bookkeeping and the spawn RNG.
///
/// ```
/// use matrix_2048::config::GameConfig;
/// use matrix_2048::grid::Direction;
/// use matrix_2048::session::Game;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut game = Game::new(&GameConfig::default(), StdRng::seed_from_u64(3)).unwrap();
/// assert_eq!(game.grid().occupied_positions().len(), 1);
/// let turn = game.play(Direction::Left).unwrap();
/// assert_eq!(turn.spawned.is_some(), turn.report.moved);
/// ```
#[derive(Debug)]
pub struct Game<R = StdRng> {
    grid: Grid,
    state: GameState,
    policy: SpawnPolicy,
    start_tiles: usize,
    rng: R,
}

impl<R: Rng> Game<R> {
    /// Start a fresh game.
    pub fn new(config: &GameConfig, rng: R) -> Result<Self, GameError> {
        let mut game = Game {
            grid: Grid::new(config.size)?,
            state: GameState::default(),
            policy: config.spawn,
            start_tiles: config.start_tiles,
            rng,
        };
        game.restart()?;
        Ok(game)
    }

    /// Resume the game kept in `store`, or start a fresh one carrying the
    /// stored highest score when the store holds no tiles.
    ///
    /// Stored cells are read row-major into a grid of `config.size`. When the
    /// count doesn't match `size * size` (the size changed between sessions),
    /// missing cells stay empty and extra cells are dropped, with a warning.
    pub fn restore<S: Store + ?Sized>(config: &GameConfig, store: &S, rng: R) -> Result<Self, GameError> {
        let snapshot = Snapshot::read(store);
        let mut game = Game {
            grid: Grid::new(config.size)?,
            state: GameState {
                score: snapshot.score,
                highest_score: snapshot.highest_score.max(snapshot.score),
                terminal: false,
            },
            policy: config.spawn,
            start_tiles: config.start_tiles,
            rng,
        };
        match snapshot.cells {
            Some(cells) if cells.iter().any(|&v| v != 0) => {
                let expected = config.size * config.size;
                if cells.len() != expected {
                    warn!(
                        "stored grid has {found} cells, expected {expected} for a {size}x{size} grid; reshaping",
                        found = cells.len(),
                        size = config.size
                    );
                }
                game.grid = Grid::from_values(config.size, &cells)?;
                game.state.terminal = engine::is_terminal(&game.grid);
                debug!("restored game: score={} terminal={}", game.state.score, game.state.terminal);
            }
            _ => game.restart()?,
        }
        Ok(game)
    }

    /// Clear the grid and score, keep the highest score, spawn the start tiles.
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.grid.clear();
        self.state.score = 0;
        for _ in 0..self.start_tiles {
            engine::spawn_tile(&mut self.grid, &self.policy, &mut self.rng)?;
        }
        self.state.terminal = engine::is_terminal(&self.grid);
        debug!("new game on {0}x{0} grid", self.grid.size());
        Ok(())
    }

    /// Apply one move, spawn a tile if anything changed, and re-check for game over.
    ///
    /// Once the game is terminal every call is a no-op until `restart`.
    pub fn play(&mut self, direction: Direction) -> Result<Turn, GameError> {
        if self.state.terminal {
            return Ok(Turn { report: ChangeReport::default(), spawned: None, terminal: true });
        }
        let report = engine::apply_move(&mut self.grid, direction);
        self.state.add(report.score_delta);
        let spawned = if report.moved {
            Some(engine::spawn_tile(&mut self.grid, &self.policy, &mut self.rng)?)
        } else {
            None
        };
        self.state.terminal = engine::is_terminal(&self.grid);
        if self.state.terminal {
            info!(
                "game over: score={} highest_tile={}",
                self.state.score,
                self.grid.highest_tile()
            );
        }
        Ok(Turn { report, spawned, terminal: self.state.terminal })
    }

    pub fn save<S: Store + ?Sized>(&self, store: &mut S) -> Result<(), PersistError> {
        Snapshot::capture(&self.grid, &self.state).write(store)
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.state.score
    }

    #[inline]
    pub fn highest_score(&self) -> u64 {
        self.state.highest_score
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.terminal
    }
}
