/// Errors raised by the grid and the merge engine.
///
/// `OutOfBounds` and `InvalidDirection` point at caller bugs. `GridFull` means
/// a spawn was requested after the caller should already have declared game over.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("grid size {0} is too small (minimum {min})", min = crate::grid::MIN_SIZE)]
    InvalidSize(usize),
    #[error("position ({x}, {y}) is outside a {size}x{size} grid")]
    OutOfBounds { x: usize, y: usize, size: usize },
    #[error("invalid direction: {0}")]
    InvalidDirection(String),
    #[error("grid is full; no empty cell to spawn into")]
    GridFull,
}
