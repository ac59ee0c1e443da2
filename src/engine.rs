use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::grid::{Direction, Grid, Position, Tile, Value};

/// One merge landing on `position`, leaving `value` there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeEvent {
    pub position: Position,
    pub value: Value,
}

/// What a single `apply_move` changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Merges in processing order.
    pub merges: Vec<MergeEvent>,
    /// True if any merge happened or any tile slid. Callers spawn only when set.
    pub moved: bool,
    /// Sum of the merged values.
    pub score_delta: u64,
}

impl ChangeReport {
    /// Cells a view layer should highlight.
    pub fn merged_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.merges.iter().map(|m| m.position)
    }
}

/// Slide and merge every tile of `grid` towards `direction`, in place.
///
/// Runs a merge pass, then a gravity pass:
///
/// - Merge pass: lines are visited nearest-to-destination first. Each occupied
///   tile looks past any gaps for the nearest occupied tile in the direction of
///   travel and merges into it on equal value, unless that tile already absorbed
///   a merge during this move. Three equal tiles therefore yield one merge.
/// - Gravity pass: tiles step one cell at a time into empty neighbours until a
///   full scan moves nothing, bounded by `size` scans.
///
/// Tiles whose sum would not fit a `Value` (a pair of `MAX_TILE`s, say) are
/// left unmerged.
///
/// ```
/// use matrix_2048::engine::apply_move;
/// use matrix_2048::grid::{Direction, Grid};
/// let mut g = Grid::from_values(2, &[2, 2, 0, 0]).unwrap();
/// let report = apply_move(&mut g, Direction::Left);
/// assert_eq!(g.values(), &[4, 0, 0, 0]);
/// assert_eq!(report.score_delta, 4);
/// assert!(report.moved);
/// ```
pub fn apply_move(grid: &mut Grid, direction: Direction) -> ChangeReport {
    let mut report = ChangeReport::default();
    merge_pass(grid, direction, &mut report);
    let slid = gravity_pass(grid, direction);
    report.moved = slid || !report.merges.is_empty();
    debug!(
        "move {direction}: merges={} score_delta={} moved={}",
        report.merges.len(),
        report.score_delta,
        report.moved
    );
    report
}

fn merge_pass(grid: &mut Grid, direction: Direction, report: &mut ChangeReport) {
    let size = grid.size();
    let mut consumed = vec![false; size * size];
    // Line 0 sits on the destination edge and has nothing ahead of it.
    for index in 1..size {
        for pos in grid.line_for(direction, index) {
            let value = grid[pos];
            if value == 0 {
                continue;
            }
            let Some(target) = grid.nearest_occupied(pos, direction) else {
                continue;
            };
            let slot = target.y * size + target.x;
            if consumed[slot] {
                continue;
            }
            let Some(merged) = merged_value(value, grid[target]) else {
                continue;
            };
            grid[target] = merged;
            grid[pos] = 0;
            consumed[slot] = true;
            report.score_delta += u64::from(merged);
            report.merges.push(MergeEvent { position: target, value: merged });
            trace!("merged {pos} into {target} -> {merged}");
        }
    }
}

/// Value left behind when `a` merges into `b`, if they merge at all.
/// Pairs above `MAX_TILE / 2` have no representable sum and stay apart.
#[inline]
fn merged_value(a: Value, b: Value) -> Option<Value> {
    if a == b {
        a.checked_mul(2)
    } else {
        None
    }
}

fn gravity_pass(grid: &mut Grid, direction: Direction) -> bool {
    let size = grid.size();
    let mut moved = false;
    // Nearest-to-edge first, one step per scan: every unsettled tile advances
    // each scan, so `size - 1` scans settle the grid.
    for _ in 0..size {
        let mut slid = false;
        for index in 1..size {
            for pos in grid.line_for(direction, index) {
                if grid[pos] == 0 {
                    continue;
                }
                if let Some(next) = grid.neighbor(pos, direction) {
                    if grid[next] == 0 {
                        grid[next] = grid[pos];
                        grid[pos] = 0;
                        slid = true;
                    }
                }
            }
        }
        if !slid {
            break;
        }
        moved = true;
    }
    moved
}

/// True iff the grid is full and no two orthogonal neighbours can merge.
///
/// Equal neighbours at `MAX_TILE` don't count, since `apply_move` leaves them apart.
///
/// Only the up and right neighbours of each cell are compared; together they
/// cover every adjacent pair once. Never mutates `grid`.
pub fn is_terminal(grid: &Grid) -> bool {
    if !grid.is_full() {
        return false;
    }
    !grid.positions().any(|pos| {
        [Direction::Up, Direction::Right]
            .into_iter()
            .filter_map(|d| grid.neighbor(pos, d))
            .any(|n| merged_value(grid[pos], grid[n]).is_some())
    })
}

/// Directions that would change the grid, found by simulating each move on a copy.
pub fn legal_moves(grid: &Grid) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|&d| {
            let mut trial = grid.clone();
            apply_move(&mut trial, d).moved
        })
        .collect()
}

/// Relative odds of spawning a 2 versus a 4.
///
/// The default is 5:1, i.e. a 4 appears with probability 1/6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnPolicy {
    pub two_weight: u32,
    pub four_weight: u32,
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        SpawnPolicy { two_weight: 5, four_weight: 1 }
    }
}

impl SpawnPolicy {
    pub fn new(two_weight: u32, four_weight: u32) -> Self {
        SpawnPolicy { two_weight, four_weight }
    }

    /// Probability that a spawned tile is a 4.
    pub fn four_probability(&self) -> f64 {
        let total = self.two_weight as f64 + self.four_weight as f64;
        if total == 0.0 {
            0.0
        } else {
            self.four_weight as f64 / total
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        if self.four_weight == 0 {
            return 2;
        }
        if self.two_weight == 0 {
            return 4;
        }
        let total = u64::from(self.two_weight) + u64::from(self.four_weight);
        if rng.gen_range(0..total) < u64::from(self.four_weight) {
            4
        } else {
            2
        }
    }
}

/// Place a 2 or 4 on a uniformly chosen empty cell, using the provided RNG.
///
/// Fails with `GameError::GridFull` when there is no empty cell; callers are
/// expected to check `is_terminal` first.
///
/// ```
/// use matrix_2048::engine::{spawn_tile, SpawnPolicy};
/// use matrix_2048::grid::Grid;
/// use rand::{rngs::StdRng, SeedableRng};
/// let mut rng = StdRng::seed_from_u64(7);
/// let mut g = Grid::new(4).unwrap();
/// let tile = spawn_tile(&mut g, &SpawnPolicy::default(), &mut rng).unwrap();
/// assert!(tile.value == 2 || tile.value == 4);
/// assert_eq!(g.occupied_positions(), vec![tile.position]);
/// ```
pub fn spawn_tile<R: Rng + ?Sized>(
    grid: &mut Grid,
    policy: &SpawnPolicy,
    rng: &mut R,
) -> Result<Tile, GameError> {
    let empty = grid.empty_positions();
    if empty.is_empty() {
        return Err(GameError::GridFull);
    }
    let position = empty[rng.gen_range(0..empty.len())];
    let value = policy.draw(rng);
    grid[position] = value;
    debug!("spawned {value} at {position}");
    Ok(Tile { position, value })
}

/// Convenience: like `spawn_tile` but uses thread-local RNG.
pub fn spawn_tile_thread(grid: &mut Grid, policy: &SpawnPolicy) -> Result<Tile, GameError> {
    let mut rng = rand::thread_rng();
    spawn_tile(grid, policy, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MAX_TILE;
    use rand::{rngs::StdRng, SeedableRng};

    fn grid(rows: &[&[Value]]) -> Grid {
        let flat: Vec<Value> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Grid::from_values(rows.len(), &flat).unwrap()
    }

    fn row_grid(row: [Value; 4]) -> Grid {
        grid(&[&row, &[0; 4], &[0; 4], &[0; 4]])
    }

    fn first_row(g: &Grid) -> &[Value] {
        &g.values()[..g.size()]
    }

    fn merge(x: usize, y: usize, value: Value) -> MergeEvent {
        MergeEvent { position: Position::new(x, y), value }
    }

    #[test]
    fn pair_merges_left() {
        let mut g = row_grid([2, 2, 0, 0]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(first_row(&g), &[4, 0, 0, 0]);
        assert_eq!(r.merges, vec![merge(0, 0, 4)]);
        assert_eq!(r.score_delta, 4);
        assert!(r.moved);
    }

    #[test]
    fn merge_skips_gap_and_leaves_trailing_pair() {
        let mut g = row_grid([2, 0, 2, 2]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(first_row(&g), &[4, 2, 0, 0]);
        assert_eq!(r.merges, vec![merge(0, 0, 4)]);
        assert_eq!(r.score_delta, 4);
    }

    #[test]
    fn four_equal_make_two_merges() {
        let mut g = row_grid([4, 4, 4, 4]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(first_row(&g), &[8, 8, 0, 0]);
        assert_eq!(r.merges, vec![merge(0, 0, 8), merge(2, 0, 8)]);
        assert_eq!(r.score_delta, 16);
    }

    #[test]
    fn three_equal_merge_once() {
        let mut g = row_grid([2, 2, 2, 0]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(first_row(&g), &[4, 2, 0, 0]);
        assert_eq!(r.merges.len(), 1);

        let mut g = row_grid([2, 2, 2, 0]);
        let r = apply_move(&mut g, Direction::Right);
        assert_eq!(first_row(&g), &[0, 0, 2, 4]);
        assert_eq!(r.merges, vec![merge(2, 0, 4)]);
    }

    #[test]
    fn merged_tile_is_not_merged_again() {
        let mut g = row_grid([2, 2, 4, 0]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(first_row(&g), &[4, 4, 0, 0]);
        assert_eq!(r.score_delta, 4);

        let mut g = row_grid([2, 2, 4, 0]);
        apply_move(&mut g, Direction::Right);
        assert_eq!(first_row(&g), &[0, 0, 4, 4]);
    }

    #[test]
    fn unequal_row_only_slides() {
        let mut g = row_grid([0, 2, 0, 4]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(first_row(&g), &[2, 4, 0, 0]);
        assert!(r.moved);
        assert!(r.merges.is_empty());
        assert_eq!(r.score_delta, 0);
    }

    #[test]
    fn merge_without_slide_still_counts_as_moved() {
        let mut g = grid(&[&[2, 2], &[0, 0]]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(g.values(), &[4, 0, 0, 0]);
        assert_eq!(r.merges, vec![merge(0, 0, 4)]);
        assert!(r.moved);
    }

    fn sample() -> Grid {
        grid(&[
            &[2, 0, 4, 2],
            &[2, 4, 4, 0],
            &[4, 4, 0, 2],
            &[0, 4, 2, 2],
        ])
    }

    #[test]
    fn move_up_processes_rows_from_top() {
        let mut g = sample();
        let r = apply_move(&mut g, Direction::Up);
        assert_eq!(
            g.values(),
            &[4, 8, 8, 4, 4, 4, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            r.merges,
            vec![merge(0, 0, 4), merge(2, 0, 8), merge(1, 1, 8), merge(3, 0, 4)]
        );
        assert_eq!(r.score_delta, 24);
    }

    #[test]
    fn move_down_processes_rows_from_bottom() {
        let mut g = sample();
        let r = apply_move(&mut g, Direction::Down);
        assert_eq!(
            g.values(),
            &[0, 0, 0, 0, 0, 0, 0, 0, 4, 4, 8, 2, 4, 8, 2, 4]
        );
        assert_eq!(
            r.merges,
            vec![merge(1, 3, 8), merge(3, 3, 4), merge(0, 1, 4), merge(2, 1, 8)]
        );
        assert_eq!(r.score_delta, 24);
    }

    #[test]
    fn largest_pair_merges_and_max_pair_stays() {
        let half = MAX_TILE / 2;
        let mut g = grid(&[&[half, half], &[0, 0]]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(g.values(), &[MAX_TILE, 0, 0, 0]);
        assert_eq!(r.score_delta, u64::from(MAX_TILE));

        let mut g = grid(&[&[MAX_TILE, MAX_TILE], &[0, 0]]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(g.values(), &[MAX_TILE, MAX_TILE, 0, 0]);
        assert!(!r.moved);
        assert!(r.merges.is_empty());

        let mut g = grid(&[&[0, MAX_TILE], &[0, MAX_TILE]]);
        let r = apply_move(&mut g, Direction::Left);
        assert_eq!(g.values(), &[MAX_TILE, 0, MAX_TILE, 0]);
        assert!(r.moved);
        assert!(r.merges.is_empty());
    }

    #[test]
    fn settled_grid_is_a_no_op() {
        let mut g = row_grid([2, 0, 0, 4]);
        let first = apply_move(&mut g, Direction::Left);
        assert!(first.moved);
        let before = g.clone();
        let second = apply_move(&mut g, Direction::Left);
        assert_eq!(second, ChangeReport::default());
        assert_eq!(g, before);
    }

    #[test]
    fn empty_grid_never_moves() {
        let mut g = Grid::new(4).unwrap();
        for d in Direction::ALL {
            assert!(!apply_move(&mut g, d).moved);
        }
    }

    #[test]
    fn gravity_settles_long_slides_on_large_grid() {
        let size = 8;
        let mut g = Grid::new(size).unwrap();
        g.set(0, 7, 2).unwrap();
        g.set(0, 5, 4).unwrap();
        g.set(0, 2, 8).unwrap();
        apply_move(&mut g, Direction::Up);
        assert_eq!(g.get(0, 0), Ok(8));
        assert_eq!(g.get(0, 1), Ok(4));
        assert_eq!(g.get(0, 2), Ok(2));
        assert_eq!(g.occupied_positions().len(), 3);
    }

    #[test]
    fn terminal_full_checkerboard() {
        let g = grid(&[
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
        ]);
        assert!(is_terminal(&g));
        assert!(legal_moves(&g).is_empty());
    }

    #[test]
    fn one_empty_cell_is_never_terminal() {
        let g = grid(&[
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
            &[2, 4, 2, 4],
            &[4, 2, 4, 0],
        ]);
        assert!(!is_terminal(&g));
    }

    #[test]
    fn full_grid_with_equal_neighbours_is_live() {
        // Vertical pair in the last column.
        let g = grid(&[
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
            &[2, 4, 2, 8],
            &[4, 2, 4, 8],
        ]);
        assert!(!is_terminal(&g));
        assert_eq!(legal_moves(&g), vec![Direction::Up, Direction::Down]);
        // Horizontal pair in the bottom row.
        let g = grid(&[
            &[2, 4, 2, 4],
            &[4, 2, 4, 2],
            &[2, 4, 2, 4],
            &[8, 8, 4, 2],
        ]);
        assert!(!is_terminal(&g));
        assert_eq!(legal_moves(&g), vec![Direction::Right, Direction::Left]);
    }

    #[test]
    fn full_grid_with_only_max_pairs_is_terminal() {
        let g = grid(&[&[MAX_TILE, MAX_TILE], &[2, 4]]);
        assert!(is_terminal(&g));
        assert!(legal_moves(&g).is_empty());
    }

    #[test]
    fn is_terminal_does_not_mutate() {
        let g = grid(&[&[2, 2], &[4, 8]]);
        let before = g.clone();
        assert!(!is_terminal(&g));
        assert!(!legal_moves(&g).is_empty());
        assert_eq!(g, before);
    }

    #[test]
    fn spawn_fills_only_empty_cells() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut g = Grid::new(3).unwrap();
        g.set(1, 1, 64).unwrap();
        for _ in 0..8 {
            let empty = g.empty_positions();
            let tile = spawn_tile(&mut g, &SpawnPolicy::default(), &mut rng).unwrap();
            assert!(empty.contains(&tile.position));
            assert!(tile.value == 2 || tile.value == 4);
            assert_eq!(g[tile.position], tile.value);
        }
        assert!(g.is_full());
        assert_eq!(g.get(1, 1), Ok(64));
        assert_eq!(
            spawn_tile(&mut g, &SpawnPolicy::default(), &mut rng),
            Err(GameError::GridFull)
        );
    }

    #[test]
    fn spawn_ratio_follows_policy() {
        let mut rng = StdRng::seed_from_u64(2048);
        let policy = SpawnPolicy::default();
        let fours = (0..6000).filter(|_| policy.draw(&mut rng) == 4).count();
        // Expected 1000.
        assert!((800..1200).contains(&fours), "fours = {fours}");

        let only_twos = SpawnPolicy::new(1, 0);
        assert!((0..100).all(|_| only_twos.draw(&mut rng) == 2));
        let only_fours = SpawnPolicy::new(0, 3);
        assert!((0..100).all(|_| only_fours.draw(&mut rng) == 4));
        let lopsided = SpawnPolicy::new(u32::MAX, u32::MAX);
        assert!((0..100).all(|_| matches!(lopsided.draw(&mut rng), 2 | 4)));
        assert!((policy.four_probability() - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn spawn_thread_rng_fills_grid() {
        let mut g = Grid::new(2).unwrap();
        for _ in 0..4 {
            spawn_tile_thread(&mut g, &SpawnPolicy::default()).unwrap();
        }
        assert!(g.is_full());
    }
}
