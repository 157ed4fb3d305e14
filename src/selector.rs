use std::time::{Duration, Instant};

use log::debug;

use crate::board::Board;
use crate::cover::{build_cover_matrix, duplicate_factor};
use crate::dlx::Dlx;
use crate::shape::Shape;

/// Outcome of a shape-multiset search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeSelectResult {
    /// A uniquely-solvable multiset was found: catalog indices, non-decreasing, with repeats.
    Found(Vec<usize>),
    Timeout,
    TargetTooLarge,
    NoShapes,
    NoValidPlacements,
    NoUniqueSolution,
}

/// Counters accompanying a search, regardless of outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectStats {
    pub combinations_checked: u64,
    pub prunes: u64,
    pub elapsed_ms: u128,
}

struct Candidate {
    shape: Shape,
    catalog_index: usize,
    placement_count: usize,
    rotation_count: usize,
    cell_count: usize,
}

/// Searches `catalog` for a shape multiset (size at most `max_size`) whose induced cover
/// problem over `board`'s target has exactly one solution modulo the duplicate factor.
pub fn select_shapes(
    board: &Board,
    catalog: &[Shape],
    max_size: usize,
    deadline: Instant,
) -> (ShapeSelectResult, SelectStats) {
    let start = Instant::now();
    let mut stats = SelectStats::default();

    if catalog.is_empty() {
        stats.elapsed_ms = start.elapsed().as_millis();
        return (ShapeSelectResult::NoShapes, stats);
    }

    let target_cells = (0..board.rows())
        .flat_map(|r| (0..board.cols()).map(move |c| (r, c)))
        .filter(|&(r, c)| board.target_at(r, c).unwrap_or(false))
        .count();

    let mut candidates = Vec::new();
    for (catalog_index, shape) in catalog.iter().enumerate() {
        if Instant::now() >= deadline {
            stats.elapsed_ms = start.elapsed().as_millis();
            return (ShapeSelectResult::Timeout, stats);
        }
        if shape.cell_count() > target_cells {
            continue;
        }

        let rotations = shape.unique_rotations();
        let mut placement_count = 0usize;
        for orientation in &rotations {
            if orientation.rows() > board.rows() || orientation.cols() > board.cols() {
                continue;
            }
            let max_row = board.rows() - orientation.rows();
            let max_col = board.cols() - orientation.cols();
            for row in 0..=max_row {
                for col in 0..=max_col {
                    if is_valid_on_target(board, orientation, row, col) {
                        placement_count += 1;
                    }
                }
            }
        }

        if placement_count == 0 {
            continue;
        }

        candidates.push(Candidate {
            catalog_index,
            placement_count,
            rotation_count: rotations.len(),
            cell_count: shape.cell_count(),
            shape: shape.clone(),
        });
    }

    if candidates.is_empty() {
        stats.elapsed_ms = start.elapsed().as_millis();
        return (ShapeSelectResult::NoValidPlacements, stats);
    }

    candidates.sort_by(|a, b| {
        a.placement_count
            .cmp(&b.placement_count)
            .then(b.rotation_count.cmp(&a.rotation_count))
            .then(b.cell_count.cmp(&a.cell_count))
    });

    let max_cell_count = candidates.iter().map(|c| c.cell_count).max().unwrap_or(0);
    if max_cell_count == 0 || max_cell_count.saturating_mul(max_size) < target_cells {
        stats.elapsed_ms = start.elapsed().as_millis();
        return (ShapeSelectResult::TargetTooLarge, stats);
    }

    let min_depth = target_cells.div_ceil(max_cell_count).max(1);

    // suffix_max_cell_count[i] = max cell_count over candidates[i..]; since the DFS only ever
    // continues at indices >= the current one, this bounds what a branch rooted at `i` could
    // possibly still cover, tighter than the whole-catalog `max_cell_count`.
    let mut suffix_max_cell_count = vec![0usize; candidates.len()];
    let mut running_max = 0usize;
    for i in (0..candidates.len()).rev() {
        running_max = running_max.max(candidates[i].cell_count);
        suffix_max_cell_count[i] = running_max;
    }

    let mut dfs_counter = 0u64;
    let mut saw_multi_solution = false;

    for depth in min_depth..=max_size {
        debug!(
            "selector entering depth {depth} (checked so far: {})",
            stats.combinations_checked
        );

        let mut current = Vec::with_capacity(depth);
        let outcome = dfs(
            board,
            &candidates,
            &suffix_max_cell_count,
            depth,
            target_cells,
            max_cell_count,
            0,
            0,
            &mut current,
            deadline,
            &mut dfs_counter,
            &mut stats,
            &mut saw_multi_solution,
        );

        if let Some(found) = outcome {
            stats.elapsed_ms = start.elapsed().as_millis();
            return (found, stats);
        }
        if Instant::now() >= deadline {
            stats.elapsed_ms = start.elapsed().as_millis();
            return (ShapeSelectResult::Timeout, stats);
        }
    }

    stats.elapsed_ms = start.elapsed().as_millis();
    if saw_multi_solution {
        (ShapeSelectResult::NoUniqueSolution, stats)
    } else {
        (ShapeSelectResult::NoValidPlacements, stats)
    }
}

fn is_valid_on_target(board: &Board, shape: &Shape, row: usize, col: usize) -> bool {
    for dr in 0..shape.rows() {
        for dc in 0..shape.cols() {
            if !shape.at(dr, dc).unwrap_or(false) {
                continue;
            }
            if !board.target_at(row + dr, col + dc).unwrap_or(false) {
                return false;
            }
        }
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    board: &Board,
    candidates: &[Candidate],
    suffix_max_cell_count: &[usize],
    depth: usize,
    target_cells: usize,
    max_cell_count: usize,
    start_idx: usize,
    covered_cells: usize,
    current: &mut Vec<usize>,
    deadline: Instant,
    dfs_counter: &mut u64,
    stats: &mut SelectStats,
    saw_multi_solution: &mut bool,
) -> Option<ShapeSelectResult> {
    *dfs_counter += 1;
    if *dfs_counter % 100 == 0 && Instant::now() >= deadline {
        return Some(ShapeSelectResult::Timeout);
    }

    if covered_cells == target_cells {
        stats.combinations_checked += 1;
        return verify_unique(board, candidates, current, deadline, saw_multi_solution);
    }

    if current.len() == depth {
        return None;
    }

    let remaining_slots = depth - current.len();
    if covered_cells + remaining_slots * max_cell_count < target_cells {
        stats.prunes += 1;
        return None;
    }

    for i in start_idx..candidates.len() {
        let cell_count = candidates[i].cell_count;
        if cell_count > target_cells - covered_cells {
            stats.prunes += 1;
            continue;
        }
        // No continuation starting at `i` can pick anything from a smaller index (the
        // sequence is non-decreasing), so the best any branch rooted here can do is fill
        // every remaining slot with the largest shape still reachable from `i`.
        if covered_cells + remaining_slots * suffix_max_cell_count[i] < target_cells {
            stats.prunes += 1;
            continue;
        }

        current.push(i);
        let result = dfs(
            board,
            candidates,
            suffix_max_cell_count,
            depth,
            target_cells,
            max_cell_count,
            i,
            covered_cells + cell_count,
            current,
            deadline,
            dfs_counter,
            stats,
            saw_multi_solution,
        );
        current.pop();

        if result.is_some() {
            return result;
        }
    }

    None
}

fn verify_unique(
    board: &Board,
    candidates: &[Candidate],
    indices: &[usize],
    deadline: Instant,
    saw_multi_solution: &mut bool,
) -> Option<ShapeSelectResult> {
    let shapes: Vec<Shape> = indices.iter().map(|&i| candidates[i].shape.clone()).collect();
    let matrix = build_cover_matrix(board, &shapes);
    if matrix.num_rows() == 0 {
        return None;
    }

    let factor = duplicate_factor(&shapes);
    let mut dlx = match Dlx::new_with_deadline(&matrix, Some(deadline)) {
        Ok(dlx) => dlx,
        Err(_) => return None,
    };
    let outcome = dlx.solve_all(factor as usize + 1, Some(deadline));
    if outcome.timed_out {
        return Some(ShapeSelectResult::Timeout);
    }

    let n = outcome.solutions.len() as u64;
    if n == factor && n > 0 {
        let mut catalog_indices: Vec<usize> =
            indices.iter().map(|&i| candidates[i].catalog_index).collect();
        catalog_indices.sort_unstable();
        return Some(ShapeSelectResult::Found(catalog_indices));
    }
    if n > factor {
        *saw_multi_solution = true;
    }
    None
}

/// Convenience wrapper accepting a millisecond budget instead of an `Instant` deadline.
pub fn select_shapes_with_timeout(
    board: &Board,
    catalog: &[Shape],
    max_size: usize,
    timeout_ms: u64,
) -> (ShapeSelectResult, SelectStats) {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    select_shapes(board, catalog, max_size, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_1x2() -> Shape {
        Shape::new(1, 2, &[true, true], Some((0, 0))).unwrap()
    }

    fn bar_1x3() -> Shape {
        Shape::new(1, 3, &[true, true, true], Some((0, 0))).unwrap()
    }

    fn dot() -> Shape {
        Shape::new(1, 1, &[true], Some((0, 0))).unwrap()
    }

    fn square_2x2() -> Shape {
        Shape::new(2, 2, &[true, true, true, true], Some((0, 0))).unwrap()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn two_by_two_with_bar_catalog_finds_two_bars() {
        let board = Board::new(2, 2).unwrap();
        let (result, _) = select_shapes(&board, &[bar_1x2()], 4, far_deadline());
        match result {
            ShapeSelectResult::Found(indices) => assert_eq!(indices.len(), 2),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn three_by_three_with_only_bars_never_found() {
        let board = Board::new(3, 3).unwrap();
        let (result, _) = select_shapes(&board, &[bar_1x2()], 5, far_deadline());
        assert!(matches!(
            result,
            ShapeSelectResult::NoValidPlacements
                | ShapeSelectResult::NoUniqueSolution
                | ShapeSelectResult::TargetTooLarge
        ));
    }

    #[test]
    fn empty_catalog_is_no_shapes() {
        let board = Board::new(2, 2).unwrap();
        let (result, _) = select_shapes(&board, &[], 4, far_deadline());
        assert_eq!(result, ShapeSelectResult::NoShapes);
    }

    #[test]
    fn square_on_matching_board_is_found() {
        let board = Board::new(2, 2).unwrap();
        let (result, _) = select_shapes(&board, &[square_2x2()], 1, far_deadline());
        assert_eq!(result, ShapeSelectResult::Found(vec![0]));
    }

    #[test]
    fn checkerboard_target_with_dots_is_found_with_duplicate_factor() {
        let board = Board::with_target(2, 2, vec![true, false, false, true]).unwrap();
        let (result, _) = select_shapes(&board, &[dot()], 2, far_deadline());
        match result {
            ShapeSelectResult::Found(indices) => assert_eq!(indices.len(), 2),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn two_by_three_with_mixed_bars_prefers_the_two_long_bars() {
        let board = Board::new(2, 3).unwrap();
        let (result, _) = select_shapes(&board, &[bar_1x2(), bar_1x3()], 6, far_deadline());
        match result {
            ShapeSelectResult::Found(indices) => assert_eq!(indices, vec![1, 1]),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn already_expired_deadline_times_out() {
        let board = Board::new(4, 4).unwrap();
        let (result, _) = select_shapes(&board, &[dot()], 4, Instant::now());
        assert_eq!(result, ShapeSelectResult::Timeout);
    }
}
