use std::iter::repeat;
use std::time::Instant;

use log::{debug, warn};

use crate::cover::CoverMatrix;
use crate::error::{CoreError, CoreResult};

// This implementation is a toroidal four-way-linked arena, in the spirit of Ulrik Sverdrup's
// `dlx` crate: nodes live in a flat `Vec` and links are indices rather than pointers, which
// sidesteps the cyclic ownership that pointer-based dancing links would otherwise need.

#[derive(Debug, Clone, Copy)]
enum Direction {
    Prev,
    Next,
    Up,
    Down,
}

impl Direction {
    fn opposite(&self) -> Self {
        match self {
            Direction::Prev => Direction::Next,
            Direction::Next => Direction::Prev,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Node of the DLX matrix.
#[derive(Debug, Clone, Copy)]
struct Node {
    /// Links to available directions (i.e. previous, next, up, down in that particular order).
    links: [usize; 4],
    kind: NodeKind,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            links: [!0; 4],
            kind,
        }
    }

    fn get_link(&self, dir: Direction) -> usize {
        self.links[dir as usize]
    }

    fn set_link(&mut self, idx: usize, dir: Direction) -> &mut Self {
        self.links[dir as usize] = idx;
        self
    }
}

/// Role of a node inside the matrix.
#[derive(Debug, Clone, Copy)]
enum NodeKind {
    /// Singleton root node before all column headers.
    Head,
    /// Column header; carries the live node count used for MRV selection.
    Column { size: usize },
    /// Row body item; carries the column header index it belongs to.
    Body { column: usize },
}

/// Wrapper for borrowless linked-list traversal: walks from `start` and stops once it cycles
/// back around to it.
struct Walker {
    idx: usize,
    start: usize,
}

impl Walker {
    #[inline]
    fn next(&mut self, dlx: &Dlx, dir: Direction) -> Option<usize> {
        let next = dlx.nodes[self.idx].get_link(dir);
        self.idx = next;
        if next == self.start {
            return None;
        }
        Some(next)
    }
}

/// Result of one solver invocation.
#[derive(Debug, Clone, Default)]
pub struct SolveOutcome {
    /// Row-index sets, one per solution found, in deterministic MRV/first-available order.
    pub solutions: Vec<Vec<usize>>,
    /// Set when the deadline expired before the search completed. Partial results in
    /// `solutions` accompanying a timeout are not trustworthy and should be treated as "no
    /// answer" by callers.
    pub timed_out: bool,
    pub visited_nodes: u64,
}

const HEAD: usize = 0;

/// Toroidal dancing-links structure built from a `CoverMatrix`, ready for Algorithm X.
///
/// Construction fails if the matrix has zero rows or zero columns. Built once per solve and
/// owned exclusively by the caller; never shared across invocations.
pub struct Dlx {
    nodes: Vec<Node>,
    row_starts: Vec<usize>,
    visited_nodes: u64,
    timed_out: bool,
    deadline_counter: u64,
}

impl Dlx {
    pub fn new(matrix: &CoverMatrix) -> CoreResult<Self> {
        Self::new_with_deadline(matrix, None)
    }

    /// As `new`, but checks `deadline` every 100 source rows during construction.
    pub fn new_with_deadline(matrix: &CoverMatrix, deadline: Option<Instant>) -> CoreResult<Self> {
        if matrix.num_rows() == 0 || matrix.num_columns() == 0 {
            return Err(CoreError::EmptyCoverMatrix);
        }

        let num_columns = matrix.num_columns();
        let mut dlx = Self {
            nodes: Vec::with_capacity(4 * (num_columns + matrix.row_columns.len())),
            row_starts: Vec::with_capacity(matrix.row_columns.len()),
            visited_nodes: 0,
            timed_out: false,
            deadline_counter: 0,
        };

        dlx.init_headers(num_columns);

        for (i, row) in matrix.row_columns.iter().enumerate() {
            dlx.append_row(row.iter().map(|&c| c + 1));
            if i % 100 == 0 {
                if let Some(dl) = deadline {
                    if Instant::now() >= dl {
                        dlx.timed_out = true;
                        warn!("DLX construction hit its deadline after {i} rows");
                        break;
                    }
                }
            }
        }

        debug!(
            "built DLX with {} columns and {} rows",
            num_columns,
            dlx.row_starts.len()
        );

        Ok(dlx)
    }

    /// Inserts the head node and one column header per column, linked in a cycle.
    fn init_headers(&mut self, num_columns: usize) {
        self.nodes.push(Node::new(NodeKind::Head));
        self.nodes
            .extend(repeat(Node::new(NodeKind::Column { size: 0 })).take(num_columns));

        for (idx, node) in self.nodes.iter_mut().enumerate() {
            node.set_link(idx + 1, Direction::Next);
            node.set_link(idx.wrapping_sub(1), Direction::Prev);
            node.set_link(idx, Direction::Up);
            node.set_link(idx, Direction::Down);
        }

        let len = self.nodes.len();
        self.nodes[0].set_link(len - 1, Direction::Prev);
        self.nodes[len - 1].set_link(0, Direction::Next);
    }

    /// Appends a row given as 1-based header indices (column `j` lives at node index `j`).
    fn append_row(&mut self, columns: impl Iterator<Item = usize>) {
        let start_idx = self.nodes.len();

        for column in columns {
            let node_idx = self.nodes.len();
            self.nodes.push(Node::new(NodeKind::Body { column }));
            self.append_to_column(column, node_idx);
        }

        let end_idx = self.nodes.len();
        for (idx, node) in self.nodes[start_idx..].iter_mut().enumerate() {
            let prev_idx = if idx == 0 {
                end_idx - 1
            } else {
                start_idx + idx - 1
            };
            let next_idx = if start_idx + idx + 1 == end_idx {
                start_idx
            } else {
                start_idx + idx + 1
            };
            node.set_link(prev_idx, Direction::Prev);
            node.set_link(next_idx, Direction::Next);
        }

        self.row_starts.push(start_idx);
    }

    fn append_to_column(&mut self, column: usize, new_idx: usize) {
        let old_end = self.nodes[column].get_link(Direction::Up);
        self.nodes[column].set_link(new_idx, Direction::Up);
        match &mut self.nodes[column].kind {
            NodeKind::Column { size } => *size += 1,
            _ => unreachable!("column index must reference a Column node"),
        }
        self.nodes[old_end].set_link(new_idx, Direction::Down);
        self.nodes[new_idx]
            .set_link(old_end, Direction::Up)
            .set_link(column, Direction::Down);
    }

    #[inline]
    fn walk_from(&self, idx: usize) -> Walker {
        Walker { idx, start: idx }
    }

    fn column_size(&self, column: usize) -> usize {
        match self.nodes[column].kind {
            NodeKind::Column { size } => size,
            _ => unreachable!("expected a column header"),
        }
    }

    fn column_of(&self, body_idx: usize) -> usize {
        match self.nodes[body_idx].kind {
            NodeKind::Body { column } => column,
            _ => unreachable!("expected a row body node"),
        }
    }

    /// Maps a body node index back to the row index it was built from.
    fn row_index_of(&self, node_idx: usize) -> usize {
        let pos = self.row_starts.partition_point(|&start| start <= node_idx);
        pos - 1
    }

    /// Removes (hides) a single node in direction `dir` from the doubly linked list.
    fn remove(&mut self, idx: usize, dir: Direction) {
        let left = dir.opposite();
        let xr = self.nodes[idx].get_link(dir);
        let xl = self.nodes[idx].get_link(left);
        self.nodes[xr].set_link(xl, left);
        self.nodes[xl].set_link(xr, dir);
    }

    /// Restores a previously removed node in direction `dir`.
    fn restore(&mut self, idx: usize, dir: Direction) {
        let left = dir.opposite();
        let xr = self.nodes[idx].get_link(dir);
        let xl = self.nodes[idx].get_link(left);
        self.nodes[xr].set_link(idx, left);
        self.nodes[xl].set_link(idx, dir);
    }

    /// Unlinks `col` from the header cycle, then unlinks every node sharing a row with one of
    /// `col`'s live nodes, decrementing the affected columns' sizes.
    fn cover(&mut self, col: usize) {
        self.remove(col, Direction::Next);
        let mut rows = self.walk_from(col);
        while let Some(ri) = rows.next(self, Direction::Down) {
            let mut row_walker = self.walk_from(ri);
            while let Some(rij) = row_walker.next(self, Direction::Next) {
                self.remove(rij, Direction::Down);
                let c = self.column_of(rij);
                match &mut self.nodes[c].kind {
                    NodeKind::Column { size } => *size -= 1,
                    _ => unreachable!(),
                }
            }
        }
    }

    /// The exact inverse of `cover`.
    fn uncover(&mut self, col: usize) {
        let mut rows = self.walk_from(col);
        while let Some(ri) = rows.next(self, Direction::Up) {
            let mut row_walker = self.walk_from(ri);
            while let Some(rij) = row_walker.next(self, Direction::Prev) {
                self.restore(rij, Direction::Down);
                let c = self.column_of(rij);
                match &mut self.nodes[c].kind {
                    NodeKind::Column { size } => *size += 1,
                    _ => unreachable!(),
                }
            }
        }
        self.restore(col, Direction::Next);
    }

    /// Checked every 10th call; returns `true` (and latches `timed_out`) only on the 10th,
    /// 20th, ... call after the deadline has passed.
    fn deadline_expired(&mut self, deadline: Option<Instant>) -> bool {
        self.deadline_counter += 1;
        if self.deadline_counter % 10 != 0 {
            return false;
        }
        match deadline {
            Some(dl) => Instant::now() >= dl,
            None => false,
        }
    }

    /// Runs Algorithm X until the first solution is found (or the deadline expires).
    pub fn solve_one(&mut self, deadline: Option<Instant>) -> SolveOutcome {
        self.solve_all_impl(Some(1), deadline)
    }

    /// Runs Algorithm X until `max_count` solutions have been recorded (or the deadline
    /// expires). `max_count == 0` means unbounded.
    pub fn solve_all(&mut self, max_count: usize, deadline: Option<Instant>) -> SolveOutcome {
        let cap = if max_count == 0 { None } else { Some(max_count) };
        self.solve_all_impl(cap, deadline)
    }

    fn solve_all_impl(&mut self, cap: Option<usize>, deadline: Option<Instant>) -> SolveOutcome {
        self.timed_out = false;
        self.visited_nodes = 0;
        self.deadline_counter = 0;
        let mut solutions = Vec::new();
        let mut partial = Vec::new();

        self.algox(&mut partial, &mut solutions, cap, deadline);

        if self.timed_out {
            warn!(
                "DLX search timed out after visiting {} nodes with {} solutions recorded",
                self.visited_nodes,
                solutions.len()
            );
        }

        SolveOutcome {
            solutions,
            timed_out: self.timed_out,
            visited_nodes: self.visited_nodes,
        }
    }

    /// Algorithm X, recursive. Returns `true` once the search should stop unwinding further
    /// (the solution cap was reached, or the deadline expired).
    fn algox(
        &mut self,
        partial: &mut Vec<usize>,
        solutions: &mut Vec<Vec<usize>>,
        cap: Option<usize>,
        deadline: Option<Instant>,
    ) -> bool {
        if self.timed_out {
            return true;
        }
        if self.deadline_expired(deadline) {
            self.timed_out = true;
            return true;
        }

        if self.nodes[HEAD].get_link(Direction::Next) == HEAD {
            let mut rows: Vec<usize> = partial.iter().map(|&n| self.row_index_of(n)).collect();
            rows.sort_unstable();
            solutions.push(rows);
            return cap.is_some_and(|c| solutions.len() >= c);
        }

        let mut chosen = 0;
        let mut min_size = usize::MAX;
        let mut headers = self.walk_from(HEAD);
        while let Some(col) = headers.next(self, Direction::Next) {
            let size = self.column_size(col);
            if size < min_size {
                min_size = size;
                chosen = col;
                if min_size == 0 {
                    break;
                }
            }
        }

        if min_size == 0 {
            return false;
        }

        self.cover(chosen);
        let mut rows = self.walk_from(chosen);

        let mut stop = false;
        while let Some(ri) = rows.next(self, Direction::Down) {
            if self.deadline_expired(deadline) {
                self.timed_out = true;
                stop = true;
                break;
            }

            partial.push(ri);
            self.visited_nodes += 1;

            let mut row_walker = self.walk_from(ri);
            while let Some(rij) = row_walker.next(self, Direction::Next) {
                self.cover(self.column_of(rij));
            }

            stop = self.algox(partial, solutions, cap, deadline);

            partial.pop();
            let mut row_walker = self.walk_from(ri);
            let mut to_uncover = Vec::new();
            while let Some(rij) = row_walker.next(self, Direction::Prev) {
                to_uncover.push(self.column_of(rij));
            }
            for col in to_uncover {
                self.uncover(col);
            }

            if stop {
                break;
            }
        }

        self.uncover(chosen);
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::{CoverMatrix, Placement};
    use crate::shape::Shape;

    fn dummy_placement() -> Placement {
        Placement {
            shape_index: 0,
            row: 0,
            col: 0,
            oriented: Shape::new(1, 1, &[true], None).unwrap(),
        }
    }

    fn matrix_from_rows(num_columns: usize, rows: Vec<Vec<usize>>) -> CoverMatrix {
        let placements = rows.iter().map(|_| dummy_placement()).collect();
        CoverMatrix {
            num_target_cells: num_columns,
            num_shape_slots: 0,
            row_columns: rows,
            placements,
        }
    }

    /// Knuth's canonical 7-column, 6-row exact-cover example from the Algorithm X paper.
    fn knuth_example() -> CoverMatrix {
        matrix_from_rows(
            7,
            vec![
                vec![0, 3, 6],
                vec![0, 3],
                vec![3, 4, 6],
                vec![2, 4, 5],
                vec![1, 2, 5, 6],
                vec![1, 6],
            ],
        )
    }

    #[test]
    fn cover_then_uncover_is_identity() {
        let matrix = knuth_example();
        let mut dlx = Dlx::new(&matrix).unwrap();
        let before = dlx.nodes.clone();

        dlx.cover(4); // column index 3 lives at node index 4 (1-based headers)
        dlx.uncover(4);

        assert_eq!(dlx.nodes.len(), before.len());
        for (a, b) in dlx.nodes.iter().zip(before.iter()) {
            assert_eq!(a.links, b.links);
        }
    }

    #[test]
    fn knuth_example_has_the_canonical_solution() {
        let matrix = knuth_example();
        let mut dlx = Dlx::new(&matrix).unwrap();
        let outcome = dlx.solve_all(0, None);

        assert!(!outcome.timed_out);
        assert!(!outcome.solutions.is_empty());

        for solution in &outcome.solutions {
            let mut covered = vec![0u32; 7];
            for &row in solution {
                for &col in &matrix.row_columns[row] {
                    covered[col] += 1;
                }
            }
            assert!(covered.iter().all(|&c| c == 1));
        }

        assert!(outcome
            .solutions
            .iter()
            .any(|s| s == &vec![1usize, 3, 5] || s == &vec![0usize, 3, 5]));
    }

    #[test]
    fn solve_one_returns_a_single_solution() {
        let matrix = knuth_example();
        let mut dlx = Dlx::new(&matrix).unwrap();
        let outcome = dlx.solve_one(None);
        assert_eq!(outcome.solutions.len(), 1);
    }

    #[test]
    fn two_identical_placements_yield_two_solutions() {
        let matrix = matrix_from_rows(2, vec![vec![0, 1], vec![0, 1]]);
        let mut dlx = Dlx::new(&matrix).unwrap();
        let outcome = dlx.solve_all(0, None);
        assert_eq!(outcome.solutions.len(), 2);
    }

    #[test]
    fn empty_matrix_fails_to_construct() {
        let matrix = matrix_from_rows(0, vec![]);
        assert!(Dlx::new(&matrix).is_err());
    }

    #[test]
    fn enumeration_matches_brute_force_for_small_matrices() {
        let matrix = knuth_example();
        let mut dlx = Dlx::new(&matrix).unwrap();
        let outcome = dlx.solve_all(0, None);

        let brute_force = brute_force_count(&matrix);
        assert_eq!(outcome.solutions.len(), brute_force);
    }

    fn brute_force_count(matrix: &CoverMatrix) -> usize {
        let n = matrix.row_columns.len();
        let num_columns = matrix.num_columns();
        let mut count = 0;

        for mask in 0u32..(1 << n) {
            let mut covered = vec![0u32; num_columns];
            for i in 0..n {
                if mask & (1 << i) != 0 {
                    for &col in &matrix.row_columns[i] {
                        covered[col] += 1;
                    }
                }
            }
            if covered.iter().all(|&c| c == 1) {
                count += 1;
            }
        }

        count
    }
}
