use crate::board::Board;
use crate::shape::Shape;

/// A single `(shape-index, orientation, top-left row, top-left col)` placement record.
///
/// Both the original shape index and the oriented copy are kept as plain values (never
/// references) to avoid aliasing the input shape list; Algorithm X needs the oriented
/// copy's exact footprint at row-emit time, and downstream consumers only ever need the
/// original shape index.
#[derive(Debug, Clone)]
pub struct Placement {
    pub shape_index: usize,
    pub row: usize,
    pub col: usize,
    pub oriented: Shape,
}

/// A 0/1 exact-cover matrix built from a board and an ordered shape multiset.
///
/// Columns are the board's target cells (in row-major order) followed by one column per
/// entry of the input shape list. Each row is stored sparsely as the sorted list of columns
/// it sets to 1, and `placements[p]` is the placement record row `p` was built from.
#[derive(Debug, Clone)]
pub struct CoverMatrix {
    pub num_target_cells: usize,
    pub num_shape_slots: usize,
    pub row_columns: Vec<Vec<usize>>,
    pub placements: Vec<Placement>,
}

impl CoverMatrix {
    pub fn num_columns(&self) -> usize {
        self.num_target_cells + self.num_shape_slots
    }

    pub fn num_rows(&self) -> usize {
        self.row_columns.len()
    }
}

/// Walks the board row-major and assigns a column index to each target cell.
fn assign_target_columns(board: &Board) -> Vec<Option<usize>> {
    let mut columns = Vec::with_capacity(board.rows() * board.cols());
    let mut next = 0usize;
    for r in 0..board.rows() {
        for c in 0..board.cols() {
            if board.target_at(r, c).expect("in-bounds by construction") {
                columns.push(Some(next));
                next += 1;
            } else {
                columns.push(None);
            }
        }
    }
    columns
}

/// Builds the exact-cover matrix for `board` and the ordered shape list `shapes`.
///
/// If no valid placements exist the result has zero rows; callers must check
/// `num_rows() == 0` themselves, since the builder never treats an unsolvable problem as an
/// error (per the propagation policy: the builder never raises on an unsolvable problem).
pub fn build_cover_matrix(board: &Board, shapes: &[Shape]) -> CoverMatrix {
    let target_columns = assign_target_columns(board);
    let num_target_cells = target_columns.iter().filter(|c| c.is_some()).count();
    let col_of = |r: usize, c: usize| -> Option<usize> { target_columns[r * board.cols() + c] };

    let mut row_columns = Vec::new();
    let mut placements = Vec::new();

    for (shape_index, shape) in shapes.iter().enumerate() {
        for orientation in shape.unique_rotations() {
            if orientation.rows() > board.rows() || orientation.cols() > board.cols() {
                continue;
            }
            let max_row = board.rows() - orientation.rows();
            let max_col = board.cols() - orientation.cols();

            for row in 0..=max_row {
                for col in 0..=max_col {
                    let mut cols = Vec::with_capacity(orientation.cell_count());
                    let mut accepted = true;

                    for dr in 0..orientation.rows() {
                        for dc in 0..orientation.cols() {
                            if !orientation.at(dr, dc).unwrap_or(false) {
                                continue;
                            }
                            match col_of(row + dr, col + dc) {
                                Some(column) => cols.push(column),
                                None => {
                                    accepted = false;
                                    break;
                                }
                            }
                        }
                        if !accepted {
                            break;
                        }
                    }

                    if !accepted {
                        continue;
                    }

                    cols.push(num_target_cells + shape_index);
                    row_columns.push(cols);
                    placements.push(Placement {
                        shape_index,
                        row,
                        col,
                        oriented: orientation.clone(),
                    });
                }
            }
        }
    }

    CoverMatrix {
        num_target_cells,
        num_shape_slots: shapes.len(),
        row_columns,
        placements,
    }
}

/// The product of `k!` over groups of rotation-equivalent shapes in `shapes`.
///
/// Equals the number of permutations of a DLX solution that produce structurally
/// indistinguishable placements, since DLX treats each shape-slot column as distinct even
/// when two slots hold identical shapes.
pub fn duplicate_factor(shapes: &[Shape]) -> u64 {
    let mut assigned = vec![false; shapes.len()];
    let mut factor = 1u64;

    for i in 0..shapes.len() {
        if assigned[i] {
            continue;
        }
        let rotations = shapes[i].unique_rotations();
        let mut class_size = 0u64;
        for j in i..shapes.len() {
            if assigned[j] {
                continue;
            }
            if rotations.iter().any(|r| r.structurally_eq(&shapes[j])) {
                assigned[j] = true;
                class_size += 1;
            }
        }
        factor *= factorial(class_size);
    }

    factor
}

fn factorial(n: u64) -> u64 {
    (1..=n).product::<u64>().max(1)
}
