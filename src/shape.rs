use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Clockwise or counter-clockwise 90-degree rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// An immutable rectangular boolean mask with a designated anchor cell.
///
/// Downstream code places shapes by *anchor* position (the cell under the cursor), so
/// rotation must remap the anchor alongside the matrix rather than recomputing it from
/// scratch; see `rotate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    rows: usize,
    cols: usize,
    matrix: Vec<bool>,
    anchor_row: usize,
    anchor_col: usize,
}

impl Shape {
    /// Builds a shape from a row-major boolean matrix, cloning the input so the shape never
    /// aliases the caller's buffer. `anchor` defaults to `(rows / 2, cols / 2)` when `None`.
    pub fn new(
        rows: usize,
        cols: usize,
        cells: &[bool],
        anchor: Option<(usize, usize)>,
    ) -> CoreResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(CoreError::EmptyShapeMatrix);
        }
        assert_eq!(
            cells.len(),
            rows * cols,
            "matrix length must equal rows * cols"
        );

        let (anchor_row, anchor_col) = anchor.unwrap_or((rows / 2, cols / 2));
        if anchor_row >= rows || anchor_col >= cols {
            return Err(CoreError::InvalidAnchor {
                row: anchor_row,
                col: anchor_col,
                rows,
                cols,
            });
        }

        Ok(Self {
            rows,
            cols,
            matrix: cells.to_vec(),
            anchor_row,
            anchor_col,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn anchor_row(&self) -> usize {
        self.anchor_row
    }

    pub fn anchor_col(&self) -> usize {
        self.anchor_col
    }

    /// Value at `(r, c)`. Fails if either index is out of bounds.
    pub fn at(&self, r: usize, c: usize) -> CoreResult<bool> {
        if r >= self.rows || c >= self.cols {
            return Err(CoreError::InvalidCoordinate {
                row: r,
                col: c,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(self.matrix[r * self.cols + c])
    }

    #[inline]
    fn at_unchecked(&self, r: usize, c: usize) -> bool {
        self.matrix[r * self.cols + c]
    }

    /// Number of filled cells.
    pub fn cell_count(&self) -> usize {
        self.matrix.iter().filter(|&&v| v).count()
    }

    /// Filled-cell coordinates relative to the anchor, in row-major order.
    pub fn anchor_offsets(&self) -> Vec<(isize, isize)> {
        let mut offsets = Vec::with_capacity(self.cell_count());
        for r in 0..self.rows {
            for c in 0..self.cols {
                if self.at_unchecked(r, c) {
                    offsets.push((
                        r as isize - self.anchor_row as isize,
                        c as isize - self.anchor_col as isize,
                    ));
                }
            }
        }
        offsets
    }

    /// Produces a fresh `cols x rows` shape rotated 90 degrees in the given direction.
    ///
    /// Clockwise: `M'[c, R-1-r] = M[r,c]`, anchor `(ar,ac) -> (ac, R-1-ar)`.
    /// Counter-clockwise: `M'[C-1-c, r] = M[r,c]`, anchor `(ar,ac) -> (C-1-ac, ar)`.
    pub fn rotate(&self, dir: Rotation) -> Self {
        let new_rows = self.cols;
        let new_cols = self.rows;
        let mut matrix = vec![false; new_rows * new_cols];

        for r in 0..self.rows {
            for c in 0..self.cols {
                let value = self.at_unchecked(r, c);
                let (nr, nc) = match dir {
                    Rotation::Clockwise => (c, self.rows - 1 - r),
                    Rotation::CounterClockwise => (self.cols - 1 - c, r),
                };
                matrix[nr * new_cols + nc] = value;
            }
        }

        let (anchor_row, anchor_col) = match dir {
            Rotation::Clockwise => (self.anchor_col, self.rows - 1 - self.anchor_row),
            Rotation::CounterClockwise => (self.cols - 1 - self.anchor_col, self.anchor_row),
        };

        Self {
            rows: new_rows,
            cols: new_cols,
            matrix,
            anchor_row,
            anchor_col,
        }
    }

    /// Structural equality: dimensions and matrix bits only, ignoring the anchor. Two shapes
    /// differing only in anchor still occupy the same footprint and are the same orientation
    /// for rotation-equivalence purposes.
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.matrix == other.matrix
    }

    /// All distinct rotations of this shape, deduplicated by structural equality, in the
    /// order clockwise rotation produces them starting from the zero-rotation baseline.
    pub fn unique_rotations(&self) -> Vec<Self> {
        let mut out: Vec<Self> = vec![self.clone()];
        let mut current = self.clone();

        for _ in 0..3 {
            current = current.rotate(Rotation::Clockwise);
            if !out.iter().any(|s| s.structurally_eq(&current)) {
                out.push(current.clone());
            }
        }

        out
    }
}
