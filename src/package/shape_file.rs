use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::shape::Shape;

/// `*.shape.json`: a single custom shape, anchor `-1` requesting auto-center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeFile {
    pub id: String,
    pub name: String,
    pub matrix: Vec<String>,
    #[serde(rename = "anchorRow")]
    pub anchor_row: i32,
    #[serde(rename = "anchorCol")]
    pub anchor_col: i32,
}

impl ShapeFile {
    /// Decodes the `'#'/'.'` matrix and builds a `Shape`, honoring the `-1` auto-center
    /// sentinel on either anchor coordinate.
    pub fn to_shape(&self) -> CoreResult<Shape> {
        let rows = self.matrix.len();
        let cols = self.matrix.first().map_or(0, |row| row.chars().count());

        let mut cells = Vec::with_capacity(rows * cols);
        for (index, row) in self.matrix.iter().enumerate() {
            let chars: Vec<char> = row.chars().collect();
            if chars.len() != cols {
                return Err(CoreError::ShapeRowLengthMismatch {
                    index,
                    actual: chars.len(),
                    expected: cols,
                });
            }
            cells.extend(chars.iter().map(|&ch| ch == '#'));
        }

        let anchor = if self.anchor_row < 0 || self.anchor_col < 0 {
            None
        } else {
            Some((self.anchor_row as usize, self.anchor_col as usize))
        };

        Shape::new(rows, cols, &cells, anchor)
    }

    /// Builds the wire form from a shape, auto-centering unconditionally (the explicit anchor
    /// loses nothing: a shape's anchor is always in-bounds by construction).
    pub fn from_shape(id: String, name: String, shape: &Shape) -> Self {
        let matrix = (0..shape.rows())
            .map(|r| {
                (0..shape.cols())
                    .map(|c| if shape.at(r, c).unwrap_or(false) { '#' } else { '.' })
                    .collect()
            })
            .collect();

        Self {
            id,
            name,
            matrix,
            anchor_row: shape.anchor_row() as i32,
            anchor_col: shape.anchor_col() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_anchor_round_trips() {
        let file = ShapeFile {
            id: "s1".to_string(),
            name: "dot".to_string(),
            matrix: vec!["#".to_string()],
            anchor_row: 0,
            anchor_col: 0,
        };
        let shape = file.to_shape().unwrap();
        assert_eq!((shape.anchor_row(), shape.anchor_col()), (0, 0));
    }

    #[test]
    fn negative_anchor_requests_auto_center() {
        let file = ShapeFile {
            id: "s1".to_string(),
            name: "bar".to_string(),
            matrix: vec!["###".to_string()],
            anchor_row: -1,
            anchor_col: -1,
        };
        let shape = file.to_shape().unwrap();
        assert_eq!((shape.anchor_row(), shape.anchor_col()), (0, 1));
    }

    #[test]
    fn from_shape_then_to_shape_round_trips_the_matrix() {
        let original = Shape::new(2, 2, &[true, false, false, true], Some((0, 0))).unwrap();
        let file = ShapeFile::from_shape("s1".to_string(), "diag".to_string(), &original);
        let rebuilt = file.to_shape().unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn jagged_matrix_rows_are_a_typed_error_not_a_panic() {
        let file = ShapeFile {
            id: "s1".to_string(),
            name: "jagged".to_string(),
            matrix: vec!["##".to_string(), "#".to_string()],
            anchor_row: 0,
            anchor_col: 0,
        };
        assert!(matches!(
            file.to_shape(),
            Err(CoreError::ShapeRowLengthMismatch { index: 1, actual: 1, expected: 2 })
        ));
    }
}
