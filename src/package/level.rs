use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// `level.json`: board dimensions, optional target mask, and the shapes it references by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    pub id: String,
    pub name: String,
    pub difficulty: u8,
    pub rows: usize,
    pub cols: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<String>>,
    #[serde(rename = "shapeIds")]
    pub shape_ids: Vec<String>,
}

impl LevelDescriptor {
    /// Decodes `target` into a row-major boolean mask, `'#'` = filled. A missing `target`
    /// means "all filled". Fails if any row has the wrong length or there are too many/few
    /// rows.
    pub fn target_mask(&self) -> CoreResult<Option<Vec<bool>>> {
        let Some(rows) = &self.target else {
            return Ok(None);
        };

        if rows.len() != self.rows {
            return Err(CoreError::TargetRowCountMismatch {
                actual: rows.len(),
                expected: self.rows,
            });
        }

        let mut mask = Vec::with_capacity(self.rows * self.cols);
        for (index, row) in rows.iter().enumerate() {
            let chars: Vec<char> = row.chars().collect();
            if chars.len() != self.cols {
                return Err(CoreError::TargetRowLengthMismatch {
                    index,
                    actual: chars.len(),
                    expected: self.cols,
                });
            }
            mask.extend(chars.iter().map(|&ch| ch == '#'));
        }

        Ok(Some(mask))
    }

    /// Encodes a row-major boolean mask back into `target`'s string-rows form.
    pub fn encode_target_mask(rows: usize, cols: usize, mask: &[bool]) -> Vec<String> {
        (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| if mask[r * cols + c] { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }
}
