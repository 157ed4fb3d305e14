use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Progress record for a single level: best completion time and whether it has ever been
/// completed. Serialized the same way as the level descriptor so a host save file can carry
/// both side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelProgress {
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "bestTimeMs")]
    pub best_time_ms: Option<u64>,
}

impl LevelProgress {
    /// Records a completion, keeping the better of the existing and new times.
    pub fn record_completion(&mut self, time_ms: u64) {
        self.completed = true;
        self.best_time_ms = Some(match self.best_time_ms {
            Some(existing) => existing.min(time_ms),
            None => time_ms,
        });
    }
}

/// A linear unlock chain over an ordered list of level ids: level `i + 1` unlocks once level
/// `i` is completed. The first level is always unlocked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressTracker {
    order: Vec<String>,
    levels: BTreeMap<String, LevelProgress>,
}

impl ProgressTracker {
    pub fn new(order: Vec<String>) -> Self {
        Self {
            order,
            levels: BTreeMap::new(),
        }
    }

    pub fn progress(&self, level_id: &str) -> LevelProgress {
        self.levels.get(level_id).copied().unwrap_or_default()
    }

    /// Records completion of `level_id` with the given time, unlocking the next level in the
    /// chain (unlocking has no state of its own; it is derived from `is_unlocked`).
    pub fn record_completion(&mut self, level_id: &str, time_ms: u64) {
        self.levels
            .entry(level_id.to_string())
            .or_default()
            .record_completion(time_ms);
    }

    /// True for the first level, or for any level whose immediate predecessor in `order` is
    /// completed. Unknown ids are treated as locked.
    pub fn is_unlocked(&self, level_id: &str) -> bool {
        let Some(position) = self.order.iter().position(|id| id == level_id) else {
            return false;
        };
        if position == 0 {
            return true;
        }
        self.progress(&self.order[position - 1]).completed
    }
}
