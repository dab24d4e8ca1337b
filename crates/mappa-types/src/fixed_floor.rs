use serde::{Deserialize, Serialize};

use crate::action::ActionRule;

/// A hand-authored floor: a rectangular grid of action rules.
///
/// Cell `(x, y)` lives at `actions[y * width + x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedFloor {
    width: usize,
    height: usize,
    actions: Vec<ActionRule>,
}

impl FixedFloor {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            actions: vec![ActionRule::DEFAULT_FLOOR; width * height],
        }
    }

    /// Build from an existing action buffer. Returns `None` when the buffer
    /// length does not match the dimensions.
    pub fn from_actions(width: usize, height: usize, actions: Vec<ActionRule>) -> Option<Self> {
        (actions.len() == width * height).then_some(Self {
            width,
            height,
            actions,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn actions(&self) -> &[ActionRule] {
        &self.actions
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&ActionRule> {
        (x < self.width && y < self.height).then(|| &self.actions[y * self.width + x])
    }

    pub fn set(&mut self, x: usize, y: usize, rule: ActionRule) {
        if x < self.width && y < self.height {
            self.actions[y * self.width + x] = rule;
        }
    }

    /// Snapshot of the action at `(x, y)` for the editor's selection buffer.
    pub fn copy(&self, x: usize, y: usize) -> Option<ActionRule> {
        self.get(x, y).copied()
    }

    /// Drag-move: the source action lands on the destination and the source
    /// cell is backfilled with plain floor. A move onto itself is a no-op.
    pub fn move_action(&mut self, src: (usize, usize), dst: (usize, usize)) {
        if src == dst {
            return;
        }
        let Some(action) = self.copy(src.0, src.1) else {
            return;
        };
        if dst.0 >= self.width || dst.1 >= self.height {
            return;
        }
        self.set(dst.0, dst.1, action);
        self.set(src.0, src.1, ActionRule::DEFAULT_FLOOR);
    }

    /// Resize the grid, preserving the overlapping rectangle. New cells are
    /// filled with plain room floor.
    pub fn resize(&mut self, width: usize, height: usize) {
        let mut actions = vec![ActionRule::DEFAULT_FLOOR; width * height];
        for y in 0..self.height.min(height) {
            for x in 0..self.width.min(width) {
                actions[y * width + x] = self.actions[y * self.width + x];
            }
        }
        self.width = width;
        self.height = height;
        self.actions = actions;
    }
}
