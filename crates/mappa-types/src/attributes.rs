//! Per-group floor attribute tables: variable-length parallel arrays of
//! small per-floor enums (mission rank, mission-forbidden flag).
//!
//! Storage is 1-based per floor: index 0 of each group is a header slot
//! the game never reads as a floor. Callers pass 0-based floor numbers and
//! the accessors add 1.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, FromRepr};

/// An attribute storable in a floor-attribute table.
pub trait FloorAttr: Copy + Default {
    fn from_byte(raw: u8) -> Option<Self>;
    fn to_byte(self) -> u8;
}

/// Mission rank of a floor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum Rank {
    #[default]
    E = 0,
    D = 1,
    C = 2,
    B = 3,
    A = 4,
    S = 5,
    S1 = 6,
    S2 = 7,
    S3 = 8,
    S4 = 9,
    S5 = 10,
    S6 = 11,
    S7 = 12,
    S8 = 13,
    S9 = 14,
}

impl FloorAttr for Rank {
    fn from_byte(raw: u8) -> Option<Self> {
        Self::from_repr(raw)
    }

    fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Whether missions may target a floor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum MissionForbidden {
    #[default]
    Allowed = 0,
    Forbidden = 1,
}

impl FloorAttr for MissionForbidden {
    fn from_byte(raw: u8) -> Option<Self> {
        Self::from_repr(raw)
    }

    fn to_byte(self) -> u8 {
        self as u8
    }
}

/// A slice of an old group referenced by a reorder plan: `(old_group,
/// start, end)` with `start..end` in 0-based floor numbers.
pub type ReorderSlice = (usize, usize, usize);

/// A reorder plan: for each new group, the old-group slices that compose
/// it, in order. Must be computed against a consistent pre-state snapshot.
pub type ReorderPlan = Vec<Vec<ReorderSlice>>;

/// A two-level attribute table: `groups[group_id][floor_number + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorAttrTable<A> {
    groups: Vec<Vec<u8>>,
    #[serde(skip)]
    _attr: PhantomData<A>,
}

impl<A: FloorAttr> FloorAttrTable<A> {
    pub fn new(groups: Vec<Vec<u8>>) -> Self {
        Self {
            groups,
            _attr: PhantomData,
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn raw_groups(&self) -> &[Vec<u8>] {
        &self.groups
    }

    /// Attribute of `floor` (0-based) in `group`, `None` when out of range
    /// or when the stored byte is not a valid attribute.
    pub fn get(&self, group: usize, floor: usize) -> Option<A> {
        let raw = *self.groups.get(group)?.get(floor + 1)?;
        A::from_byte(raw)
    }

    /// Set the attribute of `floor` (0-based) in `group`, growing the group
    /// (and the outer table) as needed. New slots carry the default.
    pub fn set(&mut self, group: usize, floor: usize, attr: A) {
        if self.groups.len() <= group {
            self.groups.resize_with(group + 1, Vec::new);
        }
        let g = &mut self.groups[group];
        if g.len() <= floor + 1 {
            g.resize(floor + 2, A::default().to_byte());
        }
        g[floor + 1] = attr.to_byte();
    }

    /// Insert `count` copies of `fill` into `group` at the 1-based storage
    /// index `insert_at`.
    pub fn extend_nb_floors(&mut self, group: usize, insert_at: usize, count: usize, fill: A) {
        if self.groups.len() <= group {
            self.groups.resize_with(group + 1, Vec::new);
        }
        let g = &mut self.groups[group];
        let at = insert_at.min(g.len());
        g.splice(at..at, std::iter::repeat_n(fill.to_byte(), count));
    }

    /// Remove `count` slots from `group` starting at the 1-based storage
    /// index `remove_at`. Out-of-range spans are clamped.
    pub fn remove_nb_floors(&mut self, group: usize, remove_at: usize, count: usize) {
        let Some(g) = self.groups.get_mut(group) else {
            return;
        };
        let lo = remove_at.min(g.len());
        let hi = (remove_at + count).min(g.len());
        g.drain(lo..hi);
    }

    /// Grow `group` with defaults or shrink it to `target_len` storage
    /// slots (1-based length including the header slot).
    pub fn adjust_nb_floors(&mut self, group: usize, target_len: usize) {
        if self.groups.len() <= group {
            self.groups.resize_with(group + 1, Vec::new);
        }
        self.groups[group].resize(target_len, A::default().to_byte());
    }

    /// Rebuild the outer table per `plan`. Each new group concatenates the
    /// referenced old-group slices; the header slot of the first referenced
    /// slice is carried over (or a default header when the group is built
    /// from scratch).
    pub fn reorder_floors(&mut self, plan: &ReorderPlan) {
        let old = std::mem::take(&mut self.groups);
        let mut new_groups = Vec::with_capacity(plan.len());
        for slices in plan {
            let mut group = vec![A::default().to_byte()];
            for &(old_group, start, end) in slices {
                let Some(src) = old.get(old_group) else {
                    continue;
                };
                // Slice bounds are 0-based floors; shift past the header.
                let lo = (start + 1).min(src.len());
                let hi = (end + 1).min(src.len());
                group.extend_from_slice(&src[lo..hi]);
            }
            new_groups.push(group);
        }
        self.groups = new_groups;
    }
}

impl<A: FloorAttr> Default for FloorAttrTable<A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
