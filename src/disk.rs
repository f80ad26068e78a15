//! Per-disk state: identity, head position, and free-space bookkeeping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::allocator::SegregatedFreeList;
use crate::object::TagId;

pub type DiskId = u32;

/// A single simulated disk: a linear array of `size` cells, `1..=size`,
/// with a single read/write head.
#[derive(Debug, Clone)]
pub struct Disk {
    pub id: DiskId,
    pub size: u32,
    pub head_point: u32,
    pub used_units: u32,
    pub last_action_was_read: bool,
    pub last_read_cost: u32,
    pub tag_slot_count: HashMap<TagId, u32>,
    pub allocator: SegregatedFreeList,
}

impl Disk {
    /// A freshly initialized disk: head parked at cell 1, entirely free.
    pub fn new(id: DiskId, size: u32) -> Self {
        Disk {
            id,
            size,
            head_point: 1,
            used_units: 0,
            last_action_was_read: false,
            last_read_cost: 0,
            tag_slot_count: HashMap::new(),
            allocator: SegregatedFreeList::new(size),
        }
    }

    pub fn largest_free_block(&self) -> u32 {
        self.allocator.largest_free_block()
    }

    pub fn tag_slots(&self, tag: TagId) -> u32 {
        self.tag_slot_count.get(&tag).copied().unwrap_or(0)
    }

    /// `true` once `used_units` reaches 90% of capacity; placement vetoes
    /// any disk in this state.
    pub fn is_nearly_full(&self) -> bool {
        self.used_units as u64 * 10 > 9 * self.size as u64
    }

    /// Reserve `cells.len()` units for `tag`, updating usage accounting.
    /// Does not touch the allocator; callers allocate cells first and
    /// record them here once a replica is committed.
    pub fn record_allocation(&mut self, tag: TagId, cells: &[u32]) {
        self.used_units += cells.len() as u32;
        *self.tag_slot_count.entry(tag).or_insert(0) += cells.len() as u32;
    }

    /// Release `cells` back to the allocator and undo usage accounting for
    /// `tag`.
    pub fn record_free(&mut self, tag: TagId, cells: &[u32]) {
        self.allocator.free(cells);
        self.used_units = self.used_units.saturating_sub(cells.len() as u32);
        if let Some(count) = self.tag_slot_count.get_mut(&tag) {
            *count = count.saturating_sub(cells.len() as u32);
        }
    }
}

/// A serializable snapshot of disk state, useful for diagnostics; runtime
/// code always works with `Disk` directly since the allocator itself is
/// not (and does not need to be) persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSummary {
    pub id: DiskId,
    pub size: u32,
    pub head_point: u32,
    pub used_units: u32,
    pub largest_free_block: u32,
}

impl From<&Disk> for DiskSummary {
    fn from(disk: &Disk) -> Self {
        DiskSummary {
            id: disk.id,
            size: disk.size,
            head_point: disk.head_point,
            used_units: disk.used_units,
            largest_free_block: disk.largest_free_block(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_disk_starts_idle_and_empty() {
        let d = Disk::new(0, 10);
        assert_eq!(d.head_point, 1);
        assert_eq!(d.used_units, 0);
        assert_eq!(d.largest_free_block(), 5);
        assert!(!d.is_nearly_full());
    }

    #[test]
    fn record_allocation_and_free_round_trip_usage() {
        let mut d = Disk::new(0, 10);
        let cells = d.allocator.allocate(3).unwrap();
        d.record_allocation(1, &cells);
        assert_eq!(d.used_units, 3);
        assert_eq!(d.tag_slots(1), 3);
        d.record_free(1, &cells);
        assert_eq!(d.used_units, 0);
        assert_eq!(d.tag_slots(1), 0);
    }

    #[test]
    fn nearly_full_veto_threshold() {
        let mut d = Disk::new(0, 100);
        d.used_units = 89;
        assert!(!d.is_nearly_full());
        d.used_units = 91;
        assert!(d.is_nearly_full());
    }
}
