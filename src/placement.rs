//! Placement policy: choosing three distinct disks for a new object's
//! replicas.

use crate::allocator::MAX_OBJ_SIZE;
use crate::disk::{Disk, DiskId};
use crate::object::TagId;

/// Number of replicas every object is given.
pub const REPLICA_COUNT: usize = 3;

/// Placement engine: scores every disk for a candidate write and selects
/// the three highest-scoring, distinct disks.
pub struct PlacementEngine;

impl PlacementEngine {
    /// Score every disk for placing an object of `size` and `tag`, then
    /// return the IDs of the top `REPLICA_COUNT` distinct disks, highest
    /// score first. `None` if fewer than `REPLICA_COUNT` disks score above
    /// the veto threshold.
    pub fn select_disks(&self, disks: &[Disk], size: u32, tag: TagId) -> Option<Vec<DiskId>> {
        let mut scored: Vec<(DiskId, f64)> = disks
            .iter()
            .map(|d| (d.id, Self::score(d, size, tag)))
            .filter(|(_, score)| *score >= 0.0)
            .collect();

        if scored.len() < REPLICA_COUNT {
            return None;
        }

        // Descending by score; ties broken by lowest disk id.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let chosen: Vec<DiskId> = scored.into_iter().take(REPLICA_COUNT).map(|(id, _)| id).collect();
        log::debug!("placement chose disks {:?} for size={} tag={}", chosen, size, tag);
        Some(chosen)
    }

    /// `score = w_contig * s_contig + w_tag * s_tag`, vetoed to `-1` once a
    /// disk is at or above 90% full.
    fn score(disk: &Disk, size: u32, tag: TagId) -> f64 {
        if disk.is_nearly_full() {
            return -1.0;
        }

        let size_ratio = size as f64 / MAX_OBJ_SIZE as f64;
        let w_contig = 0.7 + 0.2 * size_ratio;
        let w_tag = 1.0 - w_contig;

        let s_contig = (disk.largest_free_block() as f64 / MAX_OBJ_SIZE as f64).clamp(0.0, 1.0);
        let s_tag = 1.0 - disk.tag_slots(tag) as f64 / disk.size as f64;

        w_contig * s_contig + w_tag * s_tag
    }
}
