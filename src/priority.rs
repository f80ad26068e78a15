//! Priority scoring for pending read requests and the max-heap they live
//! in while awaiting a disk.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::disk::Disk;
use crate::object::Object;
use crate::request::{Request, RequestId};
use crate::tag_heat::{epoch_of, TagHeatTable};

/// Weight of head distance vs. tag heat in the blended priority score.
const DISTANCE_WEIGHT: f64 = 0.4;
const TAG_WEIGHT: f64 = 0.6;

/// `priority = 0.4 * distance_weight + 0.6 * tag_weight` for a PENDING
/// request. `distance_weight` sums each replica's clockwise distance from
/// its disk's head to the replica's first cell; `tag_weight` is the
/// object's tag heat at the epoch the request was enqueued.
pub fn compute_priority(
    object: &Object,
    request: &Request,
    disks: &[Disk],
    tag_heat: &TagHeatTable,
    slices_per_epoch: u64,
) -> f64 {
    let distance_weight: u64 = object
        .replicas
        .iter()
        .map(|replica| {
            let disk = &disks[replica.disk_id as usize];
            let first_cell = replica.units[0] as u64;
            let size = disk.size as u64;
            (first_cell + size - disk.head_point as u64) % size
        })
        .sum();

    let epoch = epoch_of(request.start_timestamp, slices_per_epoch);
    let tag_weight = tag_heat.heat(object.tag, epoch);

    DISTANCE_WEIGHT * distance_weight as f64 + TAG_WEIGHT * tag_weight
}

/// An entry in the scheduler's global max-heap of pending/reading request
/// IDs, ordered by priority. Ties are broken by request ID so that ordering
/// is a total order and heap iteration is deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    priority: f64,
    request_id: RequestId,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.request_id.cmp(&other.request_id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap of request IDs awaiting service. Priorities are assigned once
/// at enqueue time; entries become stale as head positions move, and the
/// scheduler tolerates this by filtering ghost IDs (requests no longer
/// live) at dequeue rather than rebalancing.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<HeapEntry>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        PriorityQueue { heap: BinaryHeap::new() }
    }

    pub fn push(&mut self, request_id: RequestId, priority: f64) {
        self.heap.push(HeapEntry { priority, request_id });
    }

    pub fn pop(&mut self) -> Option<RequestId> {
        self.heap.pop().map(|e| e.request_id)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_highest_priority_first() {
        let mut q = PriorityQueue::new();
        q.push(1, 5.0);
        q.push(2, 9.0);
        q.push(3, 1.0);
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn ties_break_by_lower_request_id() {
        let mut q = PriorityQueue::new();
        q.push(7, 3.0);
        q.push(2, 3.0);
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(7));
    }
}
