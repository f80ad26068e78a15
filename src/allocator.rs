//! Segregated free-list allocator for a single disk's cell space.
//!
//! Six buckets: buckets `0..=4` hold free blocks of exact size `1..=5`;
//! bucket `5` holds every free block of size `>= 6`. Allocation prefers a
//! single contiguous block (worst-fit within the mixed bucket, FIFO within
//! fixed-size buckets) and falls back to a fragmented allocation assembled
//! from several smaller blocks. Freeing coalesces exhaustively so that no
//! two free blocks ever abut.

use std::collections::VecDeque;

/// Largest size a single object may occupy; also the top fixed-size bucket.
pub const MAX_OBJ_SIZE: u32 = 5;

/// A contiguous run of free cells, `[start, start + size)`, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    pub start: u32,
    pub size: u32,
}

impl FreeBlock {
    fn end(&self) -> u32 {
        self.start + self.size
    }
}

fn bucket_of(size: u32) -> usize {
    debug_assert!(size >= 1);
    (size.min(MAX_OBJ_SIZE + 1) - 1) as usize
}

/// Segregated free-list allocator over the cell range `[1, capacity]`.
#[derive(Debug, Clone)]
pub struct SegregatedFreeList {
    buckets: [VecDeque<FreeBlock>; 6],
}

impl SegregatedFreeList {
    /// New allocator whose entire range starts free, as a single block in
    /// bucket 5.
    pub fn new(capacity: u32) -> Self {
        let mut buckets: [VecDeque<FreeBlock>; 6] = Default::default();
        buckets[5].push_back(FreeBlock { start: 1, size: capacity });
        SegregatedFreeList { buckets }
    }

    /// Size of the largest free block, saturated at `MAX_OBJ_SIZE`.
    pub fn largest_free_block(&self) -> u32 {
        for i in (0..=5).rev() {
            if let Some(block) = self.buckets[i].iter().max_by_key(|b| b.size) {
                return block.size.min(MAX_OBJ_SIZE);
            }
        }
        0
    }

    pub fn free_cells(&self) -> u32 {
        self.buckets.iter().flatten().map(|b| b.size).sum()
    }

    /// Allocate `n` cells (`1 <= n <= MAX_OBJ_SIZE`), returning them in
    /// ascending order, or `None` if no allocation satisfies the request.
    pub fn allocate(&mut self, n: u32) -> Option<Vec<u32>> {
        debug_assert!((1..=MAX_OBJ_SIZE).contains(&n));
        if let Some(cells) = self.allocate_contiguous(n) {
            return Some(cells);
        }
        self.allocate_fragmented(n)
    }

    /// Remove and return one contiguous block of exactly `n` cells, if the
    /// buckets hold a block of size `>= n`.
    fn allocate_contiguous(&mut self, n: u32) -> Option<Vec<u32>> {
        let block = self.take_block_at_least(n)?;
        Some(self.carve(block, n))
    }

    /// Pop a block of size `>= n` from the buckets, scanning from the
    /// largest class down to the smallest that could still satisfy `n`.
    /// Worst-fit (largest) in the mixed bucket 5, FIFO in fixed buckets.
    fn take_block_at_least(&mut self, n: u32) -> Option<FreeBlock> {
        let lo = bucket_of(n);
        for i in (lo..=5).rev() {
            if self.buckets[i].is_empty() {
                continue;
            }
            if i == 5 {
                let (idx, _) = self.buckets[5]
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, b)| b.size)?;
                return self.buckets[5].remove(idx);
            }
            return self.buckets[i].pop_front();
        }
        None
    }

    /// Carve `n` cells off the front of `block`, reinserting any remainder.
    fn carve(&mut self, block: FreeBlock, n: u32) -> Vec<u32> {
        let cells: Vec<u32> = (block.start..block.start + n).collect();
        let remaining = block.size - n;
        if remaining > 0 {
            let tail = FreeBlock { start: block.start + n, size: remaining };
            self.buckets[bucket_of(remaining)].push_back(tail);
        }
        cells
    }

    /// Assemble `n` cells from several smaller blocks. Tries partitions of
    /// the form "one piece of size `m`, plus a self-similar partition of
    /// `n - m` with pieces `<= m`", for `m = n-1, n-2, ..., 1`, taking the
    /// first partition the current bucket counts can satisfy.
    fn allocate_fragmented(&mut self, n: u32) -> Option<Vec<u32>> {
        for m in (1..n).rev() {
            if let Some(counts) = self.partition_fits(n, m) {
                return Some(self.carry_out_partition(counts));
            }
        }
        None
    }

    /// Try the partition led by a piece of size `m`: greedily take as many
    /// `m`-pieces as available then recurse on the remainder with pieces
    /// bounded by `m`. Returns `size -> count` if the buckets can supply it.
    fn partition_fits(&self, n: u32, m: u32) -> Option<Vec<(u32, u32)>> {
        let mut remaining = n;
        let mut counts: Vec<(u32, u32)> = Vec::new();
        for size in (1..=m).rev() {
            if remaining == 0 {
                break;
            }
            let available = self.count_in_bucket(size, &counts);
            let take = available.min(remaining / size);
            if take > 0 {
                counts.push((size, take));
                remaining -= take * size;
            }
        }
        if remaining == 0 {
            Some(counts)
        } else {
            None
        }
    }

    fn count_in_bucket(&self, size: u32, already_taken: &[(u32, u32)]) -> u32 {
        let bucket_len = self.buckets[bucket_of(size)].len() as u32;
        let taken: u32 = already_taken
            .iter()
            .filter(|(s, _)| *s == size)
            .map(|(_, c)| *c)
            .sum();
        bucket_len.saturating_sub(taken)
    }

    fn carry_out_partition(&mut self, counts: Vec<(u32, u32)>) -> Vec<u32> {
        let mut cells = Vec::new();
        for (size, count) in counts {
            for _ in 0..count {
                let block = self.buckets[bucket_of(size)]
                    .pop_front()
                    .expect("partition_fits guaranteed this bucket was non-empty");
                cells.extend(self.carve(block, size));
            }
        }
        cells.sort_unstable();
        cells
    }

    /// Return `cells` to the free pool. `cells` need not be contiguous: it
    /// is split into maximal runs of consecutive integers, each of which is
    /// coalesced independently with any abutting free blocks.
    pub fn free(&mut self, cells: &[u32]) {
        for run in consecutive_runs(cells) {
            self.insert_coalesced(run);
        }
    }

    fn insert_coalesced(&mut self, mut block: FreeBlock) {
        while let Some((bucket, idx)) = self.find_abutting(&block) {
            let other = self.buckets[bucket].remove(idx).unwrap();
            block = merge(block, other);
        }
        self.buckets[bucket_of(block.size)].push_back(block);
    }

    fn find_abutting(&self, block: &FreeBlock) -> Option<(usize, usize)> {
        for bucket in 0..=5 {
            for (idx, other) in self.buckets[bucket].iter().enumerate() {
                if other.end() == block.start || block.end() == other.start {
                    return Some((bucket, idx));
                }
            }
        }
        None
    }

    #[cfg(test)]
    fn bucket_len(&self, i: usize) -> usize {
        self.buckets[i].len()
    }
}

fn merge(a: FreeBlock, b: FreeBlock) -> FreeBlock {
    let start = a.start.min(b.start);
    let end = a.end().max(b.end());
    FreeBlock { start, size: end - start }
}

fn consecutive_runs(cells: &[u32]) -> Vec<FreeBlock> {
    let mut sorted = cells.to_vec();
    sorted.sort_unstable();
    let mut runs = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else { return runs };
    let mut start = first;
    let mut prev = first;
    for cell in iter {
        if cell == prev + 1 {
            prev = cell;
            continue;
        }
        runs.push(FreeBlock { start, size: prev - start + 1 });
        start = cell;
        prev = cell;
    }
    runs.push(FreeBlock { start, size: prev - start + 1 });
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_allocator_is_one_block_in_bucket_five() {
        let a = SegregatedFreeList::new(25);
        assert_eq!(a.free_cells(), 25);
        assert_eq!(a.largest_free_block(), MAX_OBJ_SIZE);
        assert_eq!(a.bucket_len(5), 1);
    }

    #[test]
    fn allocate_five_on_exact_block_is_contiguous() {
        let mut a = SegregatedFreeList::new(5);
        let cells = a.allocate(5).expect("alloc 5");
        assert_eq!(cells, vec![1, 2, 3, 4, 5]);
        assert_eq!(a.free_cells(), 0);
        a.free(&cells);
        assert_eq!(a.free_cells(), 5);
        assert_eq!(a.bucket_len(5), 1);
    }

    #[test]
    fn allocate_three_from_one_and_two_buckets_is_fragmented() {
        let mut a = SegregatedFreeList::new(10);
        // carve the pool down into isolated blocks of size 1 and 2
        let big = a.allocate(5).unwrap(); // cells 1..=5
        let _rest = a.allocate(5).unwrap(); // cells 6..=10, empties the pool
        a.free(&[big[0], big[1]]); // 2-block at [1,3)
        a.free(&[big[4]]); // 1-block at [5,6)
        assert_eq!(a.bucket_len(0), 1); // one free block of size 1
        assert_eq!(a.bucket_len(1), 1); // one free block of size 2
        assert_eq!(a.bucket_len(5), 0);

        let cells = a.allocate(3).expect("fragmented alloc of 3");
        assert_eq!(cells, vec![1, 2, 5]);
    }

    #[test]
    fn allocate_fails_when_insufficient_free_space() {
        let mut a = SegregatedFreeList::new(3);
        let _ = a.allocate(3).unwrap();
        assert!(a.allocate(1).is_none());
    }

    #[test]
    fn free_coalesces_exhaustively_no_abut() {
        let mut a = SegregatedFreeList::new(25);
        let o1 = a.allocate(5).unwrap();
        let o2 = a.allocate(5).unwrap();
        let o3 = a.allocate(5).unwrap();
        a.free(&o1);
        a.free(&o3);
        // o2 still allocated: free blocks are [1,5] and [11,15], not abutting
        assert!(!has_abutting_pair(&a));
        a.free(&o2);
        // now everything free and should have re-coalesced into one run
        assert!(!has_abutting_pair(&a));
        assert_eq!(a.free_cells(), 25);
        assert_eq!(a.bucket_len(5), 1);
    }

    #[test]
    fn allocate_then_free_restores_total_free_cells() {
        let mut a = SegregatedFreeList::new(37);
        let before = a.free_cells();
        let cells = a.allocate(4).unwrap();
        assert_eq!(a.free_cells(), before - 4);
        a.free(&cells);
        assert_eq!(a.free_cells(), before);
    }

    fn has_abutting_pair(a: &SegregatedFreeList) -> bool {
        let mut all: Vec<FreeBlock> = a.buckets.iter().flatten().copied().collect();
        all.sort_by_key(|b| b.start);
        all.windows(2).any(|w| w[0].end() == w[1].start)
    }
}
