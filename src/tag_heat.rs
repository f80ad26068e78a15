//! Per-tag, per-epoch workload statistics and the heat weight derived from
//! them.

use crate::object::TagId;

/// Epochs over which heat is summed when computing `heat[tag][epoch]`.
pub const HEAT_WINDOW: usize = 2;

/// Historical and heat-derived statistics for every tag, indexed by epoch.
///
/// Tags and epochs are 1-based in the protocol; internally everything is
/// stored 0-indexed and the public API takes 1-based indices to match the
/// rest of the domain model.
pub struct TagHeatTable {
    /// `deletes[tag][epoch]`, 0-indexed.
    deletes: Vec<Vec<u64>>,
    /// `reads[tag][epoch]`, 0-indexed.
    reads: Vec<Vec<u64>>,
    /// `heat[tag][epoch]`, 0-indexed, recomputed at the start of each epoch.
    heat: Vec<Vec<f64>>,
}

impl TagHeatTable {
    /// Build from the delete and read history matrices read from the
    /// preamble, each row indexed by tag (1-based in the protocol, stored
    /// 0-indexed here) and column by epoch. The preamble's write-history
    /// matrix plays no part in the heat formula and is not retained.
    pub fn new(deletes: Vec<Vec<u64>>, reads: Vec<Vec<u64>>) -> Self {
        let num_tags = deletes.len();
        let num_epochs = deletes.first().map(|r| r.len()).unwrap_or(0);
        let heat = vec![vec![0.0; num_epochs]; num_tags];
        TagHeatTable { deletes, reads, heat }
    }

    pub fn num_tags(&self) -> usize {
        self.deletes.len()
    }

    pub fn num_epochs(&self) -> usize {
        self.deletes.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Recompute `heat[t][epoch]` for every tag, summing reads and deletes
    /// over the window `[epoch, epoch + HEAT_WINDOW)`. Epochs past the end
    /// of the time horizon contribute zero; a call for such an epoch (the
    /// `EXTRA_TIME` drain can run past the last real epoch) is a no-op.
    pub fn recompute_for_epoch(&mut self, epoch: u64) {
        let idx = (epoch - 1) as usize;
        let num_epochs = self.num_epochs();
        if idx >= num_epochs {
            return;
        }
        for tag in 0..self.num_tags() {
            let mut reads_sum = 0u64;
            let mut deletes_sum = 0u64;
            for e in idx..(idx + HEAT_WINDOW).min(num_epochs) {
                reads_sum += self.reads[tag][e];
                deletes_sum += self.deletes[tag][e];
            }
            self.heat[tag][idx] = reads_sum as f64 / (1.0 + deletes_sum as f64);
        }
    }

    /// `heat[tag][epoch]`, both 1-based.
    pub fn heat(&self, tag: TagId, epoch: u64) -> f64 {
        let t = (tag as usize).saturating_sub(1);
        let e = (epoch as usize).saturating_sub(1);
        self.heat.get(t).and_then(|row| row.get(e)).copied().unwrap_or(0.0)
    }
}

/// Epoch index of timestamp `t`, 1-based: slices `1..=1800` are epoch 1,
/// `1801..=3600` epoch 2, and so on.
pub fn epoch_of(t: u64, slices_per_epoch: u64) -> u64 {
    (t - 1) / slices_per_epoch + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_of_boundaries() {
        assert_eq!(epoch_of(1, 1800), 1);
        assert_eq!(epoch_of(1800, 1800), 1);
        assert_eq!(epoch_of(1801, 1800), 2);
    }

    #[test]
    fn heat_sums_window_and_handles_horizon_end() {
        // two tags, three epochs
        let deletes = vec![vec![0, 1, 0], vec![2, 0, 0]];
        let reads = vec![vec![10, 5, 1], vec![4, 0, 0]];
        let mut table = TagHeatTable::new(deletes, reads);

        table.recompute_for_epoch(1);
        // tag 1, epoch 1: reads over [1,2] = 10+5=15, deletes=0+1=1 -> 15/2
        assert!((table.heat(1, 1) - 7.5).abs() < 1e-9);

        table.recompute_for_epoch(3);
        // tag 1, epoch 3: window clipped to just epoch 3: reads=1, deletes=0 -> 1/1
        assert!((table.heat(1, 3) - 1.0).abs() < 1e-9);
        // tag 2, epoch 3: reads=0, deletes=0 -> 0
        assert_eq!(table.heat(2, 3), 0.0);
    }

    #[test]
    fn recompute_past_the_horizon_is_a_no_op() {
        // one tag, one epoch: simulates EXTRA_TIME drain crossing into an
        // epoch the preamble never reported history for.
        let deletes = vec![vec![0]];
        let reads = vec![vec![5]];
        let mut table = TagHeatTable::new(deletes, reads);

        table.recompute_for_epoch(1);
        assert!((table.heat(1, 1) - 5.0).abs() < 1e-9);

        // epoch 2 is past num_epochs() == 1; must not panic or touch `heat`.
        table.recompute_for_epoch(2);
        assert_eq!(table.heat(1, 2), 0.0);
    }
}
