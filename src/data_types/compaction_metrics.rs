
use serde::Serialize;
use std::ops::AddAssign;

/// Counts describing how well a locus stream compacted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompactionMetrics {
    /// Number of loci that entered the compactor
    pub loci: u64,
    /// Number of block records emitted
    pub blocks: u64,
    /// Number of loci folded into those blocks
    pub block_loci: u64,
    /// Number of loci emitted as their own record
    pub single_records: u64,
    /// Number of samples that received at least one filter during classification
    pub filtered_samples: u64
}

impl AddAssign for CompactionMetrics {
    // Enables += with stats
    fn add_assign(&mut self, rhs: Self) {
        self.loci += rhs.loci;
        self.blocks += rhs.blocks;
        self.block_loci += rhs.block_loci;
        self.single_records += rhs.single_records;
        self.filtered_samples += rhs.filtered_samples;
    }
}

impl CompactionMetrics {
    /// Total number of emitted records
    pub fn records(&self) -> u64 {
        self.blocks + self.single_records
    }

    /// Input loci per emitted record, if anything was emitted
    pub fn compression_ratio(&self) -> Option<f64> {
        let records = self.records();
        if records > 0 {
            Some(self.loci as f64 / records as f64)
        } else {
            None
        }
    }
}
