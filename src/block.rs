/*!
# Block Compactor
Accumulates runs of contiguous, statistically equivalent non-variant sites into a single block record.
Categorical fields are frozen from the first member and only checked afterwards.
Numeric fields (GQX, used basecalls, filtered basecalls) are tracked as running statistics and must stay within the block tolerance.

## Example usage
```rust
use heron::block::{BlockAccumulator, BlockCandidate, BlockToleranceBuilder};
use heron::data_types::locus::{Ploidy, SampleInfo, SiteLocus};

let tolerance = BlockToleranceBuilder::default()
    .frac_tol(0.1)
    .abs_tol(3)
    .build().unwrap();
let mut block = BlockAccumulator::new(tolerance);

for (position, gqx) in [(100, 40), (101, 40), (102, 70)] {
    let site = SiteLocus::new(position, 'A', vec![], Ploidy::Fixed(2), 1, vec![SampleInfo::new(Some(gqx), "0/1", 30, 2, false)]);
    let candidate = BlockCandidate::from_site(&site);
    assert!(block.can_admit(&candidate));
    block.admit(&candidate);
}

let record = block.flush().unwrap();
assert_eq!(record.start, 100);
assert_eq!(record.count, 3);
assert_eq!(record.gt, "0/0");
assert!(block.is_empty());
```
*/

use derive_builder::Builder;
use lazy_static::lazy_static;
use serde::Serialize;

use crate::data_types::filters::FilterSet;
use crate::data_types::locus::{ContinuousSiteLocus, Ploidy, SiteLocus};
use crate::data_types::stream_stat::{StatSummary, StreamStat};

lazy_static! {
    /// Filters reported for a continuous site without any call
    static ref NO_CALL_FILTERS: FilterSet = FilterSet::default();
}

/// Genotype reported for a continuous site without any call
const NO_CALL_GT: &str = ".";

/// Label a genotype takes inside a block.
/// Het sites with low non-reference support are reported inside hom-ref blocks.
fn block_gt(gt: &str) -> &str {
    if gt == "0/1" {
        "0/0"
    } else {
        gt
    }
}

/// Tolerance for admitting a new value into a block's numeric streams
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize)]
#[builder(default)]
pub struct BlockTolerance {
    /// Spread allowed relative to the stream minimum
    frac_tol: f64,
    /// Spread allowed regardless of stream magnitude
    abs_tol: i32
}

impl Default for BlockTolerance {
    fn default() -> Self {
        Self {
            frac_tol: 0.3,
            abs_tol: 3
        }
    }
}

impl BlockTolerance {
    pub fn frac_tol(&self) -> f64 {
        self.frac_tol
    }

    pub fn abs_tol(&self) -> i32 {
        self.abs_tol
    }

    /// Label describing the blocking scheme, e.g. "BLOCKAVG_min30p3a"
    pub fn label(&self) -> String {
        format!("BLOCKAVG_min{}p{}a", (self.frac_tol * 100.0).round() as i64, self.abs_tol)
    }
}

/// Single-allowance check: passes if `min + tol >= max / 2`.
/// This compares against half of the maximum, not the spread, which keeps low-value blocks tight.
/// # Arguments
/// * `max` - stream maximum
/// * `min` - rounded stream minimum
/// * `tol` - the allowance to add to the minimum
pub fn check_block_single_tolerance(max: f64, min: i64, tol: i64) -> bool {
    (min + tol) as f64 >= max / 2.0
}

/// Checks a stream against the absolute allowance, then retries with the fractional allowance if that one is wider.
/// Empty streams always pass.
/// # Arguments
/// * `stat` - the stream, usually with a hypothetical new value already added
/// * `tolerance` - the block tolerance
pub fn check_block_tolerance(stat: &StreamStat, tolerance: &BlockTolerance) -> bool {
    let (Some(min), Some(max)) = (stat.min(), stat.max()) else {
        return true;
    };
    let min = min.round() as i64;
    let abs_tol = tolerance.abs_tol as i64;
    if check_block_single_tolerance(max, min, abs_tol) {
        return true;
    }

    let frac_tol = (min as f64 * tolerance.frac_tol).floor() as i64;
    if frac_tol <= abs_tol {
        // widening would not help
        return false;
    }
    check_block_single_tolerance(max, min, frac_tol)
}

/// Checks whether a value could join a stream.
/// If either side lacks a value, the value is blockable only when both lack one.
/// # Arguments
/// * `new_value` - the candidate value, if it has one
/// * `has_old_value` - whether the block tracks values for this stream
/// * `stat` - the block's running stream
/// * `tolerance` - the block tolerance
pub fn is_new_value_blockable(new_value: Option<f64>, has_old_value: bool, stat: &StreamStat, tolerance: &BlockTolerance) -> bool {
    match new_value {
        Some(value) if has_old_value => check_block_tolerance(&stat.with_value(value), tolerance),
        _ => new_value.is_none() && !has_old_value
    }
}

/// The fields of a site that block admission looks at, normalized across site shapes
#[derive(Clone, Debug, PartialEq)]
pub struct BlockCandidate<'a> {
    position: u64,
    ref_base: char,
    ploidy: Ploidy,
    filters: &'a FilterSet,
    gt: &'a str,
    is_nonref: bool,
    is_covered: bool,
    is_used_covered: bool,
    gqx: Option<i32>,
    n_used_calls: u32,
    n_unused_calls: u32
}

impl<'a> BlockCandidate<'a> {
    /// Builds a candidate from a standard site
    /// # Panics
    /// * if the site does not have exactly one sample, blocks are single-sample
    pub fn from_site(site: &'a SiteLocus) -> Self {
        assert_eq!(site.samples.len(), 1, "gVCF blocks require exactly one sample per site, found {} at {}", site.samples.len(), site.position);
        let sample = &site.samples[0];
        Self {
            position: site.position,
            ref_base: site.ref_base,
            ploidy: site.ploidy,
            filters: &sample.filters,
            gt: &sample.gt,
            is_nonref: site.is_nonref(),
            is_covered: sample.is_covered(),
            is_used_covered: sample.is_used_covered(),
            gqx: sample.gqx,
            n_used_calls: sample.n_used_calls,
            n_unused_calls: sample.n_unused_calls
        }
    }

    /// Builds a candidate from a continuous site; `None` if the site has more than one call
    pub fn from_continuous(site: &'a ContinuousSiteLocus) -> Option<Self> {
        let (filters, gt, gqx) = match site.calls.as_slice() {
            [] => (&*NO_CALL_FILTERS, NO_CALL_GT, None),
            [call] => (&call.filters, call.gt.as_str(), Some(call.gqx)),
            _ => return None
        };
        Some(Self {
            position: site.position,
            ref_base: site.ref_base,
            ploidy: Ploidy::NotApplicable,
            filters,
            gt,
            is_nonref: site.is_nonref,
            is_covered: site.n_used_calls != 0 || site.n_unused_calls != 0,
            is_used_covered: site.n_used_calls != 0,
            gqx,
            n_used_calls: site.n_used_calls,
            n_unused_calls: site.n_unused_calls
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_nonref(&self) -> bool {
        self.is_nonref
    }
}

/// A flushed block, ready for a downstream writer
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockRecord {
    /// First position in the block
    pub start: u64,
    /// Last position in the block, inclusive
    pub end: u64,
    /// Number of merged sites
    pub count: u64,
    pub ref_base: char,
    pub filters: FilterSet,
    pub gt: String,
    pub ploidy: Ploidy,
    pub is_covered: bool,
    pub is_used_covered: bool,
    /// False if the members have no GQX value
    pub has_call: bool,
    pub is_nonref: bool,
    /// GQX range, `None` when the members have no GQX value
    pub gqx: Option<StatSummary>,
    /// Used basecall range
    pub dpu: Option<StatSummary>,
    /// Filtered basecall range
    pub dpf: Option<StatSummary>,
    /// Describes the tolerance the block was built with
    pub block_label: String
}

/// In-progress block; owned by whoever drives the position-ordered stream
#[derive(Clone, Debug)]
pub struct BlockAccumulator {
    tolerance: BlockTolerance,
    start: u64,
    count: u64,
    // frozen from the first member
    ref_base: char,
    filters: FilterSet,
    gt: String,
    ploidy: Ploidy,
    is_covered: bool,
    is_used_covered: bool,
    has_call: bool,
    is_nonref: bool,
    // running numeric streams
    block_gqx: StreamStat,
    block_dpu: StreamStat,
    block_dpf: StreamStat
}

impl BlockAccumulator {
    /// Creates an empty block
    pub fn new(tolerance: BlockTolerance) -> Self {
        Self {
            tolerance,
            start: 0,
            count: 0,
            ref_base: 'N',
            filters: FilterSet::default(),
            gt: String::new(),
            ploidy: Ploidy::default(),
            is_covered: false,
            is_used_covered: false,
            has_call: false,
            is_nonref: false,
            block_gqx: StreamStat::default(),
            block_dpu: StreamStat::default(),
            block_dpf: StreamStat::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn tolerance(&self) -> &BlockTolerance {
        &self.tolerance
    }

    /// Returns true if the candidate can extend this block; an empty block admits anything
    /// # Arguments
    /// * `candidate` - the next site in position order
    pub fn can_admit(&self, candidate: &BlockCandidate) -> bool {
        if self.count == 0 {
            return true;
        }

        // must be +1 from the end of the block
        if self.start + self.count != candidate.position {
            return false;
        }

        if self.filters != *candidate.filters {
            return false;
        }

        // variants never go into a block
        if self.is_nonref || candidate.is_nonref {
            return false;
        }

        if self.gt != block_gt(candidate.gt) {
            return false;
        }

        if self.is_covered != candidate.is_covered || self.is_used_covered != candidate.is_used_covered {
            return false;
        }

        // also prevents mixing standard and continuous sites
        if self.ploidy != candidate.ploidy {
            return false;
        }

        is_new_value_blockable(candidate.gqx.map(f64::from), self.has_call, &self.block_gqx, &self.tolerance) &&
            is_new_value_blockable(Some(candidate.n_used_calls as f64), true, &self.block_dpu, &self.tolerance) &&
            is_new_value_blockable(Some(candidate.n_unused_calls as f64), true, &self.block_dpf, &self.tolerance)
    }

    /// Adds the candidate to the block; the first member freezes the categorical fields
    /// # Arguments
    /// * `candidate` - a site that passed `can_admit`
    pub fn admit(&mut self, candidate: &BlockCandidate) {
        debug_assert!(self.can_admit(candidate), "admitted a site at {} that fails the block test", candidate.position);
        if self.count == 0 {
            self.start = candidate.position;
            self.ref_base = candidate.ref_base;
            self.filters = candidate.filters.clone();
            self.gt = block_gt(candidate.gt).to_string();
            self.ploidy = candidate.ploidy;
            self.is_covered = candidate.is_covered;
            self.is_used_covered = candidate.is_used_covered;
            self.has_call = candidate.gqx.is_some();
            self.is_nonref = candidate.is_nonref;
        }

        if let Some(gqx) = candidate.gqx {
            self.block_gqx.add(gqx as f64);
        }
        self.block_dpu.add(candidate.n_used_calls as f64);
        self.block_dpf.add(candidate.n_unused_calls as f64);
        self.count += 1;
    }

    /// Converts the block into a record and resets it; `None` if the block is empty
    pub fn flush(&mut self) -> Option<BlockRecord> {
        if self.count == 0 {
            return None;
        }

        let record = BlockRecord {
            start: self.start,
            end: self.start + self.count - 1,
            count: self.count,
            ref_base: self.ref_base,
            filters: std::mem::take(&mut self.filters),
            gt: std::mem::take(&mut self.gt),
            ploidy: self.ploidy,
            is_covered: self.is_covered,
            is_used_covered: self.is_used_covered,
            has_call: self.has_call,
            is_nonref: self.is_nonref,
            gqx: self.block_gqx.summary(),
            dpu: self.block_dpu.summary(),
            dpf: self.block_dpf.summary(),
            block_label: self.tolerance.label()
        };
        *self = Self::new(self.tolerance);
        Some(record)
    }
}
