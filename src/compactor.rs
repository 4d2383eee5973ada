/*!
# Contig compactor
Drives the block accumulator over one contig's position-ordered locus stream.
Reference-like sites are folded into blocks, everything else is emitted as its own record.
Each contig gets its own compactor, so contigs can be processed in parallel.
*/

use log::trace;
use serde::Serialize;

use crate::block::{BlockAccumulator, BlockCandidate, BlockRecord, BlockTolerance};
use crate::data_types::compaction_metrics::CompactionMetrics;
use crate::data_types::contig::ContigRecords;
use crate::data_types::locus::{ContinuousSiteLocus, IndelLocus, Locus, SiteLocus};

/// One output record of the compacted stream
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum GvcfRecord {
    Block(BlockRecord),
    Site(SiteLocus),
    Indel(IndelLocus),
    Continuous(ContinuousSiteLocus)
}

impl GvcfRecord {
    /// First position covered by the record
    pub fn start(&self) -> u64 {
        match self {
            GvcfRecord::Block(b) => b.start,
            GvcfRecord::Site(s) => s.position,
            GvcfRecord::Indel(i) => i.position,
            GvcfRecord::Continuous(c) => c.position
        }
    }
}

/// Owned compaction state for a single contig
#[derive(Debug)]
pub struct ContigCompactor {
    contig: String,
    block: BlockAccumulator,
    records: Vec<GvcfRecord>,
    metrics: CompactionMetrics,
    /// Position of the last site-like locus, these must strictly increase
    last_site_position: Option<u64>,
    /// Position of the last locus of any kind; an indel may share a site's position
    last_locus_position: Option<u64>
}

impl ContigCompactor {
    /// Creates an empty compactor
    /// # Arguments
    /// * `contig` - contig name, carried to the output
    /// * `tolerance` - block tolerance for every block on this contig
    pub fn new(contig: &str, tolerance: BlockTolerance) -> Self {
        Self {
            contig: contig.to_string(),
            block: BlockAccumulator::new(tolerance),
            records: vec![],
            metrics: CompactionMetrics::default(),
            last_site_position: None,
            last_locus_position: None
        }
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn metrics(&self) -> &CompactionMetrics {
        &self.metrics
    }

    /// Dispatches a locus to the matching add function
    pub fn add_locus(&mut self, locus: Locus) {
        match locus {
            Locus::Site(site) => self.add_site(site),
            Locus::Indel(indel) => self.add_indel(indel),
            Locus::Continuous(continuous) => self.add_continuous_site(continuous)
        }
    }

    /// Adds a standard site; variant sites are emitted on their own
    /// # Panics
    /// * if the position does not increase, or the site does not have exactly one sample
    pub fn add_site(&mut self, site: SiteLocus) {
        self.check_site_order(site.position);
        self.metrics.loci += 1;

        let candidate = BlockCandidate::from_site(&site);
        if candidate.is_nonref() {
            self.flush();
            self.push_single(GvcfRecord::Site(site));
        } else {
            self.admit(&candidate);
        }
    }

    /// Adds a continuous site; variant sites and sites with several calls are emitted on their own
    /// # Panics
    /// * if the position does not increase
    pub fn add_continuous_site(&mut self, site: ContinuousSiteLocus) {
        self.check_site_order(site.position);
        self.metrics.loci += 1;

        let candidate = BlockCandidate::from_continuous(&site)
            .filter(|c| !c.is_nonref());
        if let Some(candidate) = candidate {
            self.admit(&candidate);
        } else {
            self.flush();
            self.push_single(GvcfRecord::Continuous(site));
        }
    }

    /// Adds an indel locus; indels always end the current block and are emitted on their own
    /// # Panics
    /// * if the position is before the previous locus
    pub fn add_indel(&mut self, indel: IndelLocus) {
        self.check_locus_order(indel.position);
        self.metrics.loci += 1;
        self.flush();
        self.push_single(GvcfRecord::Indel(indel));
    }

    /// Emits the current block, if there is one
    pub fn flush(&mut self) {
        if let Some(record) = self.block.flush() {
            trace!("{}: block {}-{} with {} loci", self.contig, record.start, record.end, record.count);
            self.metrics.blocks += 1;
            self.metrics.block_loci += record.count;
            self.records.push(GvcfRecord::Block(record));
        }
    }

    /// Flushes the final block and hands back the record stream
    pub fn finish(mut self) -> ContigRecords {
        self.flush();
        ContigRecords {
            contig: self.contig,
            records: self.records,
            metrics: self.metrics
        }
    }

    fn admit(&mut self, candidate: &BlockCandidate) {
        if !self.block.can_admit(candidate) {
            self.flush();
        }
        self.block.admit(candidate);
    }

    fn push_single(&mut self, record: GvcfRecord) {
        self.metrics.single_records += 1;
        self.records.push(record);
    }

    fn check_site_order(&mut self, position: u64) {
        if let Some(last) = self.last_site_position {
            assert!(position > last, "{}: sites out of order, {position} after {last}", self.contig);
        }
        self.check_locus_order(position);
        self.last_site_position = Some(position);
    }

    fn check_locus_order(&mut self, position: u64) {
        if let Some(last) = self.last_locus_position {
            assert!(position >= last, "{}: loci out of order, {position} after {last}", self.contig);
        }
        self.last_locus_position = Some(position);
    }
}
