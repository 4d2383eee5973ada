
use serde::{Deserialize, Serialize};

use crate::compactor::GvcfRecord;
use crate::data_types::compaction_metrics::CompactionMetrics;
use crate::data_types::locus::Locus;

/// All loci for one contig, in position order
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ContigLoci {
    /// Contig name
    pub contig: String,
    /// Loci sorted by position
    #[serde(default)]
    pub loci: Vec<Locus>
}

/// Output stream for one contig
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContigRecords {
    /// Contig name
    pub contig: String,
    /// Classified and compacted records, in position order
    pub records: Vec<GvcfRecord>,
    /// Counts for the summary file
    #[serde(skip)]
    pub metrics: CompactionMetrics
}
