
/// Counters describing the output of compaction
pub mod compaction_metrics;
/// Input and output containers for a single contig
pub mod contig;
/// Feature vectors attached to scored loci
pub mod features;
/// Germline filters and filter sets
pub mod filters;
/// Locus shapes and per-sample evidence
pub mod locus;
/// Running min/max/mean without storing values
pub mod stream_stat;
