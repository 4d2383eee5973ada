
/// Contains the block accumulator and its tolerance test
pub mod block;
/// Classifies loci with scoring models or hard filters
pub mod classifier;
/// Command line interface functionality
pub mod cli;
/// Drives block compaction over one contig
pub mod compactor;
/// Classifies and compacts a full contig
pub mod contig_processor;
/// Contains various shared data types
pub mod data_types;
/// Feature extraction for the scoring models
pub mod features;
/// Scoring model contracts and score conversion
pub mod scoring;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
