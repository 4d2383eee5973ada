/*!
# Writers module
Contains the logic for writing the summary file for the gvcf command.
*/
/// Generates the compaction summary file
pub mod summary;
