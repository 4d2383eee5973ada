/*!
# CLI module
Command line interface functionality that is specific to heron.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The gvcf CLI subcommand
pub mod gvcf;
