
use anyhow::ensure;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::block::{BlockTolerance, BlockToleranceBuilder};
use crate::classifier::{ClassifierConfig, ClassifierConfigBuilder};
use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};

/// Name of the record file inside the output folder
pub const RECORDS_FILENAME: &str = "records.json";
/// Name of the summary file inside the output folder
pub const SUMMARY_FILENAME: &str = "summary.tsv";

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct GvcfSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    heron_version: String,

    /// Input loci, grouped by contig (JSON, optionally gzipped)
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input-loci")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_fn: PathBuf,

    /// Output folder for the records and summary
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-folder")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Label for the summary rows
    #[clap(short = 's')]
    #[clap(long = "sample-label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "sample")]
    pub sample_label: String,

    /// Compresses the record output with gzip
    #[clap(long = "compress-output")]
    #[clap(help_heading = Some("Input/Output"))]
    pub compress_output: bool,

    /// Indents the record output
    #[clap(long = "pretty-json")]
    #[clap(help_heading = Some("Input/Output"))]
    pub pretty_json: bool,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Minimum genotype quality (LowGQX)
    #[clap(long = "min-gqx")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Hard filters"))]
    pub min_gqx: Option<i32>,

    /// Maximum total depth at a locus (HighDepth)
    #[clap(long = "max-depth")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Hard filters"))]
    pub max_depth: Option<u32>,

    /// Maximum fraction of filtered basecalls at a site (HighBaseFilt)
    #[clap(long = "max-base-filt")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Hard filters"))]
    pub max_base_filt: Option<f64>,

    /// Maximum SNV strand bias (HighSNVSB)
    #[clap(long = "max-snv-sb")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Hard filters"))]
    pub max_snv_sb: Option<f64>,

    /// Maximum homopolymer length around a variant site (HighSNVHPOL)
    #[clap(long = "max-snv-hpol")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Hard filters"))]
    pub max_snv_hpol: Option<u32>,

    /// Maximum reference repeat count for indels with a repeat unit of 2bp or less (HighRefRep)
    #[clap(long = "max-ref-rep")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Hard filters"))]
    pub max_ref_rep: Option<u32>,

    /// Expected depth, used to normalize depth features
    #[clap(long = "norm-depth")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Scoring features"))]
    pub norm_depth: Option<f64>,

    /// Attaches scoring features to every usable variant locus
    #[clap(long = "report-features")]
    #[clap(help_heading = Some("Scoring features"))]
    pub report_features: bool,

    /// Input comes from RNA calling
    #[clap(long = "rna")]
    #[clap(help_heading = Some("Scoring features"))]
    pub is_rna: bool,

    /// Fractional tolerance when merging values into a block
    #[clap(long = "block-frac-tol")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Block compaction"))]
    #[clap(default_value = "0.3")]
    pub block_frac_tol: f64,

    /// Absolute tolerance when merging values into a block
    #[clap(long = "block-abs-tol")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Block compaction"))]
    #[clap(default_value = "3")]
    pub block_abs_tol: i32,

    /// Number of threads to use for contig processing
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Only processes contigs whose name matches exactly (debug only)
    #[clap(hide = true)]
    #[clap(long = "contig")]
    pub contig_filter: Vec<String>
}

impl GvcfSettings {
    /// Path of the record file, with .gz appended when compressing
    pub fn records_filename(&self) -> PathBuf {
        if self.compress_output {
            self.output_folder.join(format!("{RECORDS_FILENAME}.gz"))
        } else {
            self.output_folder.join(RECORDS_FILENAME)
        }
    }

    pub fn summary_filename(&self) -> PathBuf {
        self.output_folder.join(SUMMARY_FILENAME)
    }

    /// Classifier configuration for a single-sample, hard-filter run
    pub fn classifier_config(&self) -> anyhow::Result<ClassifierConfig> {
        let config = ClassifierConfigBuilder::default()
            .report_features(self.report_features)
            .is_rna(self.is_rna)
            .cohort_size(1)
            .min_gqx(self.min_gqx)
            .max_depth(self.max_depth)
            .norm_depth(self.norm_depth)
            .max_base_filt(self.max_base_filt)
            .max_snv_sb(self.max_snv_sb)
            .max_snv_hpol(self.max_snv_hpol)
            .max_ref_rep(self.max_ref_rep)
            .build()?;
        Ok(config)
    }

    pub fn block_tolerance(&self) -> anyhow::Result<BlockTolerance> {
        let tolerance = BlockToleranceBuilder::default()
            .frac_tol(self.block_frac_tol)
            .abs_tol(self.block_abs_tol)
            .build()?;
        Ok(tolerance)
    }
}

fn optional_threshold<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "DISABLED".to_string())
}

pub fn check_gvcf_settings(mut settings: GvcfSettings) -> anyhow::Result<GvcfSettings> {
    // hard code the version in
    settings.heron_version = FULL_VERSION.clone();
    info!("Heron version: {:?}", &settings.heron_version);
    info!("Sub-command: gvcf");
    info!("Inputs:");

    check_required_filename(&settings.input_fn, "Input loci")?;
    info!("\tLoci: {:?}", &settings.input_fn);
    if !settings.contig_filter.is_empty() {
        info!("\tContig filter: {:?}", &settings.contig_filter);
    }

    // outputs
    info!("Outputs:");
    info!("\tRecords: {:?}", settings.records_filename());
    info!("\tSummary: {:?}", settings.summary_filename());
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Hard filters:");
    ensure!(settings.min_gqx.is_none_or(|v| v >= 0), "--min-gqx must be >=0");
    info!("\tLowGQX: {}", optional_threshold(settings.min_gqx));
    info!("\tHighDepth: {}", optional_threshold(settings.max_depth));
    ensure!(settings.max_base_filt.is_none_or(|v| (0.0..=1.0).contains(&v)), "--max-base-filt must be in the range [0, 1]");
    info!("\tHighBaseFilt: {}", optional_threshold(settings.max_base_filt));
    info!("\tHighSNVSB: {}", optional_threshold(settings.max_snv_sb));
    info!("\tHighSNVHPOL: {}", optional_threshold(settings.max_snv_hpol));
    info!("\tHighRefRep: {}", optional_threshold(settings.max_ref_rep));

    info!("Scoring features:");
    ensure!(settings.norm_depth.is_none_or(|v| v > 0.0), "--norm-depth must be >0");
    info!("\tNormalization depth: {}", optional_threshold(settings.norm_depth));
    info!("\tReport features: {}", if settings.report_features { "ENABLED" } else { "DISABLED" });
    info!("\tCalling mode: {}", if settings.is_rna { "RNA" } else { "germline" });

    info!("Block compaction:");
    ensure!(settings.block_frac_tol >= 0.0, "--block-frac-tol must be >=0");
    ensure!(settings.block_abs_tol >= 0, "--block-abs-tol must be >=0");
    info!("\tFractional tolerance: {}", settings.block_frac_tol);
    info!("\tAbsolute tolerance: {}", settings.block_abs_tol);
    info!("\tBlock label: {}", settings.block_tolerance()?.label());

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
