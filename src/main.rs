
use indicatif::ParallelProgressIterator;
use log::{LevelFilter, debug, error, info, warn};
use rayon::prelude::*;
use std::time::Instant;

use heron::classifier::LocusClassifier;
use heron::cli::core::{Commands, get_cli};
use heron::cli::gvcf::{GvcfSettings, check_gvcf_settings};
use heron::contig_processor::process_contig;
use heron::data_types::contig::{ContigLoci, ContigRecords};
use heron::util::json_io::{load_json, save_json};
use heron::util::progress_bar::contig_progress_bar;
use heron::writers::summary::SummaryWriter;

fn run_gvcf(settings: GvcfSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_gvcf_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    match std::fs::create_dir_all(&settings.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // create a debug folder if specified
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json, true) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // build our configurations, the classifier also validates its own
    let classifier = match settings.classifier_config()
        .and_then(|config| LocusClassifier::with_hard_filters(config).map_err(anyhow::Error::from)) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building locus classifier: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let tolerance = match settings.block_tolerance() {
        Ok(t) => t,
        Err(e) => {
            error!("Error while building block tolerance: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // load all the loci
    info!("Loading loci from {:?}...", settings.input_fn);
    let mut all_contigs: Vec<ContigLoci> = match load_json(&settings.input_fn) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while loading input loci: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    if !settings.contig_filter.is_empty() {
        warn!("Contig filter detected, output will be restricted to {} contig(s).", settings.contig_filter.len());
        all_contigs.retain(|c| settings.contig_filter.contains(&c.contig));
    }
    let num_contigs = all_contigs.len() as u64;
    let num_loci: usize = all_contigs.iter().map(|c| c.loci.len()).sum();
    info!("Loaded {num_loci} loci across {num_contigs} contigs.");

    // each contig gets its own compactor
    info!("Processing contigs...");
    // debug logging interleaves with the bar, so hide it there
    let progress_bar = contig_progress_bar(num_contigs, settings.verbosity > 0);
    let all_results: Vec<anyhow::Result<ContigRecords>> = all_contigs.into_par_iter()
        .map(|contig| {
            debug!("Starting contig {}", contig.contig);
            process_contig(contig, &classifier, tolerance)
        })
        .progress_with(progress_bar)
        .collect();

    // collect stats; the parallel collect keeps input order
    let mut summary_writer = SummaryWriter::new(settings.sample_label.clone(), tolerance.label());
    let mut all_records: Vec<ContigRecords> = Vec::with_capacity(all_results.len());
    for result in all_results.into_iter() {
        match result {
            Ok(records) => {
                summary_writer.add_contig_metrics(&records.contig, &records.metrics);
                all_records.push(records);
            },
            Err(e) => {
                error!("Error while processing contig: {e:#}");
                std::process::exit(exitcode::DATAERR);
            }
        }
    }

    let total = summary_writer.total_metrics();
    info!("Contig processing complete:");
    info!("\tInput loci: {}", total.loci);
    info!("\tBlocks: {} ({} loci)", total.blocks, total.block_loci);
    info!("\tSingle records: {}", total.single_records);
    info!("\tFiltered samples: {}", total.filtered_samples);
    info!("\tCompression ratio: {:?}", total.compression_ratio());

    // now write things
    let records_fn = settings.records_filename();
    info!("Saving records to {records_fn:?}...");
    if let Err(e) = save_json(&all_records, &records_fn, settings.pretty_json) {
        error!("Error while saving records: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    let summary_fn = settings.summary_filename();
    info!("Saving output summary to {summary_fn:?}...");
    if let Err(e) = summary_writer.write_summary(&summary_fn) {
        error!("Error while saving summary file: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("gVCF compaction completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Gvcf(settings) => {
            run_gvcf(*settings);
        }
    }

    info!("Process finished successfully.");
}
