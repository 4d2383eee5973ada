
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::compaction_metrics::CompactionMetrics;

/// Label of the row that totals every contig
pub const ALL_CONTIGS: &str = "ALL";

/// This is a wrapper for writing out compaction stats to a file
#[derive(Default)]
pub struct SummaryWriter {
    /// Sample label to go on each row
    sample_label: String,
    /// Block label from the tolerance in use
    block_label: String,
    /// Metrics for each contig, in the order they were added
    contig_metrics: IndexMap<String, CompactionMetrics>
}

/// Contains all the data written to each row of our stats file
#[derive(Serialize)]
struct SummaryRow {
    /// User provided label
    sample_label: String,
    /// Contig name, or ALL
    contig: String,
    /// Describes the block tolerance
    block_label: String,
    /// Number of input loci
    loci: u64,
    /// Number of output records, blocks and single records combined
    records: u64,
    /// Number of blocks emitted
    blocks: u64,
    /// Number of loci inside those blocks
    block_loci: u64,
    /// Number of loci emitted as their own record
    single_records: u64,
    /// Number of samples that picked up a filter
    filtered_samples: u64,
    /// loci / records
    compression_ratio: Option<f64>
}

impl SummaryRow {
    pub fn new(sample_label: String, contig: String, block_label: String, metrics: &CompactionMetrics) -> Self {
        Self {
            sample_label, contig, block_label,
            loci: metrics.loci,
            records: metrics.records(),
            blocks: metrics.blocks,
            block_loci: metrics.block_loci,
            single_records: metrics.single_records,
            filtered_samples: metrics.filtered_samples,
            compression_ratio: metrics.compression_ratio()
        }
    }
}

impl SummaryWriter {
    pub fn new(sample_label: String, block_label: String) -> Self {
        Self {
            sample_label,
            block_label,
            ..Default::default()
        }
    }

    /// Adds the metrics for a contig; repeated contigs are summed
    pub fn add_contig_metrics(&mut self, contig: &str, metrics: &CompactionMetrics) {
        let entry = self.contig_metrics.entry(contig.to_string()).or_default();
        *entry += *metrics;
    }

    /// Sum over every contig added so far
    pub fn total_metrics(&self) -> CompactionMetrics {
        let mut total = CompactionMetrics::default();
        for metrics in self.contig_metrics.values() {
            total += *metrics;
        }
        total
    }

    pub fn write_summary(&self, filename: &Path) -> csv::Result<()> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;

        // the total always goes first
        let all_row = SummaryRow::new(
            self.sample_label.clone(), ALL_CONTIGS.to_string(), self.block_label.clone(), &self.total_metrics()
        );
        csv_writer.serialize(&all_row)?;

        for (contig, metrics) in self.contig_metrics.iter() {
            let contig_row = SummaryRow::new(
                self.sample_label.clone(), contig.clone(), self.block_label.clone(), metrics
            );
            csv_writer.serialize(&contig_row)?;
        }

        // save everything
        csv_writer.flush()?;
        Ok(())
    }
}
