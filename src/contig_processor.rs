
use anyhow::ensure;
use log::debug;

use crate::block::BlockTolerance;
use crate::classifier::LocusClassifier;
use crate::compactor::ContigCompactor;
use crate::data_types::contig::{ContigLoci, ContigRecords};
use crate::data_types::locus::{Locus, SampleInfo};

/// Checks the input contract of the compactor so bad input files fail with an error instead of a panic.
/// Site-like loci must be strictly increasing, an indel may share the position of the site before it.
/// Sites need exactly one sample for blocking, and indels need at least one (exactly one when features are reported).
fn validate_contig(contig: &ContigLoci, report_features: bool) -> anyhow::Result<()> {
    let mut last_site: Option<u64> = None;
    let mut last_locus: Option<u64> = None;
    for locus in contig.loci.iter() {
        let (position, is_site_like) = match locus {
            Locus::Site(site) => {
                ensure!(site.samples.len() == 1, "{}: site at {} has {} samples, gVCF compaction requires exactly one", contig.contig, site.position, site.samples.len());
                (site.position, true)
            },
            Locus::Continuous(c) => (c.position, true),
            Locus::Indel(indel) => {
                ensure!(!indel.samples.is_empty(), "{}: indel at {} has no samples", contig.contig, indel.position);
                ensure!(!report_features || indel.samples.len() == 1, "{}: indel at {} has {} samples, feature reporting requires exactly one", contig.contig, indel.position, indel.samples.len());
                (indel.position, false)
            }
        };
        if let Some(last) = last_locus {
            ensure!(position >= last, "{}: loci must be sorted by position, found {position} after {last}", contig.contig);
        }
        if is_site_like {
            if let Some(last) = last_site {
                ensure!(position > last, "{}: sites must be sorted by position, found {position} after {last}", contig.contig);
            }
            last_site = Some(position);
        }
        last_locus = Some(position);
    }
    Ok(())
}

fn is_filtered(samples: &[SampleInfo]) -> u64 {
    samples.iter().filter(|s| !s.filters.is_pass()).count() as u64
}

/// Classifies every site and indel on a contig, then compacts the result into gVCF records.
/// # Arguments
/// * `contig` - the loci for one contig, in position order
/// * `classifier` - shared classifier, read-only
/// * `tolerance` - block tolerance for this contig
/// # Errors
/// * if the loci are not sorted, or a locus has the wrong number of samples
pub fn process_contig(contig: ContigLoci, classifier: &LocusClassifier, tolerance: BlockTolerance) -> anyhow::Result<ContigRecords> {
    validate_contig(&contig, classifier.config().report_features())?;
    let ContigLoci { contig: contig_name, loci } = contig;
    debug!("{contig_name}: processing {} loci", loci.len());

    let mut compactor = ContigCompactor::new(&contig_name, tolerance);
    let mut filtered_samples = 0;
    for mut locus in loci.into_iter() {
        match &mut locus {
            Locus::Site(site) => {
                classifier.classify_site(site);
                filtered_samples += is_filtered(&site.samples);
            },
            Locus::Indel(indel) => {
                classifier.classify_indel(indel);
                filtered_samples += is_filtered(&indel.samples);
            },
            // continuous calls arrive with their filters already set
            Locus::Continuous(_) => {}
        };
        compactor.add_locus(locus);
    }

    let mut output = compactor.finish();
    output.metrics.filtered_samples = filtered_samples;
    debug!("{contig_name}: {} loci => {} blocks + {} single records, {} filtered samples",
        output.metrics.loci, output.metrics.blocks, output.metrics.single_records, output.metrics.filtered_samples);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfigBuilder;
    use crate::compactor::GvcfRecord;
    use crate::data_types::filters::GermlineFilter;
    use crate::data_types::locus::{IndelAllele, IndelLocus, Ploidy, SiteLocus};

    fn classifier() -> LocusClassifier {
        let config = ClassifierConfigBuilder::default()
            .min_gqx(Some(20))
            .build().unwrap();
        LocusClassifier::with_hard_filters(config).unwrap()
    }

    fn site(position: u64, gqx: Option<i32>) -> Locus {
        Locus::Site(SiteLocus::new(position, 'C', vec![], Ploidy::Fixed(2), 1, vec![SampleInfo::new(gqx, "0/0", 20, 0, false)]))
    }

    #[test]
    fn test_process_contig() {
        let indel = IndelLocus::new(
            4,
            vec![IndelAllele { inserted_seq: "T".to_string(), ..Default::default() }],
            Ploidy::Fixed(2),
            vec![SampleInfo::new(Some(45), "0/1", 20, 0, true)]
        );
        let contig = ContigLoci {
            contig: "chr3".to_string(),
            loci: vec![
                site(1, Some(30)), site(2, Some(32)), site(3, Some(10)),
                Locus::Indel(indel),
                site(4, Some(10)), site(5, None)
            ]
        };
        let output = process_contig(contig, &classifier(), BlockTolerance::default()).unwrap();

        // low quality sites are filtered, which splits them off into their own block
        let blocks: Vec<(u64, u64, bool)> = output.records.iter().filter_map(|r| match r {
            GvcfRecord::Block(b) => Some((b.start, b.count, b.filters.contains(GermlineFilter::LowGqx))),
            _ => None
        }).collect();
        assert_eq!(blocks, vec![(1, 2, false), (3, 1, true), (4, 1, true), (5, 1, true)]);
        assert_eq!(output.metrics.single_records, 1);
        assert_eq!(output.metrics.filtered_samples, 3);
    }

    #[test]
    fn test_unsorted_contig() {
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![site(2, Some(30)), site(1, Some(30))]
        };
        assert!(process_contig(contig, &classifier(), BlockTolerance::default()).is_err());
    }

    #[test]
    fn test_multi_sample_contig() {
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![Locus::Site(SiteLocus::new(1, 'A', vec![], Ploidy::Fixed(2), 1, vec![
                SampleInfo::new(Some(30), "0/0", 10, 0, false),
                SampleInfo::new(Some(30), "0/0", 10, 0, false)
            ]))]
        };
        assert!(process_contig(contig, &classifier(), BlockTolerance::default()).is_err());
    }

    fn indel(position: u64, samples: Vec<SampleInfo>) -> Locus {
        Locus::Indel(IndelLocus::new(
            position,
            vec![IndelAllele { deleted_length: 2, ..Default::default() }],
            Ploidy::Fixed(2),
            samples
        ))
    }

    #[test]
    fn test_indel_out_of_order() {
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![
                site(10, Some(30)), site(11, Some(30)),
                indel(3, vec![SampleInfo::new(Some(30), "0/1", 20, 0, true)]),
                site(12, Some(30))
            ]
        };
        assert!(process_contig(contig, &classifier(), BlockTolerance::default()).is_err());

        // a site may not move back behind an indel either
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![
                site(10, Some(30)),
                indel(20, vec![SampleInfo::new(Some(30), "0/1", 20, 0, true)]),
                site(15, Some(30))
            ]
        };
        assert!(process_contig(contig, &classifier(), BlockTolerance::default()).is_err());

        // sharing the position of the previous site is fine
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![
                site(10, Some(30)),
                indel(10, vec![SampleInfo::new(Some(30), "0/1", 20, 0, true)]),
                site(11, Some(30))
            ]
        };
        let output = process_contig(contig, &classifier(), BlockTolerance::default()).unwrap();
        let starts: Vec<u64> = output.records.iter().map(|r| r.start()).collect();
        assert_eq!(starts, vec![10, 10, 11]);
    }

    #[test]
    fn test_indel_samples() {
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![site(1, Some(30)), indel(2, vec![])]
        };
        assert!(process_contig(contig, &classifier(), BlockTolerance::default()).is_err());

        // several samples are fine for plain classification
        let samples = vec![
            SampleInfo::new(Some(30), "0/1", 20, 0, true),
            SampleInfo::new(Some(30), "0/0", 20, 0, false)
        ];
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![indel(2, samples.clone())]
        };
        let output = process_contig(contig, &classifier(), BlockTolerance::default()).unwrap();
        assert_eq!(output.metrics.single_records, 1);

        // but not when features are reported
        let config = ClassifierConfigBuilder::default()
            .report_features(true)
            .build().unwrap();
        let reporting = LocusClassifier::with_hard_filters(config).unwrap();
        let contig = ContigLoci {
            contig: "chr1".to_string(),
            loci: vec![indel(2, samples)]
        };
        assert!(process_contig(contig, &reporting, BlockTolerance::default()).is_err());
    }
}
