/*!
# Features
Feature extraction for empirical variant scoring.
The extractor only reads statistics that were already summarized upstream; it never touches reads.
*/

use crate::data_types::features::{EvsFeatures, FeatureVector};
use crate::data_types::locus::{IndelLocus, SampleInfo, SiteLocus};

/// Flags that change which features get computed and how they are scaled
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeatureMode {
    /// RNA calling does not assume uniform depth, so depth features are left raw
    pub is_rna: bool,
    /// If true, depth features are normalized by `norm_depth`
    pub is_uniform_depth_expected: bool,
    /// If true, development-only features are computed as well
    pub include_development: bool,
    /// Expected depth for the normalization above
    pub norm_depth: f64
}

impl FeatureMode {
    /// Scales a depth value according to the mode
    fn depth_feature(&self, depth: f64) -> f64 {
        if self.is_uniform_depth_expected && !self.is_rna && self.norm_depth > 0.0 {
            depth / self.norm_depth
        } else {
            depth
        }
    }
}

/// Computes feature vectors for one sample of a locus
pub trait FeatureExtractor: Send + Sync {
    /// # Arguments
    /// * `locus` - the site locus
    /// * `sample_index` - the sample to compute features for
    /// * `mode` - calling mode flags
    fn site_features(&self, locus: &SiteLocus, sample_index: usize, mode: FeatureMode) -> EvsFeatures;

    /// # Arguments
    /// * `locus` - the indel locus
    /// * `sample_index` - the sample to compute features for
    /// * `mode` - calling mode flags
    fn indel_features(&self, locus: &IndelLocus, sample_index: usize, mode: FeatureMode) -> EvsFeatures;
}

/// Encodes a genotype label as 0 (hom-ref or unknown), 1 (het), or 2 (hom-alt)
pub fn genotype_code(gt: &str) -> f64 {
    let alleles: Vec<&str> = gt.split(['/', '|']).collect();
    let alt_count = alleles.iter().filter(|a| **a != "0" && **a != ".").count();
    if alt_count == 0 {
        0.0
    } else if alt_count == alleles.len() && alleles.windows(2).all(|w| w[0] == w[1]) {
        2.0
    } else {
        1.0
    }
}

/// Feature extractor built from the summarized per-sample statistics
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicFeatureExtractor;

impl BasicFeatureExtractor {
    /// Features common to sites and indels
    fn sample_features(&self, features: &mut FeatureVector, sample: &SampleInfo, mode: FeatureMode) {
        features.set("GENO", genotype_code(&sample.gt));
        features.set("GQX", sample.gqx.unwrap_or(0) as f64);
        features.set("F_DP", mode.depth_feature(sample.read_depth() as f64));
        features.set("F_DPF", mode.depth_feature(sample.n_unused_calls as f64));
        features.set("F_DPF_FRAC", sample.unused_call_fraction());
    }

    fn development_features(&self, sample: &SampleInfo, locus_depth: u64) -> FeatureVector {
        let mut development = FeatureVector::default();
        development.set("RAW_DP", sample.read_depth() as f64);
        development.set("RAW_DPU", sample.n_used_calls as f64);
        development.set("RAW_DPF", sample.n_unused_calls as f64);
        development.set("LOCUS_DP", locus_depth as f64);
        development
    }
}

impl FeatureExtractor for BasicFeatureExtractor {
    fn site_features(&self, locus: &SiteLocus, sample_index: usize, mode: FeatureMode) -> EvsFeatures {
        let sample = &locus.samples[sample_index];
        let mut core = FeatureVector::default();
        self.sample_features(&mut core, sample, mode);
        core.set("I_SNVHPOL", locus.hpol as f64);
        core.set("ALT_COUNT", locus.alt_alleles.len() as f64);

        let development = if mode.include_development {
            self.development_features(sample, locus.total_read_depth())
        } else {
            FeatureVector::default()
        };
        EvsFeatures { core, development }
    }

    fn indel_features(&self, locus: &IndelLocus, sample_index: usize, mode: FeatureMode) -> EvsFeatures {
        let sample = &locus.samples[sample_index];
        let mut core = FeatureVector::default();
        self.sample_features(&mut core, sample, mode);

        // the first allele describes the primary event
        let (ru_len, ref_rep, idl_rep, ihp) = locus.alleles.first()
            .map(|a| (a.repeat_unit_length(), a.ref_repeat_count, a.indel_repeat_count, a.interrupted_hpol))
            .unwrap_or_default();
        core.set("I_RepeatUnitLength", ru_len as f64);
        core.set("I_RefRepeatCount", ref_rep as f64);
        core.set("I_IndelRepeatCount", idl_rep as f64);
        core.set("IHP", ihp as f64);
        core.set("ALT_COUNT", locus.alleles.len() as f64);

        let development = if mode.include_development {
            let mut development = self.development_features(sample, locus.total_read_depth());
            let max_ref_rep = locus.alleles.iter().map(|a| a.ref_repeat_count).max().unwrap_or(0);
            development.set("MAX_RefRepeatCount", max_ref_rep as f64);
            development
        } else {
            FeatureVector::default()
        };
        EvsFeatures { core, development }
    }
}
