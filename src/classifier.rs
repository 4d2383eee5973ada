/*!
# Locus Classifier
Decides the filter set for every sample of a locus.
When a scoring model is configured for the variant kind and the locus is usable by the model, variant samples are filtered on their empirical variant score (EVS).
Everything else falls back to the deterministic hard filters.

## Example usage
```rust
use heron::classifier::{ClassifierConfigBuilder, LocusClassifier};
use heron::data_types::filters::GermlineFilter;
use heron::data_types::locus::{Ploidy, SampleInfo, SiteLocus};

let config = ClassifierConfigBuilder::default()
    .min_gqx(Some(15))
    .max_depth(Some(100))
    .build().unwrap();
let classifier = LocusClassifier::with_hard_filters(config).unwrap();

let mut locus = SiteLocus::new(
    1000, 'A', vec!['G'], Ploidy::Fixed(2), 1,
    vec![SampleInfo::new(Some(8), "0/1", 20, 1, true)]
);
classifier.classify_site(&mut locus);
assert!(locus.samples[0].filters.contains(GermlineFilter::LowGqx));
assert!(!locus.samples[0].filters.contains(GermlineFilter::HighDepth));
```
*/

use derive_builder::Builder;
use log::trace;
use std::sync::Arc;

use crate::data_types::features::EvsFeatures;
use crate::data_types::filters::GermlineFilter;
use crate::data_types::locus::{IndelLocus, SampleInfo, SiteLocus};
use crate::features::{BasicFeatureExtractor, FeatureExtractor, FeatureMode};
use crate::scoring::{score_to_evs, ScoringContext, VariantKind, VariantScorer};

/// Indel repeat units longer than this are never checked for reference repeats
const MAX_FILTERED_REPEAT_UNIT_LENGTH: usize = 2;

/// Thresholds and flags for a classification run; every `None` threshold disables that filter
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct ClassifierConfig {
    /// if true, EVS features are computed for every usable locus even without a model
    report_features: bool,
    /// if true, the run is RNA calling instead of germline DNA
    is_rna: bool,
    /// if true, a model must be configured for both SNVs and indels
    evs_required: bool,
    /// number of samples in the cohort
    cohort_size: usize,
    /// LowGQX: minimum genotype quality
    min_gqx: Option<i32>,
    /// HighDepth: maximum total locus depth across all samples
    max_depth: Option<u32>,
    /// Expected depth used to normalize depth features
    norm_depth: Option<f64>,
    /// HighBaseFilt: maximum fraction of filtered basecalls
    max_base_filt: Option<f64>,
    /// HighSNVSB: maximum SNV strand bias; reserved, currently never filters
    max_snv_sb: Option<f64>,
    /// HighSNVHPOL: maximum homopolymer length around a variant site
    max_snv_hpol: Option<u32>,
    /// HighRefRep: maximum reference repeat count for short repeat units
    max_ref_rep: Option<u32>,
    /// SNV samples with an EVS below this get LowGQX
    snv_evs_threshold: f64,
    /// Indel samples with an EVS below this get LowGQX
    indel_evs_threshold: f64
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            report_features: false,
            is_rna: false,
            evs_required: false,
            cohort_size: 1,
            min_gqx: None,
            max_depth: None,
            norm_depth: None,
            max_base_filt: None,
            max_snv_sb: None,
            max_snv_hpol: None,
            max_ref_rep: None,
            snv_evs_threshold: 0.0,
            indel_evs_threshold: 0.0
        }
    }
}

impl ClassifierConfig {
    // mostly getters
    pub fn report_features(&self) -> bool {
        self.report_features
    }

    pub fn is_rna(&self) -> bool {
        self.is_rna
    }

    pub fn cohort_size(&self) -> usize {
        self.cohort_size
    }

    pub fn min_gqx(&self) -> Option<i32> {
        self.min_gqx
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    pub fn max_base_filt(&self) -> Option<f64> {
        self.max_base_filt
    }

    pub fn max_snv_hpol(&self) -> Option<u32> {
        self.max_snv_hpol
    }

    pub fn max_ref_rep(&self) -> Option<u32> {
        self.max_ref_rep
    }
}

/// Configuration problems that must stop the run before any locus is classified
#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    #[error("EVS feature reporting requires a single-sample cohort, found {cohort_size} samples")]
    MultiSampleFeatureReport { cohort_size: usize },
    #[error("EVS scoring is required but no {kind} model was provided")]
    MissingModel { kind: VariantKind },
    #[error("{kind} model was trained for {found} calling, but this run is {expected} calling")]
    ContextMismatch { kind: VariantKind, expected: ScoringContext, found: ScoringContext },
    #[error("max_base_filt must be in [0, 1], found {0}")]
    BaseFiltRange(f64),
    #[error("cohort_size must be > 0")]
    EmptyCohort
}

/// Shared read-only model handles, one optional model per variant kind
#[derive(Clone, Default)]
pub struct ScoringModels {
    snv: Option<Arc<dyn VariantScorer>>,
    indel: Option<Arc<dyn VariantScorer>>
}

impl ScoringModels {
    pub fn with_snv_model(mut self, model: Arc<dyn VariantScorer>) -> Self {
        self.snv = Some(model);
        self
    }

    pub fn with_indel_model(mut self, model: Arc<dyn VariantScorer>) -> Self {
        self.indel = Some(model);
        self
    }

    pub fn get(&self, kind: VariantKind) -> Option<&Arc<dyn VariantScorer>> {
        match kind {
            VariantKind::Snv => self.snv.as_ref(),
            VariantKind::Indel => self.indel.as_ref()
        }
    }
}

/// The parts of a locus the scoring path needs, shared by sites and indels
trait ScorableLocus {
    fn samples(&self) -> &[SampleInfo];
    fn samples_mut(&mut self) -> &mut [SampleInfo];
    fn evs_features_mut(&mut self) -> &mut Option<EvsFeatures>;
    /// Locus must carry a variant allele that the model can handle
    fn is_usable_in_model(&self) -> bool;
    fn total_read_depth(&self) -> u64;
}

impl ScorableLocus for SiteLocus {
    fn samples(&self) -> &[SampleInfo] {
        &self.samples
    }

    fn samples_mut(&mut self) -> &mut [SampleInfo] {
        &mut self.samples
    }

    fn evs_features_mut(&mut self) -> &mut Option<EvsFeatures> {
        &mut self.evs_features
    }

    fn is_usable_in_model(&self) -> bool {
        self.is_variant_locus()
    }

    fn total_read_depth(&self) -> u64 {
        SiteLocus::total_read_depth(self)
    }
}

impl ScorableLocus for IndelLocus {
    fn samples(&self) -> &[SampleInfo] {
        &self.samples
    }

    fn samples_mut(&mut self) -> &mut [SampleInfo] {
        &mut self.samples
    }

    fn evs_features_mut(&mut self) -> &mut Option<EvsFeatures> {
        &mut self.evs_features
    }

    fn is_usable_in_model(&self) -> bool {
        // breakpoint alleles are always left to the hard filters
        self.is_variant_locus() && !self.is_any_breakpoint_allele()
    }

    fn total_read_depth(&self) -> u64 {
        IndelLocus::total_read_depth(self)
    }
}

/// Classifies site and indel loci; cheap to share across threads
#[derive(Clone)]
pub struct LocusClassifier {
    config: ClassifierConfig,
    models: ScoringModels,
    extractor: Arc<dyn FeatureExtractor>
}

impl LocusClassifier {
    /// Creates a classifier after validating the configuration against the provided models
    /// # Arguments
    /// * `config` - thresholds and flags for the run
    /// * `models` - the scoring models per variant kind, possibly none
    /// * `extractor` - computes the feature vectors the models consume
    /// # Errors
    /// * if feature reporting is enabled for a multi-sample cohort
    /// * if EVS is required and a model is missing
    /// * if a model was trained for a different calling context
    /// * if a threshold is out of range
    pub fn new(config: ClassifierConfig, models: ScoringModels, extractor: Arc<dyn FeatureExtractor>) -> Result<Self, ClassifierError> {
        if config.cohort_size == 0 {
            return Err(ClassifierError::EmptyCohort);
        }
        if config.report_features && config.cohort_size != 1 {
            return Err(ClassifierError::MultiSampleFeatureReport { cohort_size: config.cohort_size });
        }
        if let Some(max_base_filt) = config.max_base_filt {
            if !(0.0..=1.0).contains(&max_base_filt) {
                return Err(ClassifierError::BaseFiltRange(max_base_filt));
            }
        }

        let expected = ScoringContext::from_is_rna(config.is_rna);
        for kind in [VariantKind::Snv, VariantKind::Indel] {
            match models.get(kind) {
                Some(model) => {
                    let found = model.context();
                    if found != expected {
                        return Err(ClassifierError::ContextMismatch { kind, expected, found });
                    }
                },
                None => {
                    if config.evs_required {
                        return Err(ClassifierError::MissingModel { kind });
                    }
                }
            }
        }

        Ok(Self {
            config, models, extractor
        })
    }

    /// Creates a classifier without any models, so every locus takes the hard-filter path
    pub fn with_hard_filters(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        Self::new(config, ScoringModels::default(), Arc::new(BasicFeatureExtractor))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn is_evs_site_model(&self) -> bool {
        self.models.snv.is_some()
    }

    pub fn is_evs_indel_model(&self) -> bool {
        self.models.indel.is_some()
    }

    /// Sets the filters (and EVS if scored) on every sample of a site locus
    /// # Panics
    /// * if the locus has no samples
    /// * if feature reporting is enabled and the locus has more than one sample
    pub fn classify_site(&self, locus: &mut SiteLocus) {
        self.classify_locus(
            locus,
            VariantKind::Snv,
            self.config.snv_evs_threshold,
            |extractor, l, i, mode| extractor.site_features(l, i, mode),
            Self::default_classify_site
        );
    }

    /// Sets the filters (and EVS if scored) on every sample of an indel locus
    /// # Panics
    /// * if the locus has no samples
    /// * if feature reporting is enabled and the locus has more than one sample
    pub fn classify_indel(&self, locus: &mut IndelLocus) {
        self.classify_locus(
            locus,
            VariantKind::Indel,
            self.config.indel_evs_threshold,
            |extractor, l, i, mode| extractor.indel_features(l, i, mode),
            Self::default_classify_indel
        );
    }

    /// Shared scoring/hard-filter decision for both locus kinds
    fn classify_locus<L: ScorableLocus>(
        &self,
        locus: &mut L,
        kind: VariantKind,
        evs_threshold: f64,
        compute_features: impl Fn(&dyn FeatureExtractor, &L, usize, FeatureMode) -> EvsFeatures,
        hard_filter: fn(&Self, &mut L, usize, u64)
    ) {
        let sample_count = locus.samples().len();
        assert!(sample_count > 0, "cannot classify a locus without samples");

        let is_usable = locus.is_usable_in_model();
        if is_usable && self.config.report_features {
            assert_eq!(sample_count, 1, "EVS feature reporting only supports a single sample");
            // reported for any usable variant, regardless of whether a model gets applied
            let features = compute_features(self.extractor.as_ref(), &*locus, 0, self.feature_mode(true));
            *locus.evs_features_mut() = Some(features);
        }

        let model = match self.models.get(kind) {
            Some(model) if is_usable => model,
            _ => {
                self.default_classify_locus(locus, hard_filter);
                return;
            }
        };

        let all_sample_depth = locus.total_read_depth();
        for sample_index in 0..sample_count {
            if !locus.samples()[sample_index].is_variant {
                // the model never overrides a non-variant sample
                hard_filter(self, locus, sample_index, all_sample_depth);
                continue;
            }

            let features = match locus.evs_features_mut().take() {
                Some(reported) if self.config.report_features => reported,
                _ => compute_features(self.extractor.as_ref(), &*locus, sample_index, self.feature_mode(false))
            };
            let score = model.score_variant(&features.core);
            let evs = score_to_evs(score);
            *locus.evs_features_mut() = Some(features);

            trace!("{kind} sample {sample_index}: score={score}, evs={evs}");
            let sample = &mut locus.samples_mut()[sample_index];
            sample.empirical_variant_score = Some(evs);
            if (evs as f64) < evs_threshold {
                sample.filters.set(GermlineFilter::LowGqx);
            }
        }
    }

    fn default_classify_locus<L: ScorableLocus>(&self, locus: &mut L, hard_filter: fn(&Self, &mut L, usize, u64)) {
        let all_sample_depth = locus.total_read_depth();
        for sample_index in 0..locus.samples().len() {
            hard_filter(self, locus, sample_index, all_sample_depth);
        }
    }

    fn feature_mode(&self, include_development: bool) -> FeatureMode {
        FeatureMode {
            is_rna: self.config.is_rna,
            is_uniform_depth_expected: self.config.max_depth.is_some(),
            include_development,
            norm_depth: self.config.norm_depth.unwrap_or(0.0)
        }
    }

    /// Filters shared by sites and indels: LowGQX and HighDepth
    fn apply_shared_filters(&self, sample: &mut SampleInfo, all_sample_depth: u64) {
        if let Some(min_gqx) = self.config.min_gqx {
            // an absent GQX never satisfies a minimum
            match sample.gqx {
                Some(gqx) if gqx >= min_gqx => {},
                _ => sample.filters.set(GermlineFilter::LowGqx)
            }
        }
        if let Some(max_depth) = self.config.max_depth {
            if all_sample_depth > u64::from(max_depth) {
                sample.filters.set(GermlineFilter::HighDepth);
            }
        }
    }

    /// Strand bias is not summarized per allele for multi-allelic sites, so this never sets HighSNVSB yet
    fn apply_strand_bias_filter(&self, _sample: &mut SampleInfo, _max_snv_sb: f64) {}

    /// Hard filters for one sample of a site locus
    /// # Arguments
    /// * `locus` - the locus to update
    /// * `sample_index` - the sample getting filtered
    /// * `all_sample_depth` - total locus depth summed across samples
    fn default_classify_site(&self, locus: &mut SiteLocus, sample_index: usize, all_sample_depth: u64) {
        let is_variant_locus = locus.is_variant_locus();
        let hpol = locus.hpol;
        let sample = &mut locus.samples[sample_index];
        self.apply_shared_filters(sample, all_sample_depth);

        if let Some(max_base_filt) = self.config.max_base_filt {
            if sample.unused_call_fraction() > max_base_filt {
                sample.filters.set(GermlineFilter::HighBaseFilt);
            }
        }

        if is_variant_locus {
            if let Some(max_snv_sb) = self.config.max_snv_sb {
                self.apply_strand_bias_filter(sample, max_snv_sb);
            }
            if let Some(max_snv_hpol) = self.config.max_snv_hpol {
                if hpol > max_snv_hpol {
                    sample.filters.set(GermlineFilter::HighSnvHpol);
                }
            }
        }
    }

    /// Hard filters for one sample of an indel locus.
    /// HighRefRep looks at every allele, so one allele in an overlapping set can filter the whole sample.
    /// # Arguments
    /// * `locus` - the locus to update
    /// * `sample_index` - the sample getting filtered
    /// * `all_sample_depth` - total locus depth summed across samples
    fn default_classify_indel(&self, locus: &mut IndelLocus, sample_index: usize, all_sample_depth: u64) {
        let is_high_ref_rep = self.config.max_ref_rep.is_some_and(|max_ref_rep| {
            locus.alleles.iter().any(|allele| {
                allele.repeat_unit.as_ref().is_some_and(|ru| {
                    ru.len() <= MAX_FILTERED_REPEAT_UNIT_LENGTH && allele.ref_repeat_count > max_ref_rep
                })
            })
        });

        let sample = &mut locus.samples[sample_index];
        self.apply_shared_filters(sample, all_sample_depth);
        if is_high_ref_rep {
            sample.filters.set(GermlineFilter::HighRefRep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::features::FeatureVector;
    use crate::data_types::filters::FilterSet;
    use crate::data_types::locus::{IndelAllele, Ploidy};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed score and counts how often it was asked
    struct FixedScorer {
        score: f64,
        context: ScoringContext,
        calls: AtomicUsize
    }

    impl FixedScorer {
        fn new(score: f64) -> Arc<Self> {
            Arc::new(Self { score, context: ScoringContext::Germline, calls: AtomicUsize::new(0) })
        }
    }

    impl VariantScorer for FixedScorer {
        fn context(&self) -> ScoringContext {
            self.context
        }

        fn score_variant(&self, _features: &FeatureVector) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.score
        }
    }

    fn hard_config() -> ClassifierConfig {
        ClassifierConfigBuilder::default()
            .min_gqx(Some(15))
            .max_depth(Some(100))
            .max_base_filt(Some(0.4))
            .max_snv_hpol(Some(6))
            .max_snv_sb(Some(10.0))
            .max_ref_rep(Some(8))
            .snv_evs_threshold(10.0)
            .indel_evs_threshold(12.0)
            .build().unwrap()
    }

    fn site(alt: Vec<char>, hpol: u32, samples: Vec<SampleInfo>) -> SiteLocus {
        SiteLocus::new(100, 'A', alt, Ploidy::Fixed(2), hpol, samples)
    }

    fn repeat_allele(unit: &str, ref_repeat_count: u32) -> IndelAllele {
        IndelAllele {
            deleted_length: unit.len() as u32,
            repeat_unit: Some(unit.to_string()),
            ref_repeat_count,
            indel_repeat_count: ref_repeat_count.saturating_sub(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_site_hard_filters() {
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();

        // passes everything
        let mut locus = site(vec!['C'], 3, vec![SampleInfo::new(Some(30), "0/1", 30, 2, true)]);
        classifier.classify_site(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
        assert_eq!(locus.samples[0].empirical_variant_score, None);
        assert!(locus.evs_features.is_none());

        // fails everything it can
        let mut locus = site(vec!['C'], 7, vec![SampleInfo::new(Some(10), "0/1", 60, 50, true)]);
        classifier.classify_site(&mut locus);
        assert_eq!(locus.samples[0].filters, FilterSet::from_filters([
            GermlineFilter::LowGqx, GermlineFilter::HighDepth, GermlineFilter::HighBaseFilt, GermlineFilter::HighSnvHpol
        ]));
        // strand bias hook is reserved
        assert!(!locus.samples[0].filters.contains(GermlineFilter::HighSnvStrandBias));
    }

    #[test]
    fn test_site_hpol_requires_variant_locus() {
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();
        let mut locus = site(vec![], 12, vec![SampleInfo::new(Some(30), "0/0", 30, 0, false)]);
        classifier.classify_site(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
    }

    #[test]
    fn test_missing_gqx() {
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();
        let mut locus = site(vec![], 1, vec![SampleInfo::new(None, "./.", 0, 0, false)]);
        classifier.classify_site(&mut locus);
        assert_eq!(locus.samples[0].filters, FilterSet::from_filters([GermlineFilter::LowGqx]));

        // without a minimum, nothing happens
        let classifier = LocusClassifier::with_hard_filters(ClassifierConfig::default()).unwrap();
        let mut locus = site(vec![], 1, vec![SampleInfo::new(None, "./.", 0, 0, false)]);
        classifier.classify_site(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
    }

    #[test]
    fn test_high_depth_uses_all_samples() {
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();
        let mut locus = site(vec!['T'], 1, vec![
            SampleInfo::new(Some(30), "0/1", 60, 0, true),
            SampleInfo::new(Some(30), "0/0", 60, 0, false)
        ]);
        classifier.classify_site(&mut locus);
        for sample in locus.samples.iter() {
            assert_eq!(sample.filters, FilterSet::from_filters([GermlineFilter::HighDepth]));
        }
    }

    #[test]
    fn test_high_depth_from_json_calls() {
        // input without a depth field falls back to the basecall counts
        let json = r#"{"position": 100, "ref_base": "A", "samples": [{"gqx": 40, "gt": "0/0", "n_used_calls": 500}]}"#;
        let mut locus: SiteLocus = serde_json::from_str(json).unwrap();
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();
        classifier.classify_site(&mut locus);
        assert_eq!(locus.samples[0].filters, FilterSet::from_filters([GermlineFilter::HighDepth]));

        // a reported depth wins over the counts
        let json = r#"{"position": 100, "ref_base": "A", "samples": [{"gqx": 40, "gt": "0/0", "depth": 90, "n_used_calls": 500}]}"#;
        let mut locus: SiteLocus = serde_json::from_str(json).unwrap();
        classifier.classify_site(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
    }

    #[test]
    fn test_lowgqx_monotonic() {
        // a stricter threshold sets the filter; relaxing it afterwards never removes it
        let sample = SampleInfo::new(Some(20), "0/0", 10, 0, false);
        let mut locus = site(vec![], 1, vec![sample]);
        let strict = LocusClassifier::with_hard_filters(ClassifierConfigBuilder::default().min_gqx(Some(30)).build().unwrap()).unwrap();
        strict.classify_site(&mut locus);
        assert!(locus.samples[0].filters.contains(GermlineFilter::LowGqx));

        let relaxed = LocusClassifier::with_hard_filters(ClassifierConfigBuilder::default().min_gqx(Some(5)).build().unwrap()).unwrap();
        relaxed.classify_site(&mut locus);
        assert!(locus.samples[0].filters.contains(GermlineFilter::LowGqx));
    }

    #[test]
    fn test_indel_hard_filters() {
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();

        // long repeat unit is never checked
        let mut locus = IndelLocus::new(10, vec![repeat_allele("ACG", 20)], Ploidy::Fixed(2), vec![SampleInfo::new(Some(40), "0/1", 20, 0, true)]);
        classifier.classify_indel(&mut locus);
        assert!(locus.samples[0].filters.is_pass());

        // one allele out of two trips the filter for the whole sample
        let mut locus = IndelLocus::new(
            10, vec![repeat_allele("A", 3), repeat_allele("AC", 9)], Ploidy::Fixed(2),
            vec![SampleInfo::new(Some(5), "1/2", 20, 0, true)]
        );
        classifier.classify_indel(&mut locus);
        assert_eq!(locus.samples[0].filters, FilterSet::from_filters([GermlineFilter::LowGqx, GermlineFilter::HighRefRep]));

        // at the threshold is fine
        let mut locus = IndelLocus::new(10, vec![repeat_allele("A", 8)], Ploidy::Fixed(2), vec![SampleInfo::new(Some(40), "0/1", 20, 0, true)]);
        classifier.classify_indel(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
    }

    #[test]
    fn test_indel_ignores_base_filt() {
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();
        let mut locus = IndelLocus::new(10, vec![repeat_allele("A", 2)], Ploidy::Fixed(2), vec![SampleInfo::new(Some(40), "0/1", 5, 50, true)]);
        classifier.classify_indel(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
    }

    #[test]
    fn test_site_model_scoring() {
        let scorer = FixedScorer::new(0.999);
        let models = ScoringModels::default().with_snv_model(scorer.clone());
        let classifier = LocusClassifier::new(hard_config(), models, Arc::new(BasicFeatureExtractor)).unwrap();
        assert!(classifier.is_evs_site_model());
        assert!(!classifier.is_evs_indel_model());

        // GQX would fail the hard filters, but the model score of 30 passes
        let mut locus = site(vec!['G'], 1, vec![SampleInfo::new(Some(3), "0/1", 20, 0, true)]);
        classifier.classify_site(&mut locus);
        assert_eq!(locus.samples[0].empirical_variant_score, Some(30));
        assert!(locus.samples[0].filters.is_pass());
        assert!(locus.evs_features.is_some());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);

        // low scores get LowGQX and nothing else
        let scorer = FixedScorer::new(0.5);
        let models = ScoringModels::default().with_snv_model(scorer);
        let classifier = LocusClassifier::new(hard_config(), models, Arc::new(BasicFeatureExtractor)).unwrap();
        let mut locus = site(vec!['G'], 20, vec![SampleInfo::new(Some(50), "0/1", 200, 0, true)]);
        classifier.classify_site(&mut locus);
        assert_eq!(locus.samples[0].empirical_variant_score, Some(3));
        assert_eq!(locus.samples[0].filters, FilterSet::from_filters([GermlineFilter::LowGqx]));
    }

    #[test]
    fn test_model_bypass_for_non_variant_sample() {
        let samples = vec![
            SampleInfo::new(Some(50), "0/1", 30, 0, true),
            SampleInfo::new(Some(8), "0/0", 30, 30, false)
        ];
        let hard = LocusClassifier::with_hard_filters(hard_config()).unwrap();
        let mut hard_locus = site(vec!['G'], 1, samples.clone());
        hard.classify_site(&mut hard_locus);

        let scorer = FixedScorer::new(0.99);
        let models = ScoringModels::default().with_snv_model(scorer.clone());
        let scored = LocusClassifier::new(hard_config(), models, Arc::new(BasicFeatureExtractor)).unwrap();
        let mut scored_locus = site(vec!['G'], 1, samples);
        scored.classify_site(&mut scored_locus);

        // the non-variant sample is identical either way
        assert_eq!(hard_locus.samples[1], scored_locus.samples[1]);
        assert_eq!(scored_locus.samples[1].empirical_variant_score, None);
        assert_eq!(scored_locus.samples[0].empirical_variant_score, Some(20));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_variant_locus_skips_model() {
        let scorer = FixedScorer::new(0.0);
        let models = ScoringModels::default().with_snv_model(scorer.clone());
        let classifier = LocusClassifier::new(hard_config(), models, Arc::new(BasicFeatureExtractor)).unwrap();
        let mut locus = site(vec![], 1, vec![SampleInfo::new(Some(30), "0/0", 30, 0, false)]);
        classifier.classify_site(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_indel_breakpoint_uses_hard_filters() {
        let scorer = FixedScorer::new(0.0);
        let models = ScoringModels::default().with_indel_model(scorer.clone());
        let classifier = LocusClassifier::new(hard_config(), models, Arc::new(BasicFeatureExtractor)).unwrap();

        let breakpoint = IndelAllele { is_breakpoint: true, ..Default::default() };
        let mut locus = IndelLocus::new(10, vec![breakpoint], Ploidy::Fixed(2), vec![SampleInfo::new(Some(40), "0/1", 20, 0, true)]);
        classifier.classify_indel(&mut locus);
        assert!(locus.samples[0].filters.is_pass());
        assert_eq!(locus.samples[0].empirical_variant_score, None);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);

        // a normal indel gets scored, and a score of 0 is below threshold
        let mut locus = IndelLocus::new(10, vec![repeat_allele("A", 2)], Ploidy::Fixed(2), vec![SampleInfo::new(Some(40), "0/1", 20, 0, true)]);
        classifier.classify_indel(&mut locus);
        assert_eq!(locus.samples[0].empirical_variant_score, Some(0));
        assert_eq!(locus.samples[0].filters, FilterSet::from_filters([GermlineFilter::LowGqx]));
    }

    #[test]
    fn test_report_features_without_model() {
        let config = ClassifierConfigBuilder::default()
            .report_features(true)
            .build().unwrap();
        let classifier = LocusClassifier::with_hard_filters(config).unwrap();

        let mut locus = site(vec!['T'], 2, vec![SampleInfo::new(Some(30), "0/1", 10, 0, true)]);
        classifier.classify_site(&mut locus);
        let features = locus.evs_features.as_ref().unwrap();
        assert_eq!(features.core.get("GQX"), Some(30.0));
        assert!(!features.development.is_empty());

        // non-variant loci are not usable, so nothing is reported
        let mut locus = site(vec![], 2, vec![SampleInfo::new(Some(30), "0/0", 10, 0, false)]);
        classifier.classify_site(&mut locus);
        assert!(locus.evs_features.is_none());
    }

    #[test]
    fn test_report_features_reused_by_model() {
        let config = ClassifierConfigBuilder::default()
            .report_features(true)
            .snv_evs_threshold(5.0)
            .build().unwrap();
        let models = ScoringModels::default().with_snv_model(FixedScorer::new(0.9));
        let classifier = LocusClassifier::new(config, models, Arc::new(BasicFeatureExtractor)).unwrap();
        let mut locus = site(vec!['T'], 2, vec![SampleInfo::new(Some(30), "0/1", 10, 0, true)]);
        classifier.classify_site(&mut locus);

        // development features only come from the reporting step, so they survive scoring
        let features = locus.evs_features.as_ref().unwrap();
        assert!(!features.development.is_empty());
        assert_eq!(locus.samples[0].empirical_variant_score, Some(10));
        assert!(locus.samples[0].filters.is_pass());
    }

    #[test]
    #[should_panic]
    fn test_report_features_multi_sample_panics() {
        let config = ClassifierConfigBuilder::default()
            .report_features(true)
            .build().unwrap();
        let classifier = LocusClassifier::with_hard_filters(config).unwrap();
        let mut locus = site(vec!['T'], 2, vec![
            SampleInfo::new(Some(30), "0/1", 10, 0, true),
            SampleInfo::new(Some(30), "0/1", 10, 0, true)
        ]);
        classifier.classify_site(&mut locus);
    }

    #[test]
    #[should_panic]
    fn test_empty_locus_panics() {
        let classifier = LocusClassifier::with_hard_filters(hard_config()).unwrap();
        let mut locus = site(vec![], 1, vec![]);
        classifier.classify_site(&mut locus);
    }

    #[test]
    fn test_config_errors() {
        let config = ClassifierConfigBuilder::default()
            .report_features(true)
            .cohort_size(2)
            .build().unwrap();
        assert!(matches!(
            LocusClassifier::with_hard_filters(config),
            Err(ClassifierError::MultiSampleFeatureReport { cohort_size: 2 })
        ));

        let config = ClassifierConfigBuilder::default()
            .evs_required(true)
            .build().unwrap();
        let models = ScoringModels::default().with_snv_model(FixedScorer::new(0.5));
        assert!(matches!(
            LocusClassifier::new(config, models, Arc::new(BasicFeatureExtractor)),
            Err(ClassifierError::MissingModel { kind: VariantKind::Indel })
        ));

        let config = ClassifierConfigBuilder::default()
            .is_rna(true)
            .build().unwrap();
        let models = ScoringModels::default().with_snv_model(FixedScorer::new(0.5));
        assert!(matches!(
            LocusClassifier::new(config, models, Arc::new(BasicFeatureExtractor)),
            Err(ClassifierError::ContextMismatch { kind: VariantKind::Snv, expected: ScoringContext::Rna, found: ScoringContext::Germline })
        ));

        let config = ClassifierConfigBuilder::default()
            .max_base_filt(Some(1.5))
            .build().unwrap();
        assert!(matches!(LocusClassifier::with_hard_filters(config), Err(ClassifierError::BaseFiltRange(_))));

        let config = ClassifierConfigBuilder::default()
            .cohort_size(0)
            .build().unwrap();
        assert!(matches!(LocusClassifier::with_hard_filters(config), Err(ClassifierError::EmptyCohort)));
    }
}
