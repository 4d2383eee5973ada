
use serde::{Deserialize, Serialize};

use crate::data_types::features::EvsFeatures;
use crate::data_types::filters::FilterSet;

/// Ploidy assumed at a locus
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ploidy {
    /// Standard calling with a fixed number of chromosome copies
    Fixed(u8),
    /// Continuous (frequency-based) calling, where ploidy does not apply
    NotApplicable
}

impl Default for Ploidy {
    fn default() -> Self {
        Ploidy::Fixed(2)
    }
}

/// Per-sample evidence and classification state at a locus
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SampleInfo {
    /// Genotype quality; `None` when no usable value exists, which is distinct from 0
    #[serde(default)]
    pub gqx: Option<i32>,
    /// Genotype label, e.g. "0/0", "0/1", "1/1"
    pub gt: String,
    /// Read depth for this sample; when absent, the basecall total stands in for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Basecalls that contributed to the call (DPU)
    #[serde(default)]
    pub n_used_calls: u32,
    /// Basecalls that were filtered out of the call (DPF)
    #[serde(default)]
    pub n_unused_calls: u32,
    /// Filters applied to this sample; empty means PASS
    #[serde(default)]
    pub filters: FilterSet,
    /// Set when a scoring model was applied to this sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empirical_variant_score: Option<i32>,
    /// True if this sample carries a non-reference call at the locus
    #[serde(default)]
    pub is_variant: bool
}

impl SampleInfo {
    /// Convenience constructor for the raw statistics; classification fields start empty
    pub fn new(gqx: Option<i32>, gt: &str, n_used_calls: u32, n_unused_calls: u32, is_variant: bool) -> Self {
        Self {
            gqx,
            gt: gt.to_string(),
            depth: None,
            n_used_calls,
            n_unused_calls,
            filters: FilterSet::default(),
            empirical_variant_score: None,
            is_variant
        }
    }

    /// Used plus filtered basecalls, widened so large counts cannot overflow
    pub fn total_calls(&self) -> u64 {
        self.n_used_calls as u64 + self.n_unused_calls as u64
    }

    /// Reported read depth, or the basecall total when no depth was reported
    pub fn read_depth(&self) -> u64 {
        self.depth.map(u64::from).unwrap_or_else(|| self.total_calls())
    }

    /// Fraction of basecalls that were filtered; 0.0 when there are no calls at all
    pub fn unused_call_fraction(&self) -> f64 {
        let total_calls = self.total_calls();
        if total_calls > 0 {
            self.n_unused_calls as f64 / total_calls as f64
        } else {
            0.0
        }
    }

    pub fn is_covered(&self) -> bool {
        self.n_used_calls != 0 || self.n_unused_calls != 0
    }

    pub fn is_used_covered(&self) -> bool {
        self.n_used_calls != 0
    }
}

/// A single-base site locus from standard (ploidy-aware) calling
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SiteLocus {
    /// Coordinate on the contig
    pub position: u64,
    /// Reference base
    pub ref_base: char,
    /// Alternate bases reported at this site; empty for a non-variant site
    #[serde(default)]
    pub alt_alleles: Vec<char>,
    #[serde(default)]
    pub ploidy: Ploidy,
    /// Length of the homopolymer run overlapping this site
    #[serde(default)]
    pub hpol: u32,
    /// One entry per sample in the cohort
    pub samples: Vec<SampleInfo>,
    /// Populated lazily by the classifier when features are required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evs_features: Option<EvsFeatures>
}

impl SiteLocus {
    /// Creates a site with no scoring features attached
    pub fn new(position: u64, ref_base: char, alt_alleles: Vec<char>, ploidy: Ploidy, hpol: u32, samples: Vec<SampleInfo>) -> Self {
        Self {
            position, ref_base, alt_alleles, ploidy, hpol, samples,
            evs_features: None
        }
    }

    /// True if at least one alternate allele is reported here
    pub fn is_variant_locus(&self) -> bool {
        !self.alt_alleles.is_empty()
    }

    /// Variant sites are never folded into a block
    pub fn is_nonref(&self) -> bool {
        self.is_variant_locus()
    }

    /// Read depth summed over every sample
    pub fn total_read_depth(&self) -> u64 {
        self.samples.iter().map(|s| s.read_depth()).sum()
    }
}

/// One indel allele with the sequence context used by the filters
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct IndelAllele {
    /// Number of reference bases removed
    #[serde(default)]
    pub deleted_length: u32,
    /// Inserted sequence, possibly empty
    #[serde(default)]
    pub inserted_seq: String,
    /// Smallest repeating unit of the indel sequence, if any
    #[serde(default)]
    pub repeat_unit: Option<String>,
    /// Copies of `repeat_unit` in the reference
    #[serde(default)]
    pub ref_repeat_count: u32,
    /// Copies of `repeat_unit` on the indel haplotype
    #[serde(default)]
    pub indel_repeat_count: u32,
    /// Length of the interrupted homopolymer around the indel
    #[serde(default)]
    pub interrupted_hpol: u32,
    /// Breakpoint-only allele (one side of a larger event)
    #[serde(default)]
    pub is_breakpoint: bool
}

impl IndelAllele {
    /// Length of the repeat unit, 0 when there is none
    pub fn repeat_unit_length(&self) -> usize {
        self.repeat_unit.as_ref().map(|ru| ru.len()).unwrap_or(0)
    }
}

/// An indel locus, possibly with several overlapping alleles
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct IndelLocus {
    /// Coordinate on the contig
    pub position: u64,
    /// Indel alleles; empty for a non-variant locus
    #[serde(default)]
    pub alleles: Vec<IndelAllele>,
    #[serde(default)]
    pub ploidy: Ploidy,
    /// One entry per sample in the cohort
    pub samples: Vec<SampleInfo>,
    /// Populated lazily by the classifier when features are required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evs_features: Option<EvsFeatures>
}

impl IndelLocus {
    /// Creates an indel locus with no scoring features attached
    pub fn new(position: u64, alleles: Vec<IndelAllele>, ploidy: Ploidy, samples: Vec<SampleInfo>) -> Self {
        Self {
            position, alleles, ploidy, samples,
            evs_features: None
        }
    }

    pub fn is_variant_locus(&self) -> bool {
        !self.alleles.is_empty()
    }

    pub fn is_any_breakpoint_allele(&self) -> bool {
        self.alleles.iter().any(|a| a.is_breakpoint)
    }

    /// Read depth summed over every sample
    pub fn total_read_depth(&self) -> u64 {
        self.samples.iter().map(|s| s.read_depth()).sum()
    }
}

/// A call from continuous (ploidy-agnostic) calling
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ContinuousCall {
    pub gqx: i32,
    pub gt: String,
    #[serde(default)]
    pub filters: FilterSet
}

/// A site from continuous calling; carries zero or more calls instead of a ploidy
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ContinuousSiteLocus {
    pub position: u64,
    pub ref_base: char,
    #[serde(default)]
    pub n_used_calls: u32,
    #[serde(default)]
    pub n_unused_calls: u32,
    /// True if any call reports a non-reference allele
    #[serde(default)]
    pub is_nonref: bool,
    #[serde(default)]
    pub calls: Vec<ContinuousCall>
}

/// Tagged union over every locus shape that flows through the pipeline
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locus {
    Site(SiteLocus),
    Indel(IndelLocus),
    Continuous(ContinuousSiteLocus)
}

impl Locus {
    pub fn position(&self) -> u64 {
        match self {
            Locus::Site(s) => s.position,
            Locus::Indel(i) => i.position,
            Locus::Continuous(c) => c.position
        }
    }
}
