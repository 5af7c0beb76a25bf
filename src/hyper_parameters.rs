use tracing::warn;

use crate::similarity::SimilarityMeasure;

// Defaults for parameters
const TUPLE_SIZE_DEFAULT: usize = 3;
const NUMBER_OF_TUPLES_DEFAULT: usize = 255;
const MINING_TABLE_SIZE_DEFAULT: usize = 1 << 19;
const LINKING_TABLE_SIZE_DEFAULT: usize = 1 << 20;
const OVERLAP_DEFAULT: f64 = 0.7;
const MIN_CLUSTER_SIZE_DEFAULT: usize = 3;
const MIN_SET_SIZE_DEFAULT: usize = 3;
const MIN_HITS_DEFAULT: usize = 1;
const PRUNE_OVERLAP_DEFAULT: f64 = 0.7;
const COOC_THRESHOLD_DEFAULT: f64 = 0.5;
const MEASURE_DEFAULT: SimilarityMeasure = SimilarityMeasure::Overlap;

// Valid minimums/left bounds of parameters
const MIN_CLUSTER_SIZE_MINIMUM: usize = 1;
const MIN_SET_SIZE_MINIMUM: usize = 1;

/// Parameters of a Sampled Min-Hashing pass: how many Min-Hash values are combined into
/// one tuple, how many tuples (hash tables) are drawn, and how many buckets each table has.
#[derive(Debug, Clone, PartialEq)]
pub struct MinerParams {
    pub(crate) tuple_size: usize,
    pub(crate) number_of_tuples: usize,
    pub(crate) table_size: usize,
}

/// Builder object to set custom mining parameters.
#[derive(Debug, Clone, Default)]
pub struct MinerParamBuilder {
    tuple_size: Option<usize>,
    number_of_tuples: Option<usize>,
    table_size: Option<usize>,
}

impl MinerParams {
    /// Enters the builder pattern. Parameters that are not set keep their defaults: tuples
    /// of 3 Min-Hash values, 255 tuples and 2^19 buckets per table.
    pub fn builder() -> MinerParamBuilder {
        MinerParamBuilder::default()
    }

    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    pub fn number_of_tuples(&self) -> usize {
        self.number_of_tuples
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }
}

impl Default for MinerParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MinerParamBuilder {
    /// Sets the number of Min-Hash values concatenated into one tuple. Larger tuples make
    /// collisions rarer and more precise.
    pub fn tuple_size(mut self, tuple_size: usize) -> Self {
        self.tuple_size = Some(tuple_size);
        self
    }

    /// Sets the number of tuples, i.e. independent hash tables. More tuples increase recall
    /// at the cost of more candidates and compute.
    pub fn number_of_tuples(mut self, number_of_tuples: usize) -> Self {
        self.number_of_tuples = Some(number_of_tuples);
        self
    }

    /// Derives the number of tuples so that two sets with co-occurrence (Jaccard similarity)
    /// `threshold` collide in at least one table with probability 0.5. Uses the tuple size
    /// set so far, or the default one.
    pub fn cooccurrence_threshold(mut self, threshold: f64) -> Self {
        let tuple_size = self.tuple_size.unwrap_or(TUPLE_SIZE_DEFAULT);
        self.number_of_tuples = Some(number_of_tuples_for_threshold(threshold, tuple_size));
        self
    }

    /// Sets the number of buckets of each hash table.
    pub fn table_size(mut self, table_size: usize) -> Self {
        self.table_size = Some(table_size);
        self
    }

    pub fn build(self) -> MinerParams {
        MinerParams {
            tuple_size: self.tuple_size.unwrap_or(TUPLE_SIZE_DEFAULT),
            number_of_tuples: self.number_of_tuples.unwrap_or(NUMBER_OF_TUPLES_DEFAULT),
            table_size: self.table_size.unwrap_or(MINING_TABLE_SIZE_DEFAULT),
        }
    }
}

/// Number of tuples needed for sets of similarity `threshold` to collide at least once with
/// probability one half: `ln(0.5) / ln(1 - threshold^tuple_size)`, rounded up.
pub fn number_of_tuples_for_threshold(threshold: f64, tuple_size: usize) -> usize {
    let threshold = threshold.clamp(0.0, 1.0);
    let collision = threshold.powi(tuple_size as i32);
    if collision >= 1.0 {
        return 1;
    }
    if collision <= 0.0 {
        warn!(
            "SMH_WARNING: co-occurrence threshold {threshold} yields no collisions. \
            Using 1 tuple."
        );
        return 1;
    }
    let tuples = (0.5_f64.ln() / (1.0 - collision).ln()).ceil();
    (tuples as usize).max(1)
}

/// Parameters of the Min-Hash accelerated single-link clusterer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkerParams {
    pub(crate) mining: MinerParams,
    pub(crate) overlap: f64,
    pub(crate) min_cluster_size: usize,
    pub(crate) measure: SimilarityMeasure,
}

/// Builder object to set custom linkage parameters.
#[derive(Debug, Clone, Default)]
pub struct LinkerParamBuilder {
    tuple_size: Option<usize>,
    number_of_tuples: Option<usize>,
    table_size: Option<usize>,
    overlap: Option<f64>,
    min_cluster_size: Option<usize>,
    measure: Option<SimilarityMeasure>,
}

impl LinkerParams {
    /// Enters the builder pattern. Defaults: tuples of 3, 255 tuples, 2^20 buckets, an
    /// overlap threshold of 0.7 and clusters of at least 3 rows.
    pub fn builder() -> LinkerParamBuilder {
        LinkerParamBuilder::default()
    }

    pub fn mining(&self) -> &MinerParams {
        &self.mining
    }

    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    pub fn measure(&self) -> SimilarityMeasure {
        self.measure
    }
}

impl Default for LinkerParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LinkerParamBuilder {
    /// Sets the tuple size of the re-mining pass. Clustering usually favours precision, so
    /// this is often larger than the mining tuple size.
    pub fn tuple_size(mut self, tuple_size: usize) -> Self {
        self.tuple_size = Some(tuple_size);
        self
    }

    pub fn number_of_tuples(mut self, number_of_tuples: usize) -> Self {
        self.number_of_tuples = Some(number_of_tuples);
        self
    }

    pub fn table_size(mut self, table_size: usize) -> Self {
        self.table_size = Some(table_size);
        self
    }

    /// Sets the similarity two rows sharing a bucket need to be linked. Defaults to 0.7.
    pub fn overlap(mut self, overlap: f64) -> Self {
        self.overlap = Some(overlap);
        self
    }

    /// Sets the minimum number of rows for a group of linked rows to become a cluster.
    /// Smaller groups are discarded. Defaults to 3.
    pub fn min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        let valid = validate_input_left_bound(
            min_cluster_size, MIN_CLUSTER_SIZE_MINIMUM, "min_cluster_size");
        self.min_cluster_size = Some(valid);
        self
    }

    /// Sets the similarity measure used to gate links. Defaults to the overlap coefficient.
    pub fn measure(mut self, measure: SimilarityMeasure) -> Self {
        self.measure = Some(measure);
        self
    }

    pub fn build(self) -> LinkerParams {
        LinkerParams {
            mining: MinerParams {
                tuple_size: self.tuple_size.unwrap_or(TUPLE_SIZE_DEFAULT),
                number_of_tuples: self.number_of_tuples.unwrap_or(NUMBER_OF_TUPLES_DEFAULT),
                table_size: self.table_size.unwrap_or(LINKING_TABLE_SIZE_DEFAULT),
            },
            overlap: self.overlap.unwrap_or(OVERLAP_DEFAULT),
            min_cluster_size: self.min_cluster_size.unwrap_or(MIN_CLUSTER_SIZE_DEFAULT),
            measure: self.measure.unwrap_or(MEASURE_DEFAULT),
        }
    }
}

/// Parameters of the candidate pruner.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneParams {
    pub(crate) min_size: usize,
    pub(crate) min_hits: usize,
    pub(crate) overlap: f64,
    pub(crate) cooc_threshold: f64,
}

/// Builder object to set custom pruning parameters.
#[derive(Debug, Clone, Default)]
pub struct PruneParamBuilder {
    min_size: Option<usize>,
    min_hits: Option<usize>,
    overlap: Option<f64>,
    cooc_threshold: Option<f64>,
}

impl PruneParams {
    pub fn builder() -> PruneParamBuilder {
        PruneParamBuilder::default()
    }
}

impl Default for PruneParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PruneParamBuilder {
    /// Candidates left with fewer items than this are removed. Defaults to 3.
    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = Some(validate_input_left_bound(min_size, MIN_SET_SIZE_MINIMUM, "min_size"));
        self
    }

    /// Candidates retrieving fewer indexed rows than this are removed. Defaults to 1.
    pub fn min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = Some(min_hits);
        self
    }

    /// Fraction of a candidate's items an indexed row must contain to count as a hit.
    /// Defaults to 0.7.
    pub fn overlap(mut self, overlap: f64) -> Self {
        self.overlap = Some(overlap);
        self
    }

    /// Fraction of the hits an item must occur in to stay in its candidate. Defaults to 0.5.
    pub fn cooc_threshold(mut self, cooc_threshold: f64) -> Self {
        self.cooc_threshold = Some(cooc_threshold);
        self
    }

    pub fn build(self) -> PruneParams {
        PruneParams {
            min_size: self.min_size.unwrap_or(MIN_SET_SIZE_DEFAULT),
            min_hits: self.min_hits.unwrap_or(MIN_HITS_DEFAULT),
            overlap: self.overlap.unwrap_or(PRUNE_OVERLAP_DEFAULT),
            cooc_threshold: self.cooc_threshold.unwrap_or(COOC_THRESHOLD_DEFAULT),
        }
    }
}

/// Parameters of the mine, cut off and cluster pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscovererParams {
    pub(crate) mining: MinerParams,
    pub(crate) min_set_size: usize,
    pub(crate) linking: LinkerParams,
}

/// Builder object to set custom discovery parameters.
#[derive(Debug, Clone, Default)]
pub struct DiscovererParamBuilder {
    mining: Option<MinerParams>,
    cooccurrence_threshold: Option<f64>,
    min_set_size: Option<usize>,
    linking: Option<LinkerParams>,
}

impl DiscovererParams {
    pub fn builder() -> DiscovererParamBuilder {
        DiscovererParamBuilder::default()
    }

    pub fn mining(&self) -> &MinerParams {
        &self.mining
    }

    pub fn min_set_size(&self) -> usize {
        self.min_set_size
    }

    pub fn linking(&self) -> &LinkerParams {
        &self.linking
    }
}

impl Default for DiscovererParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DiscovererParamBuilder {
    pub fn mining(mut self, mining: MinerParams) -> Self {
        self.mining = Some(mining);
        self
    }

    /// Derives the number of mining tuples from a co-occurrence threshold, overriding the one
    /// of the mining parameters.
    pub fn cooccurrence_threshold(mut self, threshold: f64) -> Self {
        self.cooccurrence_threshold = Some(threshold);
        self
    }

    /// Mined item sets with fewer items than this are discarded before clustering. Defaults
    /// to 3.
    pub fn min_set_size(mut self, min_set_size: usize) -> Self {
        let valid = validate_input_left_bound(min_set_size, MIN_SET_SIZE_MINIMUM, "min_set_size");
        self.min_set_size = Some(valid);
        self
    }

    pub fn linking(mut self, linking: LinkerParams) -> Self {
        self.linking = Some(linking);
        self
    }

    pub fn build(self) -> DiscovererParams {
        let mut mining = self.mining.unwrap_or_default();
        if let Some(threshold) = self.cooccurrence_threshold {
            mining.number_of_tuples = number_of_tuples_for_threshold(threshold, mining.tuple_size);
        }
        DiscovererParams {
            mining,
            min_set_size: self.min_set_size.unwrap_or(MIN_SET_SIZE_DEFAULT),
            linking: self.linking.unwrap_or_default(),
        }
    }
}

pub(crate) fn validate_input_left_bound(
    input_param: usize,
    left_bound: usize,
    param: &str,
) -> usize {
    if input_param < left_bound {
        warn!(
            "SMH_WARNING: {param} ({input_param}) cannot be lower \
            than {left_bound}. Set to {left_bound}."
        );
        left_bound
    } else {
        input_param
    }
}
