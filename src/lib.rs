//! Sampled Min-Hashing ("SMH") in Rust. Discovers groups of items that frequently co-occur in
//! large collections of sparse sets, without comparing every pair of sets.
//!
//! The pipeline works on [`Store`]s, rows of weighted items over a shared vocabulary:
//!  1. A store (typically the inverted index of a corpus, see [`Store::invert`]) is hashed into
//!     many independent Min-Hash tables by the [`Miner`]. Rows that collide in a bucket form a
//!     candidate set. Rows that share many items collide in many tables;
//!  2. Candidates can be filtered against the index with the [`Pruner`], or simply cut off by
//!     size with [`Store::delete_smallest`]; and
//!  3. The [`Linker`] re-hashes the candidates, links the ones that collide and overlap enough,
//!     and merges linked candidates transitively into cluster models.
//!
//! Item selection can be biased towards heavier items, either with per-item [`Weights`] or by
//! expanding rows in proportion to their counts (see [`SamplingBias`]). Both have the same
//! statistical effect.
//!
//! Every random draw comes from an explicit [`MhRng`]: given the same seed, mining and linking
//! give the same results, serially or (with the `parallel` feature) on the rayon thread pool.
//!
//! # Examples
//! ```
//!use smh::{Linker, LinkerParams, MhRng, SamplingBias, Store};
//!
//!let mut store = Store::new(0, 10);
//!for row in 0..6 {
//!    let offset = if row < 3 { 0 } else { 5 };
//!    for item in offset..offset + 4 {
//!        store.push(row, item, 1).unwrap();
//!    }
//!}
//!let params = LinkerParams::builder()
//!    .tuple_size(2)
//!    .number_of_tuples(10)
//!    .table_size(1 << 8)
//!    .build();
//!let linkage = Linker::new(params).link(&store, SamplingBias::Uniform, &MhRng::new(42)).unwrap();
//!assert_eq!(linkage.labels, vec![0, 0, 0, 1, 1, 1]);
//! ```
//!
//! # References
//! * Fuentes-Pineda, G.; Meza-Ruiz, I.V. Topic discovery in massive text corpora based on
//!   Min-Hashing. <https://doi.org/10.1016/j.eswa.2019.112844>
//! * Chum, O.; Matas, J. Large-scale discovery of spatially related images.
//!   <https://doi.org/10.1109/TPAMI.2009.166>

pub use crate::bucket_index::{Bucket, BucketIndex, BucketTable};
pub use crate::discoverer::Discoverer;
pub use crate::error::{Result, SmhError};
pub use crate::hyper_parameters::{
    number_of_tuples_for_threshold, DiscovererParamBuilder, DiscovererParams, LinkerParamBuilder,
    LinkerParams, MinerParamBuilder, MinerParams, PruneParamBuilder, PruneParams,
};
pub use crate::io::{
    load, load_weights, read_store, read_weights, save, save_weights, write_store, write_weights,
};
pub use crate::linker::{make_model, Linkage, Linker};
pub use crate::miner::{significance, Miner};
pub use crate::pruner::Pruner;
pub use crate::rng::{MhRng, Purpose};
pub use crate::sampler::{Expansion, HashFunctions, Sampler, SamplingBias, TupleKey, PRIME};
pub use crate::search::SearchIndex;
pub use crate::similarity::{intersection_size, jaccard, overlap, SimilarityMeasure};
pub use crate::store::{scale_weight, CsrMatrix, Entry, Row, Store, WEIGHT_SCALE};
pub use crate::weights::{weight_index, WeightScheme, Weights};

mod bucket_index;
mod discoverer;
mod error;
mod hyper_parameters;
mod io;
mod linker;
mod miner;
mod pruner;
mod rng;
mod sampler;
mod search;
mod signatures;
mod similarity;
mod store;
mod union_find;
mod validation;
mod weights;
